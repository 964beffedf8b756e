//! Wire framing for the run RPC.
//!
//! Request body:  `[u32 BE time_length][u32 BE sample_bits][payload...]`
//! Response body: `[u32 BE time_length][u32 BE sample_width][captured bytes]`

use byteorder::{BigEndian, ByteOrder};

/// Size of both the request and response headers.
pub const HEADER_LEN: usize = 8;

/// Parsed request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    /// Requested number of time steps. Bounds-checked against the input
    /// device, otherwise advisory: the full buffer is always used.
    pub time_length: u32,
    /// Bits of real data per sample; the rest of each slot is zero padding.
    pub sample_bits: u32,
}

impl RequestHeader {
    /// Decode from the first [`HEADER_LEN`] bytes. Callers must check the
    /// length first.
    pub fn parse(bytes: &[u8]) -> Self {
        Self {
            time_length: BigEndian::read_u32(&bytes[0..4]),
            sample_bits: BigEndian::read_u32(&bytes[4..8]),
        }
    }

    /// Bytes of real data at the head of each sample slot.
    pub fn slot_bytesize(&self) -> usize {
        self.sample_bits.div_ceil(8) as usize
    }
}

/// Header prepended to the captured output buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    pub time_length: u32,
    pub sample_width: u32,
}

impl ResponseHeader {
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        BigEndian::write_u32(&mut bytes[0..4], self.time_length);
        BigEndian::write_u32(&mut bytes[4..8], self.sample_width);
        bytes
    }
}

/// Assemble the complete response body in one buffer.
pub fn frame_response(header: ResponseHeader, captured: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(HEADER_LEN + captured.len());
    body.extend_from_slice(&header.encode());
    body.extend_from_slice(captured);
    body
}
