//! Per-request streaming session.
//!
//! # Responsibilities
//! - Parse the 8-byte request header out of the first body chunk
//! - Bounds-check the requested geometry against the input device
//! - Pack payload bytes into the device buffer, zero-padding the unused
//!   tail of each sample slot
//! - Zero-fill whatever the body did not cover once it ends
//!
//! # State Machine
//! ```text
//! AwaitingHeader --(≥8 bytes, in bounds)--> Streaming
//! AwaitingHeader --(<8 bytes | out of bounds)--> Malformed (absorbing)
//! Streaming      --(bytes)--> Streaming     (cursor advances, surplus dropped)
//! finish(): Malformed/AwaitingHeader → BadRequest, Streaming → RunReady
//! ```
//!
//! # Design Decisions
//! - The body arrives in arbitrarily sized chunks that do not align with
//!   sample slots; the cursor is the only carried position state, so the
//!   final buffer is identical however the payload is split
//! - A chunk that overfills the buffer is not an error; the surplus is
//!   discarded
//! - The session never touches device control state; it only writes the
//!   input buffer

use crate::device::DeviceMetadata;

use super::frame::{RequestHeader, HEADER_LEN};

/// Input-device capacities a session validates and packs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    /// Maximum number of time steps.
    pub time_length: u32,
    /// Maximum bits per sample.
    pub sample_width: u32,
    /// Bytes per sample slot.
    pub sample_length: u32,
}

impl From<&DeviceMetadata> for DeviceLimits {
    fn from(meta: &DeviceMetadata) -> Self {
        Self {
            time_length: meta.time_length,
            sample_width: meta.sample_width,
            sample_length: meta.sample_length,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingHeader,
    Streaming,
    Malformed,
}

/// What the transport should do once the body has ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The body was malformed; respond 400 without touching hardware.
    BadRequest,
    /// The input buffer is fully populated; run the device pair.
    RunReady,
}

/// State machine fed by body chunks; one per request.
#[derive(Debug)]
pub struct StreamingSession {
    limits: DeviceLimits,
    state: State,
    /// Bytes of real payload at the head of each slot (`ceil(sample_bits/8)`).
    bytesize: usize,
    /// Next byte offset in the input buffer. Monotone, ≤ buffer length.
    cursor: usize,
}

impl StreamingSession {
    pub fn new(limits: DeviceLimits) -> Self {
        Self {
            limits,
            state: State::AwaitingHeader,
            bytesize: 0,
            cursor: 0,
        }
    }

    /// Whether the session has entered the absorbing malformed state.
    pub fn is_malformed(&self) -> bool {
        self.state == State::Malformed
    }

    /// Byte offset the next payload byte would land at.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Consume one body chunk, writing into `inputs` (the input device
    /// buffer). Empty chunks are ignored; end-of-body is signalled via
    /// [`finish`](Self::finish).
    pub fn feed(&mut self, mut chunk: &[u8], inputs: &mut [u8]) {
        if chunk.is_empty() {
            return;
        }

        match self.state {
            State::Malformed => return,
            State::AwaitingHeader => {
                // The header must arrive whole in the first non-empty chunk.
                if chunk.len() < HEADER_LEN {
                    tracing::debug!(len = chunk.len(), "first chunk shorter than header");
                    self.state = State::Malformed;
                    return;
                }
                let header = RequestHeader::parse(chunk);
                if header.time_length > self.limits.time_length
                    || header.sample_bits > self.limits.sample_width
                {
                    tracing::debug!(
                        time_length = header.time_length,
                        sample_bits = header.sample_bits,
                        max_time_length = self.limits.time_length,
                        max_sample_width = self.limits.sample_width,
                        "requested geometry exceeds device capacity"
                    );
                    self.state = State::Malformed;
                    return;
                }
                self.bytesize = header.slot_bytesize();
                self.cursor = 0;
                self.state = State::Streaming;
                chunk = &chunk[HEADER_LEN..];
            }
            State::Streaming => {}
        }

        let sample_length = self.limits.sample_length as usize;
        for &byte in chunk {
            // skip the no-data tail of the slot, padding it with zeroes
            while self.cursor < inputs.len() && self.cursor % sample_length >= self.bytesize {
                inputs[self.cursor] = 0;
                self.cursor += 1;
            }
            if self.cursor == inputs.len() {
                // buffer full; surplus body bytes are dropped
                break;
            }
            inputs[self.cursor] = byte;
            self.cursor += 1;
        }
    }

    /// End of body: zero-fill the unreached remainder of the buffer and
    /// report how to respond.
    pub fn finish(&mut self, inputs: &mut [u8]) -> SessionEnd {
        match self.state {
            // an empty or sub-header body never left AwaitingHeader
            State::AwaitingHeader | State::Malformed => {
                self.state = State::Malformed;
                SessionEnd::BadRequest
            }
            State::Streaming => {
                for byte in &mut inputs[self.cursor..] {
                    *byte = 0;
                }
                self.cursor = inputs.len();
                SessionEnd::RunReady
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: DeviceLimits = DeviceLimits {
        time_length: 4,
        sample_width: 8,
        sample_length: 4,
    };

    fn header(time_length: u32, sample_bits: u32) -> Vec<u8> {
        let mut h = Vec::new();
        h.extend_from_slice(&time_length.to_be_bytes());
        h.extend_from_slice(&sample_bits.to_be_bytes());
        h
    }

    fn body(time_length: u32, sample_bits: u32, payload: &[u8]) -> Vec<u8> {
        let mut b = header(time_length, sample_bits);
        b.extend_from_slice(payload);
        b
    }

    #[test]
    fn test_single_chunk_packs_and_pads() {
        // time_length=2, sample_bits=8 → one data byte per 4-byte slot
        let mut inputs = [0xffu8; 16];
        let mut session = StreamingSession::new(LIMITS);
        session.feed(&body(2, 8, &[0xaa, 0xbb]), &mut inputs);
        assert_eq!(session.finish(&mut inputs), SessionEnd::RunReady);

        let expected = [
            0xaa, 0, 0, 0, //
            0xbb, 0, 0, 0, //
            0, 0, 0, 0, //
            0, 0, 0, 0,
        ];
        assert_eq!(inputs, expected);
    }

    #[test]
    fn test_chunking_is_equivalent() {
        let payload: Vec<u8> = (1..=120).collect();
        let full = body(4, 8, &payload);

        let mut at_once = [0u8; 16];
        let mut session = StreamingSession::new(LIMITS);
        session.feed(&full, &mut at_once);
        assert_eq!(session.finish(&mut at_once), SessionEnd::RunReady);

        // same bytes split 8 (header) + 3 + 1 + 100 + rest
        let mut split = [0u8; 16];
        let mut session = StreamingSession::new(LIMITS);
        let (mut fed, mut rest) = full.split_at(8 + 3);
        session.feed(fed, &mut split);
        (fed, rest) = rest.split_at(1);
        session.feed(fed, &mut split);
        (fed, rest) = rest.split_at(100);
        session.feed(fed, &mut split);
        session.feed(rest, &mut split);
        assert_eq!(session.finish(&mut split), SessionEnd::RunReady);

        assert_eq!(at_once, split);
    }

    #[test]
    fn test_chunk_boundary_inside_slot() {
        // 2 data bytes per slot (sample_bits=16), chunk ends mid-slot
        let limits = DeviceLimits {
            time_length: 4,
            sample_width: 16,
            sample_length: 4,
        };
        let mut inputs = [0xffu8; 16];
        let mut session = StreamingSession::new(limits);
        session.feed(&body(4, 16, &[1]), &mut inputs);
        session.feed(&[2, 3], &mut inputs);
        session.feed(&[4], &mut inputs);
        assert_eq!(session.finish(&mut inputs), SessionEnd::RunReady);

        assert_eq!(
            inputs,
            [1, 2, 0, 0, 3, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_short_first_chunk_is_malformed() {
        let mut inputs = [0xffu8; 16];
        let mut session = StreamingSession::new(LIMITS);
        session.feed(&[0, 0, 0], &mut inputs);
        assert!(session.is_malformed());

        // further chunks are absorbed without touching the buffer
        session.feed(&body(2, 8, &[0xaa]), &mut inputs);
        assert_eq!(session.finish(&mut inputs), SessionEnd::BadRequest);
        assert!(inputs.iter().all(|&b| b == 0xff));
    }

    #[test]
    fn test_empty_body_is_malformed() {
        let mut inputs = [0xffu8; 16];
        let mut session = StreamingSession::new(LIMITS);
        assert_eq!(session.finish(&mut inputs), SessionEnd::BadRequest);
        assert!(inputs.iter().all(|&b| b == 0xff));
    }

    #[test]
    fn test_time_length_out_of_bounds() {
        let mut inputs = [0xffu8; 16];
        let mut session = StreamingSession::new(LIMITS);
        session.feed(&body(5, 8, &[0xaa]), &mut inputs);
        assert!(session.is_malformed());
        assert_eq!(session.finish(&mut inputs), SessionEnd::BadRequest);
        assert!(inputs.iter().all(|&b| b == 0xff));
    }

    #[test]
    fn test_sample_bits_out_of_bounds() {
        let mut inputs = [0xffu8; 16];
        let mut session = StreamingSession::new(LIMITS);
        session.feed(&body(4, 9, &[0xaa]), &mut inputs);
        assert!(session.is_malformed());
    }

    #[test]
    fn test_surplus_payload_is_dropped() {
        let mut inputs = [0u8; 16];
        let mut session = StreamingSession::new(LIMITS);
        let payload = [0x11u8; 64];
        session.feed(&body(4, 8, &payload), &mut inputs);
        assert_eq!(session.cursor(), inputs.len());
        assert_eq!(session.finish(&mut inputs), SessionEnd::RunReady);

        // one payload byte per slot, rest padding
        for (i, &b) in inputs.iter().enumerate() {
            if i % 4 == 0 {
                assert_eq!(b, 0x11, "slot head at {i}");
            } else {
                assert_eq!(b, 0, "padding at {i}");
            }
        }
    }

    #[test]
    fn test_padding_invariant_holds() {
        // sample_bits=12 → bytesize 2; positions i%4 ≥ 2 must be zero
        let limits = DeviceLimits {
            time_length: 4,
            sample_width: 16,
            sample_length: 4,
        };
        let mut inputs = [0xffu8; 16];
        let mut session = StreamingSession::new(limits);
        session.feed(&body(4, 12, &[1, 2, 3, 4, 5]), &mut inputs);
        assert_eq!(session.finish(&mut inputs), SessionEnd::RunReady);

        for (i, &b) in inputs.iter().enumerate() {
            if i % 4 >= 2 {
                assert_eq!(b, 0, "padding at {i}");
            }
        }
        assert_eq!(&inputs[..6], &[1, 2, 0, 0, 3, 4]);
    }

    #[test]
    fn test_zero_sample_bits_pads_everything() {
        let mut inputs = [0xffu8; 16];
        let mut session = StreamingSession::new(LIMITS);
        session.feed(&body(4, 0, &[9, 9, 9]), &mut inputs);
        assert_eq!(session.finish(&mut inputs), SessionEnd::RunReady);
        assert!(inputs.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_cursor_is_monotone_and_bounded() {
        let mut inputs = [0u8; 16];
        let mut session = StreamingSession::new(LIMITS);
        session.feed(&body(4, 8, &[]), &mut inputs);
        let mut last = session.cursor();
        for chunk in [[1u8].as_slice(), &[2, 3], &[4, 5, 6, 7, 8, 9]] {
            session.feed(chunk, &mut inputs);
            assert!(session.cursor() >= last);
            assert!(session.cursor() <= inputs.len());
            last = session.cursor();
        }
        session.finish(&mut inputs);
        assert_eq!(session.cursor(), inputs.len());
    }

    #[test]
    fn test_header_only_body_zero_fills() {
        let mut inputs = [0xffu8; 16];
        let mut session = StreamingSession::new(LIMITS);
        session.feed(&header(4, 8), &mut inputs);
        assert_eq!(session.finish(&mut inputs), SessionEnd::RunReady);
        assert!(inputs.iter().all(|&b| b == 0));
    }
}
