//! Driver-layer capability interface.
//!
//! # Responsibilities
//! - Define the contract a device backend must provide (metadata,
//!   enable/done control, partial data transfers)
//! - Define the device error taxonomy
//!
//! # Design Decisions
//! - Control state lives in hardware and is never cached here; every
//!   `get_enabled`/`get_done` call reaches the backend
//! - `read`/`write` are single partial transfers; retry-until-complete
//!   belongs to `DeviceHandle`, not the backend
//! - Injected as a boxed trait object so tests can substitute a simulated
//!   device for the sysfs backend

use std::io;

use thiserror::Error;

/// Which side of the pair a device sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceRole {
    /// Streams the input buffer out to hardware.
    Player,
    /// Captures the output buffer from hardware.
    Sampler,
}

impl DeviceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceRole::Player => "player",
            DeviceRole::Sampler => "sampler",
        }
    }
}

impl std::fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeviceRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "player" => Ok(DeviceRole::Player),
            "sampler" => Ok(DeviceRole::Sampler),
            other => Err(format!("unknown device role: {other}")),
        }
    }
}

/// Capacity metadata published by a device.
///
/// All sizes are fixed at device creation. `sample_length` is the byte size
/// of one sample slot (a power of two), `time_length` the number of slots,
/// and `length` the total buffer size in bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceMetadata {
    pub role: DeviceRole,
    /// Bits per raw sample value.
    pub sample_width: u32,
    /// log2 of bytes per sample slot.
    pub sample_bits: u32,
    /// Bytes per sample slot (`2^sample_bits`).
    pub sample_length: u32,
    /// log2 of the number of sample slots.
    pub time_bits: u32,
    /// Number of sample slots (`2^time_bits`).
    pub time_length: u32,
    /// `time_bits + sample_bits`.
    pub bits: u32,
    /// Total buffer size in bytes (`time_length * sample_length`).
    pub length: u32,
}

impl DeviceMetadata {
    /// Check the self-consistency invariants the hardware guarantees.
    pub fn validate(&self, name: &str) -> Result<(), DeviceError> {
        let fail = |reason: String| DeviceError::Metadata {
            name: name.to_string(),
            reason,
        };
        if self.length == 0 {
            return Err(fail("zero-length device buffer".into()));
        }
        if self.sample_length != 1u32 << self.sample_bits {
            return Err(fail(format!(
                "sample_length {} != 2^sample_bits {}",
                self.sample_length, self.sample_bits
            )));
        }
        if self.time_length != 1u32 << self.time_bits {
            return Err(fail(format!(
                "time_length {} != 2^time_bits {}",
                self.time_length, self.time_bits
            )));
        }
        if self.bits != self.time_bits + self.sample_bits {
            return Err(fail(format!(
                "bits {} != time_bits {} + sample_bits {}",
                self.bits, self.time_bits, self.sample_bits
            )));
        }
        if self.length != self.time_length * self.sample_length {
            return Err(fail(format!(
                "length {} != time_length {} * sample_length {}",
                self.length, self.time_length, self.sample_length
            )));
        }
        if self.sample_width.div_ceil(8) > self.sample_length {
            return Err(fail(format!(
                "sample_width {} does not fit in a {}-byte slot",
                self.sample_width, self.sample_length
            )));
        }
        Ok(())
    }
}

/// Errors from the device layer.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The named device (or its metadata) does not exist.
    #[error("device {name} not found")]
    NotFound { name: String },

    /// The device published inconsistent capacity metadata.
    #[error("device {name}: bad metadata: {reason}")]
    Metadata { name: String, reason: String },

    /// The device has a different role than the caller asked for.
    #[error("device {name} is a {actual}, expected a {expected}")]
    WrongRole {
        name: String,
        expected: DeviceRole,
        actual: DeviceRole,
    },

    /// A data transfer or control access failed or came up short.
    #[error("device {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },

    /// The device never raised its done flag within the completion deadline.
    #[error("device {name}: not done after {waited_ms} ms")]
    TimedOut { name: String, waited_ms: u64 },
}

/// Result type for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Backend contract for one data-mover device.
///
/// Implemented by [`SysfsDevice`](crate::device::sysfs::SysfsDevice) for real
/// hardware and [`SimDevice`](crate::device::sim::SimDevice) for tests.
pub trait DeviceDriver: Send {
    /// Capacity metadata read at open time.
    fn metadata(&self) -> &DeviceMetadata;

    /// Read the enable bit from the control interface.
    fn get_enabled(&self) -> io::Result<bool>;

    /// Write the enable bit through the control interface.
    fn set_enabled(&mut self, enabled: bool) -> io::Result<()>;

    /// Read the done flag from the control interface.
    fn get_done(&self) -> io::Result<bool>;

    /// Reposition the transfer cursor to the start of the device buffer.
    fn rewind(&mut self) -> io::Result<()>;

    /// One partial read from the current cursor. Returns bytes read.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// One partial write at the current cursor. Returns bytes written.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> DeviceMetadata {
        DeviceMetadata {
            role: DeviceRole::Player,
            sample_width: 8,
            sample_bits: 2,
            sample_length: 4,
            time_bits: 2,
            time_length: 4,
            bits: 4,
            length: 16,
        }
    }

    #[test]
    fn test_valid_metadata() {
        assert!(metadata().validate("player0").is_ok());
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let mut meta = metadata();
        meta.length = 32;
        let err = meta.validate("player0").unwrap_err();
        assert!(matches!(err, DeviceError::Metadata { .. }));
    }

    #[test]
    fn test_oversized_sample_width_rejected() {
        let mut meta = metadata();
        meta.sample_width = 64;
        assert!(meta.validate("player0").is_err());
    }

    #[test]
    fn test_role_round_trip() {
        assert_eq!("player".parse::<DeviceRole>().unwrap(), DeviceRole::Player);
        assert_eq!("sampler".parse::<DeviceRole>().unwrap(), DeviceRole::Sampler);
        assert!("dac".parse::<DeviceRole>().is_err());
    }
}
