//! Simulated device backend.
//!
//! An in-memory stand-in for the kernel driver: a player and a sampler
//! constructed over the same [`SimBus`] form a loopback pair, so a run
//! captures exactly what was played. Used by the test suite and for
//! developing against no hardware.
//!
//! Failure injection covers the interesting hardware faults: transfers that
//! error out, and a done flag that never rises.

use std::io;
use std::sync::{Arc, Mutex};

use super::driver::{DeviceDriver, DeviceMetadata, DeviceRole};

/// Shared byte channel standing in for the fabric between a player and a
/// sampler.
#[derive(Clone, Default)]
pub struct SimBus {
    wire: Arc<Mutex<Vec<u8>>>,
}

impl SimBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the bus contents (what a player "transmitted").
    pub fn store(&self, data: &[u8]) {
        let mut wire = self.wire.lock().unwrap();
        wire.clear();
        wire.extend_from_slice(data);
    }

    /// Copy of the current bus contents.
    pub fn snapshot(&self) -> Vec<u8> {
        self.wire.lock().unwrap().clone()
    }

    fn write_at(&self, offset: usize, data: &[u8]) {
        let mut wire = self.wire.lock().unwrap();
        if wire.len() < offset + data.len() {
            wire.resize(offset + data.len(), 0);
        }
        wire[offset..offset + data.len()].copy_from_slice(data);
    }

    fn read_at(&self, offset: usize, buf: &mut [u8]) {
        let wire = self.wire.lock().unwrap();
        for (i, b) in buf.iter_mut().enumerate() {
            *b = wire.get(offset + i).copied().unwrap_or(0);
        }
    }
}

/// One simulated data-mover device.
pub struct SimDevice {
    meta: DeviceMetadata,
    bus: SimBus,
    enabled: bool,
    pos: usize,
    max_chunk: usize,
    fail_transfers: bool,
    stuck_done: bool,
}

impl SimDevice {
    fn new(role: DeviceRole, sample_width: u32, sample_bits: u32, time_bits: u32, bus: SimBus) -> Self {
        let sample_length = 1u32 << sample_bits;
        let time_length = 1u32 << time_bits;
        Self {
            meta: DeviceMetadata {
                role,
                sample_width,
                sample_bits,
                sample_length,
                time_bits,
                time_length,
                bits: time_bits + sample_bits,
                length: time_length * sample_length,
            },
            bus,
            enabled: false,
            pos: 0,
            max_chunk: usize::MAX,
            fail_transfers: false,
            stuck_done: false,
        }
    }

    /// A player (input) device of the given geometry.
    pub fn player(sample_width: u32, sample_bits: u32, time_bits: u32, bus: SimBus) -> Self {
        Self::new(DeviceRole::Player, sample_width, sample_bits, time_bits, bus)
    }

    /// A sampler (output) device of the given geometry.
    pub fn sampler(sample_width: u32, sample_bits: u32, time_bits: u32, bus: SimBus) -> Self {
        Self::new(DeviceRole::Sampler, sample_width, sample_bits, time_bits, bus)
    }

    /// Cap each partial transfer at `n` bytes, exercising the retry loop.
    pub fn with_max_chunk(mut self, n: usize) -> Self {
        self.max_chunk = n;
        self
    }

    /// Make every read/write fail with an I/O error.
    pub fn with_failing_transfers(mut self) -> Self {
        self.fail_transfers = true;
        self
    }

    /// Keep the done flag low forever.
    pub fn with_stuck_done(mut self) -> Self {
        self.stuck_done = true;
        self
    }
}

impl DeviceDriver for SimDevice {
    fn metadata(&self) -> &DeviceMetadata {
        &self.meta
    }

    fn get_enabled(&self) -> io::Result<bool> {
        Ok(self.enabled)
    }

    fn set_enabled(&mut self, enabled: bool) -> io::Result<()> {
        self.enabled = enabled;
        Ok(())
    }

    fn get_done(&self) -> io::Result<bool> {
        // the simulated transfer completes as soon as the device is enabled
        Ok(self.enabled && !self.stuck_done)
    }

    fn rewind(&mut self) -> io::Result<()> {
        self.pos = 0;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.fail_transfers {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "simulated transfer fault",
            ));
        }
        let n = buf.len().min(self.max_chunk);
        self.bus.read_at(self.pos, &mut buf[..n]);
        self.pos += n;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail_transfers {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "simulated transfer fault",
            ));
        }
        let n = buf.len().min(self.max_chunk);
        self.bus.write_at(self.pos, &buf[..n]);
        self.pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_is_idempotent() {
        let mut dev = SimDevice::player(8, 2, 2, SimBus::new());
        dev.set_enabled(false).unwrap();
        dev.set_enabled(false).unwrap();
        assert!(!dev.get_enabled().unwrap());

        dev.set_enabled(true).unwrap();
        dev.set_enabled(true).unwrap();
        assert!(dev.get_enabled().unwrap());
    }

    #[test]
    fn test_loopback_bus() {
        let bus = SimBus::new();
        let mut player = SimDevice::player(8, 2, 2, bus.clone());
        let mut sampler = SimDevice::sampler(8, 2, 2, bus);

        player.write(&[1, 2, 3, 4]).unwrap();

        let mut captured = [0u8; 4];
        sampler.read(&mut captured).unwrap();
        assert_eq!(captured, [1, 2, 3, 4]);
    }

    #[test]
    fn test_read_beyond_bus_is_zero_filled() {
        let bus = SimBus::new();
        bus.store(&[7]);
        let mut sampler = SimDevice::sampler(8, 2, 2, bus);

        let mut captured = [0xffu8; 4];
        sampler.read(&mut captured).unwrap();
        assert_eq!(captured, [7, 0, 0, 0]);
    }
}
