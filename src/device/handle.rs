//! Owned device state: capacity metadata plus the aligned transfer buffer.
//!
//! # Responsibilities
//! - Hold one device's backend, metadata and data buffer for the process
//!   lifetime
//! - Whole-buffer transfers with retry-until-complete semantics
//! - Apply the bit-order transform exactly once per boundary crossing:
//!   before a write reaches hardware, after a read returns from it
//!
//! # Design Decisions
//! - Transfers never expose partial-buffer APIs to callers; a short backend
//!   transfer is retried, a non-positive one is an error
//! - The buffer is allocated once at open, aligned for direct I/O, and never
//!   resized

use std::alloc::{self, Layout};
use std::io;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use super::driver::{DeviceDriver, DeviceError, DeviceMetadata, DeviceResult, DeviceRole};
use super::swap;
use super::sysfs::SysfsDevice;

/// Alignment required by the direct-I/O transport (block size).
pub const TRANSFER_ALIGN: usize = 512;

/// A heap buffer with a fixed size and alignment.
///
/// Direct I/O rejects unaligned user buffers, and `Vec` makes no alignment
/// promise, hence the manual allocation.
pub struct AlignedBuf {
    ptr: NonNull<u8>,
    len: usize,
    layout: Layout,
}

impl AlignedBuf {
    /// Allocate `len` zeroed bytes aligned to `align`.
    ///
    /// `len` must be non-zero and `align` a power of two; both hold for any
    /// validated device metadata.
    pub fn zeroed(len: usize, align: usize) -> Self {
        let layout = Layout::from_size_align(len, align).expect("invalid buffer layout");
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = match NonNull::new(ptr) {
            Some(ptr) => ptr,
            None => alloc::handle_alloc_error(layout),
        };
        Self { ptr, len, layout }
    }
}

impl Deref for AlignedBuf {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl DerefMut for AlignedBuf {
    fn deref_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for AlignedBuf {
    fn drop(&mut self) {
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

// The allocation is exclusively owned through &mut.
unsafe impl Send for AlignedBuf {}
unsafe impl Sync for AlignedBuf {}

/// One opened data-mover device.
pub struct DeviceHandle {
    name: String,
    meta: DeviceMetadata,
    driver: Box<dyn DeviceDriver>,
    data: AlignedBuf,
}

impl DeviceHandle {
    /// Wrap an already-opened backend, validating its metadata and
    /// allocating the transfer buffer.
    pub fn new(
        name: impl Into<String>,
        driver: Box<dyn DeviceDriver>,
    ) -> DeviceResult<Self> {
        let name = name.into();
        let meta = driver.metadata().clone();
        meta.validate(&name)?;
        let data = AlignedBuf::zeroed(meta.length as usize, TRANSFER_ALIGN);
        Ok(Self {
            name,
            meta,
            driver,
            data,
        })
    }

    /// Open the named device through the kernel driver and require `role`.
    pub fn open(name: &str, role: DeviceRole) -> DeviceResult<Self> {
        let backend = SysfsDevice::open(name)?;
        let actual = backend.metadata().role;
        if actual != role {
            return Err(DeviceError::WrongRole {
                name: name.to_string(),
                expected: role,
                actual,
            });
        }
        Self::new(name, Box::new(backend))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &DeviceMetadata {
        &self.meta
    }

    /// The device buffer. After a successful [`read_all`](Self::read_all)
    /// this is the captured, bit-order-corrected data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn get_enabled(&self) -> DeviceResult<bool> {
        self.driver.get_enabled().map_err(|err| DeviceError::Io {
            name: self.name.clone(),
            source: err,
        })
    }

    pub fn set_enabled(&mut self, enabled: bool) -> DeviceResult<()> {
        self.driver
            .set_enabled(enabled)
            .map_err(|err| DeviceError::Io {
                name: self.name.clone(),
                source: err,
            })
    }

    pub fn get_done(&self) -> DeviceResult<bool> {
        self.driver.get_done().map_err(|err| DeviceError::Io {
            name: self.name.clone(),
            source: err,
        })
    }

    /// Push the full buffer to hardware: transform, then write until every
    /// byte has been accepted.
    pub fn write_all(&mut self) -> DeviceResult<()> {
        swap::reverse_bits_in_place(&mut self.data);

        self.driver.rewind().map_err(|err| DeviceError::Io {
            name: self.name.clone(),
            source: err,
        })?;

        let mut written = 0;
        while written < self.data.len() {
            let n = self
                .driver
                .write(&self.data[written..])
                .map_err(|err| DeviceError::Io {
                    name: self.name.clone(),
                    source: err,
                })?;
            if n == 0 {
                return Err(DeviceError::Io {
                    name: self.name.clone(),
                    source: io::Error::new(
                        io::ErrorKind::WriteZero,
                        format!("short write at byte {written} of {}", self.data.len()),
                    ),
                });
            }
            written += n;
        }
        Ok(())
    }

    /// Pull the full buffer from hardware: read until every byte has
    /// arrived, then transform.
    pub fn read_all(&mut self) -> DeviceResult<()> {
        self.driver.rewind().map_err(|err| DeviceError::Io {
            name: self.name.clone(),
            source: err,
        })?;

        let mut filled = 0;
        while filled < self.data.len() {
            let n = self
                .driver
                .read(&mut self.data[filled..])
                .map_err(|err| DeviceError::Io {
                    name: self.name.clone(),
                    source: err,
                })?;
            if n == 0 {
                return Err(DeviceError::Io {
                    name: self.name.clone(),
                    source: io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("short read at byte {filled} of {}", self.data.len()),
                    ),
                });
            }
            filled += n;
        }

        swap::reverse_bits_in_place(&mut self.data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::sim::{SimBus, SimDevice};

    #[test]
    fn test_buffer_is_aligned_and_zeroed() {
        let buf = AlignedBuf::zeroed(4096, TRANSFER_ALIGN);
        assert_eq!(buf.as_ptr() as usize % TRANSFER_ALIGN, 0);
        assert_eq!(buf.len(), 4096);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_write_all_transforms_before_transfer() {
        let bus = SimBus::new();
        let sim = SimDevice::player(8, 2, 2, bus.clone());
        let mut handle = DeviceHandle::new("player0", Box::new(sim)).unwrap();

        handle.data_mut()[0] = 0x01;
        handle.write_all().unwrap();

        // hardware sees the bit-reversed byte
        assert_eq!(bus.snapshot()[0], 0x80);
    }

    #[test]
    fn test_read_all_transforms_after_transfer() {
        let bus = SimBus::new();
        bus.store(&[0x80]);
        let sim = SimDevice::sampler(8, 2, 2, bus);
        let mut handle = DeviceHandle::new("sampler0", Box::new(sim)).unwrap();

        handle.read_all().unwrap();
        assert_eq!(handle.data()[0], 0x01);
    }

    #[test]
    fn test_partial_transfers_are_retried() {
        let bus = SimBus::new();
        let sim = SimDevice::player(8, 2, 2, bus.clone()).with_max_chunk(5);
        let mut handle = DeviceHandle::new("player0", Box::new(sim)).unwrap();

        for (i, b) in handle.data_mut().iter_mut().enumerate() {
            *b = i as u8;
        }
        handle.write_all().unwrap();
        assert_eq!(bus.snapshot().len(), 16);
    }

    #[test]
    fn test_failed_transfer_is_io_error() {
        let bus = SimBus::new();
        let sim = SimDevice::player(8, 2, 2, bus).with_failing_transfers();
        let mut handle = DeviceHandle::new("player0", Box::new(sim)).unwrap();

        let err = handle.write_all().unwrap_err();
        assert!(matches!(err, DeviceError::Io { .. }));
    }
}
