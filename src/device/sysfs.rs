//! Kernel-driver device backend.
//!
//! # Responsibilities
//! - Read capacity metadata from `/sys/block/<name>/device/<attr>`
//! - Open the data node `/dev/<name>` with direct, synchronous I/O
//! - Drive the enable/done control registers through the driver's ioctls
//!
//! # Design Decisions
//! - `O_DIRECT` requires the transfer buffer to be block-aligned; the
//!   alignment is owned by `DeviceHandle`, not here
//! - Metadata is read once at open; control state is read on every call

use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use super::driver::{DeviceDriver, DeviceError, DeviceMetadata, DeviceRole};

/// ioctl magic shared by the sampler and player drivers.
const SP_IOC_MAGIC: u8 = 0x9d;

nix::ioctl_none!(sp_get_enabled, SP_IOC_MAGIC, 0);
nix::ioctl_write_int_bad!(sp_set_enabled, nix::request_code_none!(SP_IOC_MAGIC, 1));
nix::ioctl_none!(sp_get_done, SP_IOC_MAGIC, 2);

/// A sampler or player exposed by the kernel driver as a block-style device.
pub struct SysfsDevice {
    name: String,
    meta: DeviceMetadata,
    node: File,
}

impl SysfsDevice {
    /// Open the named device: read its sysfs metadata, then open the data
    /// node read-only (sampler) or write-only (player).
    pub fn open(name: &str) -> Result<Self, DeviceError> {
        let meta = read_metadata(name)?;

        let path = Path::new("/dev").join(name);
        let mut options = OpenOptions::new();
        match meta.role {
            DeviceRole::Sampler => options.read(true),
            DeviceRole::Player => options.write(true),
        };
        let node = options
            .custom_flags(libc::O_DIRECT | libc::O_SYNC)
            .open(&path)
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => DeviceError::NotFound {
                    name: name.to_string(),
                },
                _ => DeviceError::Io {
                    name: name.to_string(),
                    source: err,
                },
            })?;

        tracing::info!(
            device = name,
            role = %meta.role,
            time_length = meta.time_length,
            sample_length = meta.sample_length,
            sample_width = meta.sample_width,
            length = meta.length,
            "Device opened"
        );

        Ok(Self {
            name: name.to_string(),
            meta,
            node,
        })
    }
}

impl DeviceDriver for SysfsDevice {
    fn metadata(&self) -> &DeviceMetadata {
        &self.meta
    }

    fn get_enabled(&self) -> io::Result<bool> {
        let v = unsafe { sp_get_enabled(self.node.as_raw_fd()) }.map_err(io::Error::from)?;
        Ok(v != 0)
    }

    fn set_enabled(&mut self, enabled: bool) -> io::Result<()> {
        unsafe { sp_set_enabled(self.node.as_raw_fd(), enabled as libc::c_int) }
            .map_err(io::Error::from)?;
        Ok(())
    }

    fn get_done(&self) -> io::Result<bool> {
        let v = unsafe { sp_get_done(self.node.as_raw_fd()) }.map_err(io::Error::from)?;
        Ok(v != 0)
    }

    fn rewind(&mut self) -> io::Result<()> {
        self.node.seek(SeekFrom::Start(0))?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.node.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.node.write(buf)
    }
}

/// Read one sysfs attribute, trailing whitespace stripped.
fn sysfs_attr(name: &str, key: &str) -> Result<String, DeviceError> {
    let path = format!("/sys/block/{name}/device/{key}");
    let raw = fs::read_to_string(&path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => DeviceError::NotFound {
            name: name.to_string(),
        },
        _ => DeviceError::Io {
            name: name.to_string(),
            source: err,
        },
    })?;
    Ok(raw.trim_end().to_string())
}

fn sysfs_attr_u32(name: &str, key: &str) -> Result<u32, DeviceError> {
    let raw = sysfs_attr(name, key)?;
    raw.parse().map_err(|_| DeviceError::Metadata {
        name: name.to_string(),
        reason: format!("attribute {key} is not an integer: {raw:?}"),
    })
}

fn read_metadata(name: &str) -> Result<DeviceMetadata, DeviceError> {
    let role: DeviceRole =
        sysfs_attr(name, "type")?
            .parse()
            .map_err(|reason| DeviceError::Metadata {
                name: name.to_string(),
                reason,
            })?;

    let meta = DeviceMetadata {
        role,
        sample_width: sysfs_attr_u32(name, "sample_width")?,
        sample_bits: sysfs_attr_u32(name, "sample_bits")?,
        sample_length: sysfs_attr_u32(name, "sample_length")?,
        time_bits: sysfs_attr_u32(name, "time_bits")?,
        time_length: sysfs_attr_u32(name, "time_length")?,
        bits: sysfs_attr_u32(name, "bits")?,
        length: sysfs_attr_u32(name, "length")?,
    };
    meta.validate(name)?;
    Ok(meta)
}
