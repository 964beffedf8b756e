//! Device layer subsystem.
//!
//! # Data Flow
//! ```text
//! open(name)
//!     → sysfs.rs (metadata from /sys, data node from /dev, ioctl control)
//!     → handle.rs (validated metadata, aligned buffer, whole-buffer I/O)
//!     → pair.rs (player + sampler coupled, run handshake)
//!
//! Every buffer crossing the hardware boundary passes through swap.rs
//! (bit-order reversal) exactly once in each direction.
//! ```
//!
//! # Design Decisions
//! - The backend is a trait (driver.rs) so sim.rs can replace real hardware
//!   in tests
//! - Handles are opened once at startup and live until shutdown; nothing in
//!   this layer is per-request

pub mod driver;
pub mod handle;
pub mod pair;
pub mod sim;
pub mod swap;
pub mod sysfs;

pub use driver::{DeviceDriver, DeviceError, DeviceMetadata, DeviceResult, DeviceRole};
pub use handle::DeviceHandle;
pub use pair::DevicePair;
