//! Streaming protocol subsystem.
//!
//! # Data Flow
//! ```text
//! request body (arbitrarily sized chunks)
//!     → session.rs (header parse, bounds check, slot packing, zero fill)
//!     → input device buffer
//!
//! captured output buffer
//!     → frame.rs (8-byte big-endian header + raw bytes)
//!     → response body
//! ```
//!
//! # Design Decisions
//! - The session is pure over a borrowed buffer: no device control, no I/O,
//!   so every state transition is unit-testable without hardware
//! - Malformed input is an absorbing state; nothing after the first bad
//!   chunk can touch the buffer

pub mod frame;
pub mod session;

pub use frame::{RequestHeader, ResponseHeader, HEADER_LEN};
pub use session::{DeviceLimits, SessionEnd, StreamingSession};
