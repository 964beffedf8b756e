//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum router, POST /run only)
//!     → body chunks → protocol::StreamingSession → input device buffer
//!     → device::DevicePair::run (serialized, blocking)
//!     → response.rs (framed capture, fixed error pages)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::RequestId;
pub use server::BridgeServer;
