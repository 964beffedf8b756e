//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Parse CLI → Load config → Open device pair → Bind → Serve
//!
//! Shutdown (shutdown.rs):
//!     stdin line / Ctrl+C → broadcast trigger → server drains → exit 0
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and exits 1
//! - Device handles live from startup to shutdown; nothing is reopened

pub mod shutdown;

pub use shutdown::Shutdown;
