//! HTTP bridge for a sampler/player hardware pair.
//!
//! Exposes a pair of data-mover peripherals — a *player* that streams a
//! buffer out to hardware and a *sampler* that captures one back — as a
//! single synchronous RPC: `POST /run` with input samples, get the captured
//! output samples back.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client                       ┌──────────────────────────────────────┐
//!   ───── POST /run ────────────▶│  http      Axum router, one route    │
//!   body chunks                  │    │                                 │
//!                                │    ▼                                 │
//!                                │  protocol  StreamingSession packs    │
//!                                │    │       chunks into sample slots  │
//!                                │    ▼                                 │
//!                                │  device    DevicePair run handshake  │
//!                                │    │       (disable→load→arm→poll    │
//!                                │    │        →disable→drain)          │
//!                                │    ▼                                 │
//!                                │  /dev/player0   /dev/sampler0        │
//!   ◀──── capture buffer ────────│  (bit-order transform at boundary)   │
//!                                └──────────────────────────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod device;
pub mod http;
pub mod protocol;

// Cross-cutting concerns
pub mod lifecycle;

pub use config::BridgeConfig;
pub use device::{DeviceHandle, DevicePair};
pub use http::BridgeServer;
pub use lifecycle::Shutdown;
