//! The coupled player/sampler pair and its run handshake.
//!
//! # Run Handshake
//! ```text
//! Idle → Disabling   set_enabled(false) on both devices
//!      → Loading     input.write_all()  (caller-populated buffer → hardware)
//!      → Armed       set_enabled(true) on both devices
//!      → Running     poll input done, then output done, under a deadline
//!      → Draining    set_enabled(false) on both devices
//!      → Idle        output.read_all()  (hardware → captured buffer)
//! ```
//! Strictly sequential, no step skipped. One run in flight at a time; the
//! HTTP layer serializes callers with a mutex.
//!
//! # Design Decisions
//! - The completion wait is a tight poll (the hardware finishes in bounded
//!   cycles), but bounded by a configurable deadline that fails the run with
//!   `DeviceError::TimedOut` instead of hanging the server on a dead device.
//!   A zero timeout disables the deadline.

use std::time::{Duration, Instant};

use super::driver::{DeviceError, DeviceResult, DeviceRole};
use super::handle::DeviceHandle;

/// Phase of the run handshake, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Disabling,
    Loading,
    Armed,
    Running,
    Draining,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunPhase::Idle => "idle",
            RunPhase::Disabling => "disabling",
            RunPhase::Loading => "loading",
            RunPhase::Armed => "armed",
            RunPhase::Running => "running",
            RunPhase::Draining => "draining",
        };
        f.write_str(s)
    }
}

/// Exactly one input (player) and one output (sampler) device.
pub struct DevicePair {
    input: DeviceHandle,
    output: DeviceHandle,
    completion_timeout: Duration,
}

impl std::fmt::Debug for DevicePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevicePair")
            .field("input", &self.input.name())
            .field("output", &self.output.name())
            .field("completion_timeout", &self.completion_timeout)
            .finish()
    }
}

impl DevicePair {
    /// Couple two already-opened handles. Roles are checked here so a pair
    /// can never be built backwards.
    pub fn new(
        input: DeviceHandle,
        output: DeviceHandle,
        completion_timeout: Duration,
    ) -> DeviceResult<Self> {
        for (handle, expected) in [(&input, DeviceRole::Player), (&output, DeviceRole::Sampler)] {
            let actual = handle.metadata().role;
            if actual != expected {
                return Err(DeviceError::WrongRole {
                    name: handle.name().to_string(),
                    expected,
                    actual,
                });
            }
        }
        Ok(Self {
            input,
            output,
            completion_timeout,
        })
    }

    /// Open both named devices through the kernel driver.
    pub fn open(
        player: &str,
        sampler: &str,
        completion_timeout: Duration,
    ) -> DeviceResult<Self> {
        let input = DeviceHandle::open(player, DeviceRole::Player)?;
        let output = DeviceHandle::open(sampler, DeviceRole::Sampler)?;
        Self::new(input, output, completion_timeout)
    }

    pub fn input(&self) -> &DeviceHandle {
        &self.input
    }

    pub fn output(&self) -> &DeviceHandle {
        &self.output
    }

    /// The input device buffer, to be populated before [`run`](Self::run).
    pub fn inputs_mut(&mut self) -> &mut [u8] {
        self.input.data_mut()
    }

    /// The captured output buffer, valid after a successful run.
    pub fn outputs(&self) -> &[u8] {
        self.output.data()
    }

    /// Execute one hardware transaction. Blocks the calling thread for the
    /// duration of the transfer; see the module docs for the phase sequence.
    pub fn run(&mut self) -> DeviceResult<()> {
        tracing::debug!(phase = %RunPhase::Disabling, "run handshake");
        self.output.set_enabled(false)?;
        self.input.set_enabled(false)?;

        tracing::debug!(phase = %RunPhase::Loading, bytes = self.input.data().len(), "run handshake");
        self.input.write_all()?;

        tracing::debug!(phase = %RunPhase::Armed, "run handshake");
        self.output.set_enabled(true)?;
        self.input.set_enabled(true)?;

        tracing::debug!(phase = %RunPhase::Running, "run handshake");
        let started = Instant::now();
        Self::wait_done(&self.input, started, self.completion_timeout)?;
        Self::wait_done(&self.output, started, self.completion_timeout)?;

        tracing::debug!(phase = %RunPhase::Draining, "run handshake");
        self.output.set_enabled(false)?;
        self.input.set_enabled(false)?;

        self.output.read_all()?;
        tracing::debug!(phase = %RunPhase::Idle, "run handshake complete");
        Ok(())
    }

    fn wait_done(
        device: &DeviceHandle,
        started: Instant,
        timeout: Duration,
    ) -> DeviceResult<()> {
        while !device.get_done()? {
            if !timeout.is_zero() && started.elapsed() > timeout {
                return Err(DeviceError::TimedOut {
                    name: device.name().to_string(),
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
            std::hint::spin_loop();
        }
        Ok(())
    }
}
