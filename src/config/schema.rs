//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so a minimal (or absent) config works.

use serde::{Deserialize, Serialize};

/// Root configuration for the bridge.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BridgeConfig {
    /// Listener settings (the port comes from the command line).
    pub server: ServerConfig,

    /// Device pair identities, fixed at startup.
    pub devices: DeviceConfig,

    /// Hardware run settings.
    pub run: RunConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind (e.g., "0.0.0.0"); the port is a CLI argument.
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
        }
    }
}

/// Device pair identities.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Sampler (output) device name under /dev and /sys/block.
    pub sampler: String,

    /// Player (input) device name under /dev and /sys/block.
    pub player: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            sampler: "sampler0".to_string(),
            player: "player0".to_string(),
        }
    }
}

/// Hardware run configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RunConfig {
    /// Deadline for the devices' done flags after arming, in milliseconds.
    /// `0` disables the deadline (unbounded wait).
    pub completion_timeout_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            completion_timeout_ms: 5_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` overrides.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.devices.sampler, "sampler0");
        assert_eq!(config.devices.player, "player0");
        assert_eq!(config.run.completion_timeout_ms, 5_000);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: BridgeConfig = toml::from_str(
            r#"
            [devices]
            sampler = "sampler1"
            "#,
        )
        .unwrap();
        assert_eq!(config.devices.sampler, "sampler1");
        assert_eq!(config.devices.player, "player0");
        assert_eq!(config.server.host, "0.0.0.0");
    }
}
