//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Catch device misconfiguration before any hardware is opened
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: BridgeConfig → Result<(), Vec<ValidationError>>

use super::schema::BridgeConfig;

/// One failed semantic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Run every semantic check against the config.
pub fn validate_config(config: &BridgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push(ValidationError {
            field: "server.host",
            message: "must not be empty".to_string(),
        });
    }

    if config.devices.sampler.trim().is_empty() {
        errors.push(ValidationError {
            field: "devices.sampler",
            message: "must not be empty".to_string(),
        });
    }
    if config.devices.player.trim().is_empty() {
        errors.push(ValidationError {
            field: "devices.player",
            message: "must not be empty".to_string(),
        });
    }
    if !config.devices.sampler.trim().is_empty()
        && config.devices.sampler == config.devices.player
    {
        errors.push(ValidationError {
            field: "devices",
            message: format!(
                "sampler and player must be distinct devices, both are {:?}",
                config.devices.sampler
            ),
        });
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.as_str()) {
        errors.push(ValidationError {
            field: "observability.log_level",
            message: format!(
                "unknown level {:?}, expected one of {}",
                config.observability.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
