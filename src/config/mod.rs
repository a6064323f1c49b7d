//! Configuration management for the DDoS simulation service.
//!
//! This module handles loading and managing application configuration
//! from built-in defaults, an optional configuration file and environment
//! variables.

use std::env;

use config::{Config as ConfigBuilder, ConfigError, Environment, File};

pub use crate::models::{
    ClassifierKind, Config, DetectionConfig, ServerConfig, SimulationConfig,
};

/// Prefix of environment overrides, e.g. `DDOS_SIM_SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "DDOS_SIM";

/// Load configuration from `CONFIG_FILE` (if present) and environment variables
pub fn load_config() -> Result<Config, ConfigError> {
    let config_file = env::var("CONFIG_FILE").unwrap_or_else(|_| "config/default.toml".to_string());
    let environment = Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true);

    load_from(&config_file, environment)
}

/// Layer defaults, an optional file and an environment source, then validate.
pub fn load_from(config_file: &str, environment: Environment) -> Result<Config, ConfigError> {
    let config: Config = ConfigBuilder::builder()
        .add_source(ConfigBuilder::try_from(&Config::default())?)
        .add_source(File::with_name(config_file).required(false))
        .add_source(environment)
        .build()?
        .try_deserialize()?;

    validate(&config)?;
    Ok(config)
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Message(message.to_string())
}

/// Reject settings the simulation cannot run with
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let simulation = &config.simulation;
    if simulation.history_capacity == 0 {
        return Err(invalid("simulation.history_capacity must be positive"));
    }
    if simulation.tick_interval_ms == 0 {
        return Err(invalid("simulation.tick_interval_ms must be positive"));
    }
    if simulation.push_channel_capacity == 0 {
        return Err(invalid("simulation.push_channel_capacity must be positive"));
    }
    if !simulation.default_intensity.is_finite() || simulation.default_intensity < 0.0 {
        return Err(invalid("simulation.default_intensity must be a non-negative number"));
    }
    if !simulation.default_duration_secs.is_finite() || simulation.default_duration_secs < 0.0 {
        return Err(invalid("simulation.default_duration_secs must be a non-negative number"));
    }
    if !(0.0..=1.0).contains(&simulation.alert_confidence) {
        return Err(invalid("simulation.alert_confidence must be within [0, 1]"));
    }

    let detection = &config.detection;
    if detection.n_estimators == 0 {
        return Err(invalid("detection.n_estimators must be positive"));
    }
    if detection.training_samples < 2 {
        return Err(invalid("detection.training_samples must be at least 2"));
    }
    Ok(())
}
