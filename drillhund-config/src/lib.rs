//! # Drillhund Configuration System
//!
//! Hierarchical configuration for the drill engine and its CLI.
//!
//! ## Features
//! - **Unified Configuration**: one source of truth across all components
//! - **Validation**: runtime validation of critical parameters
//! - **Environment Awareness**: `DRILLHUND_*` variables override files

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod error;
mod validation;

pub use error::ConfigError;

/// Top-level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
pub struct DrillhundConfig {
    /// Where scenario files live and which task to load by default.
    #[validate(nested)]
    pub scenario: ScenarioConfig,

    /// Telemetry and observability configuration.
    #[validate(nested)]
    pub telemetry: TelemetryConfig,
}

/// Scenario lookup parameters for the file-backed provider.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ScenarioConfig {
    /// Directory scanned for `task_<id>.yaml` / `task_<id>.json` files.
    #[serde(default = "default_scenario_dir")]
    pub dir: PathBuf,

    /// Task id used when the command line does not name one.
    #[serde(default = "default_task", deserialize_with = "string_or_number")]
    #[validate(length(min = 1))]
    pub default_task: String,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            dir: default_scenario_dir(),
            default_task: default_task(),
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct TelemetryConfig {
    /// Default log level when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    #[validate(custom(function = validation::validate_log_level))]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Task ids are strings, but env vars and YAML scalars deliver bare numbers
/// (`DRILLHUND_SCENARIO__DEFAULT_TASK=7`), so numeric values are coerced.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(value) => value.to_string(),
        Raw::Text(value) => value,
    })
}

fn default_scenario_dir() -> PathBuf {
    PathBuf::from("scenarios")
}

fn default_task() -> String {
    "1".into()
}

fn default_log_level() -> String {
    "info".into()
}

impl DrillhundConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/drillhund.yaml` - base settings. If missing, defaults are used.
    /// 3. `DRILLHUND_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(DrillhundConfig::default()));

        if Path::new("config/drillhund.yaml").exists() {
            figment = figment.merge(Yaml::file("config/drillhund.yaml"));
        }

        figment
            .merge(Env::prefixed("DRILLHUND_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }

    /// Load configuration from a specific path for testing/validation.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(
                path.to_string_lossy().to_string(),
            )));
        }

        Figment::from(Serialized::defaults(DrillhundConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("DRILLHUND_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}
