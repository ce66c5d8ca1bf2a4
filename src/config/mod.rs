use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::error::{TouchError, TouchResult};
use crate::utils::validate_identifier;

/// Default column written by every touch
pub const DEFAULT_TIMESTAMP_COLUMN: &str = "updated_at";

/// Maximum flush passes before a flush is considered a callback loop
pub const DEFAULT_MAX_FLUSH_PASSES: usize = 100;

/// Environment variable names read by `TouchConfig::from_env`
pub const ENV_ENABLED: &str = "DEFERRED_TOUCH_ENABLED";
pub const ENV_TIMESTAMP_COLUMNS: &str = "DEFERRED_TOUCH_TIMESTAMP_COLUMNS";
pub const ENV_MAX_FLUSH_PASSES: &str = "DEFERRED_TOUCH_MAX_FLUSH_PASSES";

/// Settings for a `TouchContext`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TouchConfig {
    /// When false, `run_deferred` runs its body without deferring anything
    pub enabled: bool,

    /// Columns updated by a touch when the record type does not name its own
    pub default_timestamp_columns: Vec<String>,

    /// Pass cap for one flush (`None` = unbounded)
    pub max_flush_passes: Option<usize>,

    /// Log every rendered update statement at debug level
    pub log_statements: bool,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_timestamp_columns: vec![DEFAULT_TIMESTAMP_COLUMN.to_string()],
            max_flush_passes: Some(DEFAULT_MAX_FLUSH_PASSES),
            log_statements: false,
        }
    }
}

impl TouchConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> TouchResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> TouchResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Build a config from `DEFERRED_TOUCH_*` environment variables.
    pub fn from_env() -> TouchResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (used by `from_env`).
    pub fn from_lookup<F>(lookup: F) -> TouchResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_ENABLED) {
            config.enabled = parse_bool(ENV_ENABLED, &raw)?;
        }

        if let Some(raw) = lookup(ENV_TIMESTAMP_COLUMNS) {
            config.default_timestamp_columns = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(raw) = lookup(ENV_MAX_FLUSH_PASSES) {
            let trimmed = raw.trim();
            config.max_flush_passes = if trimmed == "0" || trimmed.eq_ignore_ascii_case("none") {
                None
            } else {
                let passes = trimmed.parse::<usize>().map_err(|e| TouchError::ConfigError {
                    setting: ENV_MAX_FLUSH_PASSES.to_string(),
                    value: raw.clone(),
                    reason: e.to_string(),
                })?;
                Some(passes)
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the flush executor cannot work with.
    pub fn validate(&self) -> TouchResult<()> {
        for column in &self.default_timestamp_columns {
            validate_identifier(column).map_err(|e| TouchError::ConfigError {
                setting: "default_timestamp_columns".to_string(),
                value: column.clone(),
                reason: e.to_string(),
            })?;
        }

        if self.max_flush_passes == Some(0) {
            return Err(TouchError::ConfigError {
                setting: "max_flush_passes".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1 (use null for no limit)".to_string(),
            });
        }

        Ok(())
    }
}

fn parse_bool(setting: &str, raw: &str) -> TouchResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(TouchError::ConfigError {
            setting: setting.to_string(),
            value: raw.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}
