//! Tool configuration.
//!
//! Handles loading, validating and merging `imgwand.toml`. Values are layered:
//! stock defaults, then the config file, then command-line flags (applied by
//! the binary on top of the loaded [`ToolConfig`]).
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! identify_format = "%wx%h, hash: %H, comment: %c"
//! default_format = "png"    # Output format when the target names none
//! log_level = "warn"        # Used when RUST_LOG is unset
//!
//! [decode]
//! strict = false            # Fail on malformed metadata instead of dropping it
//!
//! [encode]
//! compression_level = -1    # -1 = codec default, otherwise 0-100
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! resize_filter = "bilinear"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::ResizeStrategy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File looked up in the working directory when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "imgwand.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Tool configuration loaded from `imgwand.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Template for `--identify` lines.
    pub identify_format: String,
    /// Output format when the target has no usable prefix or extension.
    pub default_format: String,
    /// Tracing filter used when `RUST_LOG` is unset.
    pub log_level: String,
    pub decode: DecodeConfig,
    pub encode: EncodeConfig,
    pub processing: ProcessingConfig,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            identify_format: "%wx%h, hash: %H, comment: %c".to_string(),
            default_format: "png".to_string(),
            log_level: "warn".to_string(),
            decode: DecodeConfig::default(),
            encode: EncodeConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl ToolConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.encode.compression_level;
        if !(-1..=100).contains(&level) {
            return Err(ConfigError::Validation(format!(
                "encode.compression_level must be -1 or 0-100, got {level}"
            )));
        }
        if self.default_format.trim().is_empty() {
            return Err(ConfigError::Validation(
                "default_format must not be empty".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecodeConfig {
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodeConfig {
    pub compression_level: i32,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            compression_level: -1,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
    pub resize_filter: ResizeStrategy,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ToolConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<ToolConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ToolConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the config file at `path`, falling back to defaults when absent.
pub fn load_config(path: &Path) -> Result<ToolConfig, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Returns a fully-commented stock `imgwand.toml` with all keys and
/// explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# imgwand configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Looked up as ./imgwand.toml unless --config points elsewhere.
# Command-line flags override anything set here.
# Unknown keys will cause an error.

# Template for --identify output. Properties:
#   %w %h          width and height
#   %H             64-bit difference hash
#   %J             {"width":..,"height":..,"hash":..}
#   %c             comments joined by "; "
#   %n             number of comments
#   %[name]        long names: width, height, hash, json, comment, comments
#   %%             a literal percent sign
identify_format = "%wx%h, hash: %H, comment: %c"

# Output format when the target has neither a "format:" prefix nor a
# known extension.
default_format = "png"

# Log filter when RUST_LOG is unset: error, warn, info, debug, trace.
log_level = "warn"

# ---------------------------------------------------------------------------
# Decoding
# ---------------------------------------------------------------------------
[decode]
# Fail on malformed metadata chunks instead of skipping them.
strict = false

# ---------------------------------------------------------------------------
# Encoding
# ---------------------------------------------------------------------------
[encode]
# -1 uses each codec's default. 0-100 trades size for speed/quality:
# lossy codecs use quality = 100 - level.
compression_level = -1

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers. Omit for auto (= number of CPU cores).
# Values above the core count are clamped down.
# max_processes = 4

# Resampling filter for --resize: "nearest", "bilinear" or "lanczos3".
resize_filter = "bilinear"
"##
}
