//! Crop configuration.
//!
//! Handles the padding parameter and the optional `autocrop.toml` file.
//! Stock defaults are overridden by the config file, which is in turn
//! overridden by command-line flags.
//!
//! ## Padding
//!
//! Padding is the only parameter that changes the output pixels: the width, in
//! pixels, of the transparent band added on every side of the cropped content.
//! As text (the `--padding` flag) it must be one or more ASCII decimal digits.
//! Anything else (empty, signs, spaces, `1.5`, `1e3`) is rejected before any
//! image is touched.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! padding = 0               # Transparent border width in pixels
//!
//! [output]
//! jpeg_quality = 90         # JPEG encoding quality (1-100)
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Invalid padding {0:?}: expected one or more decimal digits")]
    InvalidPadding(String),
}

/// Transparent border width, in pixels, added on every side of a crop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Padding(u32);

impl Padding {
    pub fn new(pixels: u32) -> Self {
        Self(pixels)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Validate padding text: one or more decimal digits, nothing else.
    ///
    /// ```
    /// # use autocrop::config::Padding;
    /// assert_eq!(Padding::parse("12").unwrap().value(), 12);
    /// assert!(Padding::parse("").is_err());
    /// assert!(Padding::parse("+3").is_err());
    /// ```
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::InvalidPadding(text.to_string()));
        }
        // All digits, so the only possible failure is overflow.
        text.parse::<u32>()
            .map(Self)
            .map_err(|_| ConfigError::InvalidPadding(text.to_string()))
    }
}

impl fmt::Display for Padding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}px", self.0)
    }
}

/// Crop configuration loaded from `autocrop.toml`.
///
/// All fields have defaults. A config file need only specify the values it
/// wants to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CropConfig {
    /// Transparent border added around every cropped image.
    pub padding: Padding,
    /// Encoding settings for cropped output.
    pub output: OutputConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl CropConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.output.jpeg_quality) {
            return Err(ConfigError::Validation(
                "output.jpeg_quality must be 1-100".into(),
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

/// Output encoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// JPEG quality for `.jpg`/`.jpeg` outputs.
    pub jpeg_quality: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { jpeg_quality: 90 }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
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

// =============================================================================
// Config loading and validation
// =============================================================================

/// Parse config text and validate it. Keys left out take their defaults.
pub fn parse_config(text: &str) -> Result<CropConfig, ConfigError> {
    let config: CropConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to defaults when the file is absent.
///
/// A file that exists but is unreadable, malformed, or out of range is an
/// error, never silently ignored.
pub fn load_config(path: &Path) -> Result<CropConfig, ConfigError> {
    if !path.exists() {
        return Ok(CropConfig::default());
    }
    parse_config(&fs::read_to_string(path)?)
}

/// Returns a fully-commented stock `autocrop.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Autocrop Configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Command-line flags override values from this file.
# Unknown keys will cause an error.

# Width, in pixels, of the transparent border added on every side of the
# cropped content. 0 crops tight to the visible pixels.
padding = 0

# ---------------------------------------------------------------------------
# Output encoding
# ---------------------------------------------------------------------------
[output]
# Quality for .jpg/.jpeg outputs (1 = worst, 100 = best).
# JPEG has no transparency: the padding band is written as black.
jpeg_quality = 90

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
