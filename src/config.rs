//! Parser configuration.
//!
//! Loaded from TOML, with defaults suitable for a typical FDM printer:
//!
//! ```toml
//! max_line_length = 256
//! checksum_required = false
//! axis_letters = "XYZUVWABCD"
//! machine_type = "cnc"
//! can_expansion = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// The kind of machine the parser serves. Continuation lines without a
/// command letter are only recognized on CNC machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineType {
    #[default]
    Fff,
    Laser,
    Cnc,
}

/// Build-time and site configuration consumed by [`crate::Parser`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParserConfig {
    /// Capacity of the line buffer. A line that fills the whole buffer is
    /// reported and dropped.
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
    /// Longest accepted variable name inside a `{...}` expression.
    #[serde(default = "default_max_variable_name_length")]
    pub max_variable_name_length: usize,
    /// When set, lines arriving on the outermost channel must carry a
    /// `*NNN` checksum or they are dropped.
    #[serde(default)]
    pub checksum_required: bool,
    /// Letters that address an axis, used to recognize continuation lines.
    #[serde(default = "default_axis_letters")]
    pub axis_letters: String,
    #[serde(default)]
    pub machine_type: MachineType,
    /// Whether drivers live on CAN expansion boards, giving driver ids the
    /// `board.driver` form.
    #[serde(default)]
    pub can_expansion: bool,
}

fn default_max_line_length() -> usize {
    256
}

fn default_max_variable_name_length() -> usize {
    100
}

fn default_axis_letters() -> String {
    "XYZUVWABCD".to_string()
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_line_length: default_max_line_length(),
            max_variable_name_length: default_max_variable_name_length(),
            checksum_required: false,
            axis_letters: default_axis_letters(),
            machine_type: MachineType::default(),
            can_expansion: false,
        }
    }
}

impl ParserConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}
