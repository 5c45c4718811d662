//! Export options for the lighting-console plugin, loaded from YAML.
//!
//! ```yaml
//! plugin-name: BeatGrid
//! script-name: beatgrid_timing
//! version: 1.0.0
//! chunk-size: 1024
//! line-ending: crlf
//! ```
//!
//! Every key is optional.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::BeatGridError;

pub const DEFAULT_CHUNK_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Crlf,
    Lf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Crlf => "\r\n",
            LineEnding::Lf => "\n",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ExportConfig {
    pub plugin_name: String,
    pub script_name: String,
    pub version: String,
    pub chunk_size: usize,
    pub line_ending: LineEnding,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            plugin_name: "BeatGrid".to_string(),
            script_name: "beatgrid_timing".to_string(),
            version: "1.0.0".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            line_ending: LineEnding::default(),
        }
    }
}

impl ExportConfig {
    pub fn from_yaml(content: &str) -> Result<Self, BeatGridError> {
        // An empty document deserializes as unit, not as a map
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: ExportConfig =
            serde_yaml::from_str(content).map_err(|e| BeatGridError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, BeatGridError> {
        let content = fs::read_to_string(path).map_err(|source| BeatGridError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn validate(&self) -> Result<(), BeatGridError> {
        if self.chunk_size == 0 {
            return Err(BeatGridError::Config(
                "chunk-size must be greater than 0".to_string(),
            ));
        }
        if self.plugin_name.trim().is_empty() {
            return Err(BeatGridError::Config(
                "plugin-name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
