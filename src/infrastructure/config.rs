//! Engine configuration

use crate::domain::tag::{AccessLevel, LanguageFilter, ALL_LANGUAGES, PUBLIC_ACCESS};
use crate::error::{Result, TagmapError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory holding engine state inside a data directory
pub const STATE_DIR: &str = ".tagmap";

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Access level given to tags created on the fly
    pub default_access: AccessLevel,
    /// Language given to tags created on the fly
    pub default_language: String,
    /// Language filter for item tag listings when the caller passes none
    pub tag_list_language_filter: LanguageFilter,
    /// Alias of the root tag
    pub root_alias: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            default_access: PUBLIC_ACCESS,
            default_language: ALL_LANGUAGES.to_string(),
            tag_list_language_filter: LanguageFilter::All,
            root_alias: "root".to_string(),
        }
    }
}

impl EngineConfig {
    fn config_path(path: &Path) -> PathBuf {
        path.join(STATE_DIR).join(CONFIG_FILE)
    }

    /// Load config from .tagmap/config.toml in the given directory
    pub fn load_from_dir(path: &Path) -> Result<Self> {
        let config_path = Self::config_path(path);

        let contents = fs::read_to_string(&config_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TagmapError::NotFound(format!("No config at {}", config_path.display()))
            } else {
                TagmapError::Io(e)
            }
        })?;

        toml::from_str(&contents)
            .map_err(|e| TagmapError::Config(format!("Failed to parse config.toml: {}", e)))
    }

    /// Load config, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load_from_dir(path) {
            Err(TagmapError::NotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    /// Save config to .tagmap/config.toml in the given directory
    pub fn save_to_dir(&self, path: &Path) -> Result<()> {
        let state_dir = path.join(STATE_DIR);

        if !state_dir.exists() {
            fs::create_dir_all(&state_dir)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| TagmapError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(Self::config_path(path), contents)?;

        Ok(())
    }
}
