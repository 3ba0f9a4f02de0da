//! Error types for tagmap

use thiserror::Error;

/// Main error type for the tagging engine
#[derive(Debug, Error)]
pub enum TagmapError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Coarse classification of a [`TagmapError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input, bad token, empty required set
    Validation,
    /// Unknown type alias or tag id
    NotFound,
    /// Store rejected a read or write
    Persistence,
}

impl TagmapError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TagmapError::Validation(_) | TagmapError::Config(_) => ErrorKind::Validation,
            TagmapError::NotFound(_) => ErrorKind::NotFound,
            TagmapError::Persistence(_)
            | TagmapError::Io(_)
            | TagmapError::Json(_)
            | TagmapError::TomlDeserialize(_)
            | TagmapError::TomlSerialize(_) => ErrorKind::Persistence,
        }
    }

    /// True when the error means "nothing matches" rather than a fault
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Result type using TagmapError
pub type Result<T> = std::result::Result<T, TagmapError>;
