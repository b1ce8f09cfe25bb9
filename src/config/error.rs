//! Configuration errors

use std::path::PathBuf;

/// Errors raised while loading, migrating or querying LoRA configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config file {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error(
        "Duplicate category '{name}' declared by {} and {}",
        .first.display(),
        .second.display()
    )]
    DuplicateCategory {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Unknown category: '{0}'")]
    UnknownCategory(String),

    #[error("Category '{0}' has no LoRAs")]
    EmptyCategory(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ConfigError::Malformed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
