//! File helpers shared by the loader and the migration driver.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use super::error::ConfigError;

/// A parsed JSON file together with the SHA-256 digest of its raw bytes.
pub(crate) struct LoadedFile<T> {
    pub value: T,
    pub digest: String,
}

/// Read and parse a JSON file, recording its digest.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<LoadedFile<T>, ConfigError> {
    let bytes = fs::read(path).map_err(|e| ConfigError::io(path, e))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hex::encode(hasher.finalize());

    let value = serde_json::from_slice(&bytes).map_err(|e| ConfigError::malformed(path, e))?;

    Ok(LoadedFile { value, digest })
}

/// Write pretty JSON atomically (write-then-rename).
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), ConfigError> {
    let mut json = serde_json::to_string_pretty(value)
        .map_err(|e| ConfigError::Migration(format!("JSON serialization failed: {}", e)))?;
    json.push('\n');

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let temp_path = parent.join(format!(".{}.tmp", uuid::Uuid::new_v4()));

    fs::write(&temp_path, json).map_err(|e| ConfigError::io(&temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        ConfigError::io(path, e)
    })
}
