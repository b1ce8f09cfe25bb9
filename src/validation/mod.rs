//! LoRA file validation
//!
//! Existence checks of selected LoRA files under a model root. A missing
//! file is a warning recorded on the result; it never blocks selection.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::LoraEntry;
use crate::selection::SelectionResult;

/// File extensions accepted as LoRA weights.
pub const ACCEPTED_EXTENSIONS: &[&str] = &[
    "safetensors",
    "sft",
    "ckpt",
    "pt",
    "pt2",
    "pth",
    "bin",
    "pkl",
];

/// Default model root, relative to the working directory.
pub const DEFAULT_MODEL_ROOT: &str = "models/loras";

/// A selected LoRA whose file could not be found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub lora_id: String,
    pub file_path: String,
    /// Path that was checked
    pub resolved_path: PathBuf,
    pub message: String,
}

/// Checks LoRA entries against files under a model root.
#[derive(Debug, Clone)]
pub struct PathValidator {
    model_root: PathBuf,
    extensions: Vec<String>,
}

impl Default for PathValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_ROOT)
    }
}

impl PathValidator {
    pub fn new(model_root: impl Into<PathBuf>) -> Self {
        Self {
            model_root: model_root.into(),
            extensions: ACCEPTED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Accept an additional extension (without the leading dot).
    pub fn add_extension(&mut self, ext: impl Into<String>) {
        self.extensions.push(ext.into().trim_start_matches('.').to_string());
    }

    pub fn model_root(&self) -> &Path {
        &self.model_root
    }

    /// Where `entry` is expected on disk. Absolute paths are used as-is.
    pub fn resolve(&self, entry: &LoraEntry) -> PathBuf {
        let path = Path::new(&entry.file_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.model_root.join(path)
        }
    }

    fn has_accepted_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|a| a.eq_ignore_ascii_case(ext)))
    }

    /// Find the file for `entry`.
    ///
    /// A path with an accepted extension must exist as a file. A path without
    /// one is tried with each accepted extension appended.
    pub fn locate(&self, entry: &LoraEntry) -> Option<PathBuf> {
        let path = self.resolve(entry);
        if self.has_accepted_extension(&path) {
            return path.is_file().then_some(path);
        }

        let file_name = path.file_name()?.to_string_lossy().to_string();
        self.extensions
            .iter()
            .map(|ext| path.with_file_name(format!("{}.{}", file_name, ext)))
            .find(|candidate| candidate.is_file())
    }

    /// Pure existence check; any failure reads as `false`.
    pub fn validate(&self, entry: &LoraEntry) -> bool {
        self.locate(entry).is_some()
    }

    /// Annotate every selected entry with its validation result.
    ///
    /// When `enabled` is false nothing is checked and each entry keeps
    /// `path_valid = None`.
    pub fn annotate(&self, result: &mut SelectionResult, enabled: bool) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        if !enabled {
            for lora in &mut result.selected {
                lora.path_valid = None;
            }
            return warnings;
        }

        for lora in &mut result.selected {
            let valid = self.validate(&lora.entry);
            lora.path_valid = Some(valid);

            let resolved = self.resolve(&lora.entry);
            if valid {
                debug!(lora = %lora.lora_id, path = %resolved.display(), "LoRA file found");
            } else {
                warn!(lora = %lora.lora_id, path = %resolved.display(), "LoRA file not found");
                warnings.push(ValidationWarning {
                    lora_id: lora.lora_id.clone(),
                    file_path: lora.entry.file_path.clone(),
                    message: format!("LoRA file not found: {}", resolved.display()),
                    resolved_path: resolved,
                });
            }
        }

        warnings
    }
}

/// Check `entry` under `model_root` with the default extensions.
pub fn validate(entry: &LoraEntry, model_root: &Path) -> bool {
    PathValidator::new(model_root).validate(entry)
}
