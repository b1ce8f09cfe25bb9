//! Serializable outputs handed back to the host
//!
//! - `LoraInfoReport`: the `selected_lora_info` output
//! - `DebugReport`: the `debug_info` output
//! - `ErrorReport`: `selected_lora_info` when a run fails

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::ConfigSource;
use crate::selection::{SeedSource, SelectionResult};
use crate::validation::ValidationWarning;

/// One selected LoRA in the info report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoraDetail {
    pub name: String,
    pub file_path: String,
    pub strength: f64,
    pub trigger_words: Vec<String>,
    pub tags: Vec<String>,
}

/// Structured selection info.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoraInfoReport {
    pub selected_count: usize,
    pub loras: Vec<LoraDetail>,
    /// Mean resolved strength
    pub combined_strength: f64,
    /// Aggregated trigger words, comma-joined
    pub all_trigger_words: String,
}

impl LoraInfoReport {
    pub fn from_selection(result: &SelectionResult, all_trigger_words: &str) -> Self {
        Self {
            selected_count: result.len(),
            loras: result
                .selected
                .iter()
                .map(|s| LoraDetail {
                    name: s.lora_id.clone(),
                    file_path: s.entry.file_path.clone(),
                    strength: s.strength,
                    trigger_words: s.trigger_words.clone(),
                    tags: s.entry.tags.iter().cloned().collect(),
                })
                .collect(),
            combined_strength: result.combined_strength(),
            all_trigger_words: all_trigger_words.to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Run summary in the debug report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionInfo {
    pub category: String,
    pub seed_used: u64,
    pub seed_source: SeedSource,
    pub loras_requested: usize,
    pub loras_selected: usize,
    pub trigger_words_requested: usize,
    pub trigger_word_limit: usize,
    pub trigger_words_enabled: bool,
    pub timestamp: DateTime<Utc>,
}

/// File check result for one LoRA. `exists` is `None` when validation is off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileCheck {
    pub path: String,
    pub exists: Option<bool>,
}

/// Per-entry detail, only emitted in debug mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugDetail {
    pub index: usize,
    pub name: String,
    pub strength: f64,
    pub trigger_words: Vec<String>,
    pub trigger_words_available: usize,
    pub file_exists: Option<bool>,
}

/// The `debug_info` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugReport {
    pub execution_info: ExecutionInfo,
    pub file_validation_enabled: bool,
    pub file_validation: BTreeMap<String, FileCheck>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<DebugDetail>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<ConfigSource>,
}

impl DebugReport {
    /// Summarize a run. `verbose` adds per-entry details and config sources.
    pub fn build(
        result: &SelectionResult,
        trigger_words_enabled: bool,
        file_validation_enabled: bool,
        validation_warnings: &[ValidationWarning],
        sources: &[ConfigSource],
        verbose: bool,
    ) -> Self {
        let file_validation = result
            .selected
            .iter()
            .map(|s| {
                (
                    s.lora_id.clone(),
                    FileCheck {
                        path: s.entry.file_path.clone(),
                        exists: s.path_valid,
                    },
                )
            })
            .collect();

        let mut warnings: Vec<String> = validation_warnings
            .iter()
            .map(|w| w.message.clone())
            .collect();
        if trigger_words_enabled {
            for short in result.short_on_trigger_words() {
                warnings.push(format!(
                    "LoRA '{}' has {} trigger word(s), {} requested",
                    short.lora_id, short.trigger_words_available, result.trigger_word_limit
                ));
            }
        }

        let details = if verbose {
            result
                .selected
                .iter()
                .enumerate()
                .map(|(index, s)| DebugDetail {
                    index,
                    name: s.lora_id.clone(),
                    strength: s.strength,
                    trigger_words: s.trigger_words.clone(),
                    trigger_words_available: s.trigger_words_available,
                    file_exists: s.path_valid,
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            execution_info: ExecutionInfo {
                category: result.category.clone(),
                seed_used: result.seed.seed,
                seed_source: result.seed.source,
                loras_requested: result.requested_count,
                loras_selected: result.len(),
                trigger_words_requested: result.requested_trigger_words,
                trigger_word_limit: result.trigger_word_limit,
                trigger_words_enabled,
                timestamp: Utc::now(),
            },
            file_validation_enabled,
            file_validation,
            warnings,
            details,
            sources: if verbose { sources.to_vec() } else { Vec::new() },
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// `selected_lora_info` payload for a failed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub error: bool,
    pub message: String,
    pub selected_count: usize,
    pub loras: Vec<LoraDetail>,
}

impl ErrorReport {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
            selected_count: 0,
            loras: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
