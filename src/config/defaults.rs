//! Built-in global settings
//!
//! Hardcoded defaults for every global setting. A `global_settings.json`
//! file only needs to carry the keys it changes.

use serde::{Deserialize, Serialize};

/// Process-wide selection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSettings {
    /// Maximum number of trigger words in a composed prompt (default: 3)
    pub max_trigger_words: u32,

    /// Strength for entries that carry no `strength_default` (default: 0.7)
    pub default_strength: f64,

    /// Seed used when the caller asks for a random seed (default: none)
    pub random_seed: Option<i64>,

    /// Include per-entry details and config provenance in debug output (default: false)
    pub debug_mode: bool,

    /// Check LoRA files on disk after selection (default: true)
    pub file_validation: bool,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            max_trigger_words: 3,
            default_strength: 0.7,
            random_seed: None,
            debug_mode: false,
            file_validation: true,
        }
    }
}

impl GlobalSettings {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "max_trigger_words": self.max_trigger_words,
            "default_strength": self.default_strength,
            "random_seed": self.random_seed,
            "debug_mode": self.debug_mode,
            "file_validation": self.file_validation,
        })
    }

    /// The configured fallback seed, ignoring negative values.
    pub fn fallback_seed(&self) -> Option<u64> {
        self.random_seed.and_then(|s| u64::try_from(s).ok())
    }
}
