//! On-disk configuration schema
//!
//! Two layouts are understood:
//! - v2 (current): `global_settings.json` plus one file per category under
//!   `lora_style/`, each carrying `category_info` and `loras`.
//! - legacy: a single `lora_config.json` with a `categories` map and a
//!   `global_settings` object. Only read for migration.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use super::migrate::plan_migration;

/// A single LoRA entry within a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoraEntry {
    /// Path relative to the model root (absolute paths are used as-is)
    pub file_path: String,

    /// Per-entry strength; falls back to the global default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength_default: Option<f64>,

    /// Trigger words in declaration order
    #[serde(default)]
    pub trigger_words: Vec<String>,

    /// Free-form tags
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl LoraEntry {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            strength_default: None,
            trigger_words: Vec::new(),
            tags: BTreeSet::new(),
        }
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength_default = Some(strength);
        self
    }

    pub fn with_trigger_words(mut self, words: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.trigger_words = words.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    fn validate(&self, lora_id: &str) -> Result<(), String> {
        if lora_id.trim().is_empty() {
            return Err("LoRA id must not be empty".to_string());
        }
        if self.file_path.trim().is_empty() {
            return Err(format!("LoRA '{}': file_path must not be empty", lora_id));
        }
        if let Some(strength) = self.strength_default {
            if !strength.is_finite() {
                return Err(format!("LoRA '{}': strength_default must be finite", lora_id));
            }
        }
        Ok(())
    }
}

/// A named group of LoRA entries; the unit of selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub description: String,
    pub loras: BTreeMap<String, LoraEntry>,
}

impl Category {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            loras: BTreeMap::new(),
        }
    }

    pub fn with_lora(mut self, id: impl Into<String>, entry: LoraEntry) -> Self {
        self.loras.insert(id.into(), entry);
        self
    }

    /// LoRA ids in stable (sorted) order.
    pub fn lora_ids(&self) -> Vec<&str> {
        self.loras.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.loras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loras.is_empty()
    }
}

/// `category_info` block of a v2 category file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryInfo {
    /// Declared category name; wins over the file stem when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub description: String,
}

/// A v2 per-category file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryFile {
    #[serde(default)]
    pub category_info: CategoryInfo,

    pub loras: BTreeMap<String, LoraEntry>,
}

impl CategoryFile {
    /// Resolve the category name: declared name, else the file stem.
    pub fn category_name(&self, file_stem: &str) -> String {
        self.category_info
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(file_stem)
            .to_string()
    }

    /// Check entry-level constraints serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        for (id, entry) in &self.loras {
            entry.validate(id)?;
        }
        Ok(())
    }

    pub fn into_category(self, file_stem: &str) -> Category {
        Category {
            name: self.category_name(file_stem),
            description: self.category_info.description,
            loras: self.loras,
        }
    }
}

impl From<&Category> for CategoryFile {
    fn from(category: &Category) -> Self {
        Self {
            category_info: CategoryInfo {
                name: Some(category.name.clone()),
                description: category.description.clone(),
            },
            loras: category.loras.clone(),
        }
    }
}

/// `global_settings.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalSettingsFile {
    /// Partial settings object merged over the built-in defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_settings: Option<Value>,
}

/// A category object inside the legacy single-file config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyCategory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub loras: BTreeMap<String, LoraEntry>,
}

impl LegacyCategory {
    /// Description used once the category moves to its own file.
    pub fn description_or_default(&self, name: &str) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("{} LoRAs", name))
    }
}

/// The legacy single-file config (`lora_config.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyConfig {
    #[serde(default)]
    pub categories: BTreeMap<String, LegacyCategory>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_settings: Option<Value>,
}

impl LegacyConfig {
    pub fn validate(&self) -> Result<(), String> {
        for (name, category) in &self.categories {
            for (id, entry) in &category.loras {
                entry
                    .validate(id)
                    .map_err(|e| format!("category '{}': {}", name, e))?;
            }
        }

        // Keys that resolve to the same category name would collide once split
        let mut resolved: BTreeMap<String, &str> = BTreeMap::new();
        for (key, file) in self.categories.keys().zip(plan_migration(self)) {
            let category = file.into_category();
            if let Some(first) = resolved.insert(category.name.clone(), key) {
                return Err(format!(
                    "categories '{}' and '{}' both resolve to '{}'",
                    first, key, category.name
                ));
            }
        }
        Ok(())
    }

    /// The category map this legacy file describes: the same map loading the
    /// migrated layout produces.
    pub fn to_categories(&self) -> BTreeMap<String, Category> {
        plan_migration(self)
            .into_iter()
            .map(|file| {
                let category = file.into_category();
                (category.name.clone(), category)
            })
            .collect()
    }
}
