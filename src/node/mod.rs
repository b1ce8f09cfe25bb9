//! Host graph-node adapter
//!
//! Translates the host's named parameters into calls on the selection
//! engine, validator and composer, and renders their results as the six
//! named node outputs. The node never fails: errors come back as an error
//! response so the host graph keeps running.

use lora_prompt::{join_words, PromptPosition, DEFAULT_SEPARATOR};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{error, info};

use crate::config::{ConfigError, ConfigStore, GlobalSettings};
use crate::prompt::compose_at;
use crate::report::{DebugReport, ErrorReport, LoraInfoReport};
use crate::selection::{
    SelectionEngine, SelectionRequest, StrengthOverride, MAX_DRAWN_SEED, RANDOM_SEED,
    USE_DEFAULT_STRENGTH,
};
use crate::validation::PathValidator;

/// Node class name registered with the host.
pub const NODE_NAME: &str = "LoRARandomSelector";

/// Human-readable node name.
pub const NODE_DISPLAY_NAME: &str = "LoRA Random Selector";

/// Host menu category.
pub const NODE_CATEGORY: &str = "LoRA";

/// Output names, in output order.
pub const RETURN_NAMES: [&str; 6] = [
    "selected_lora_info",
    "lora_path",
    "lora_strength",
    "trigger_words",
    "combined_prompt",
    "debug_info",
];

/// Named inputs as the host passes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInputs {
    pub category: String,
    #[serde(default = "default_num_loras")]
    pub num_loras: i64,
    #[serde(default = "default_trigger_word_count")]
    pub trigger_word_count: i64,
    #[serde(default = "default_seed")]
    pub seed: i64,
    #[serde(default = "default_true")]
    pub enable_trigger_words: bool,
    #[serde(default = "default_strength_override")]
    pub strength_override: f64,
    #[serde(default)]
    pub base_prompt: String,
}

fn default_num_loras() -> i64 {
    1
}

fn default_trigger_word_count() -> i64 {
    1
}

fn default_seed() -> i64 {
    RANDOM_SEED
}

fn default_true() -> bool {
    true
}

fn default_strength_override() -> f64 {
    USE_DEFAULT_STRENGTH
}

impl NodeInputs {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            num_loras: default_num_loras(),
            trigger_word_count: default_trigger_word_count(),
            seed: default_seed(),
            enable_trigger_words: true,
            strength_override: default_strength_override(),
            base_prompt: String::new(),
        }
    }

    /// Selection parameters; trigger words are requested only when enabled.
    pub fn to_request(&self) -> SelectionRequest {
        let trigger_words = if self.enable_trigger_words {
            clamp_non_negative(self.trigger_word_count)
        } else {
            0
        };
        SelectionRequest::new(clamp_non_negative(self.num_loras))
            .with_trigger_words(trigger_words)
            .with_seed(self.seed)
            .with_strength(StrengthOverride::from_host(self.strength_override))
    }
}

fn clamp_non_negative(value: i64) -> usize {
    usize::try_from(value.max(0)).unwrap_or(usize::MAX)
}

/// The six named outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeOutputs {
    pub selected_lora_info: String,
    pub lora_path: String,
    pub lora_strength: f64,
    pub trigger_words: String,
    pub combined_prompt: String,
    pub debug_info: String,
}

impl NodeOutputs {
    /// Outputs for a failed run.
    pub fn error(message: &str, default_strength: f64) -> Self {
        let info = ErrorReport::new(message)
            .to_json()
            .unwrap_or_else(|_| message.to_string());
        Self {
            selected_lora_info: info,
            lora_path: String::new(),
            lora_strength: default_strength,
            trigger_words: String::new(),
            combined_prompt: message.to_string(),
            debug_info: message.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        serde_json::from_str::<ErrorReport>(&self.selected_lora_info)
            .map(|r| r.error)
            .unwrap_or(false)
    }
}

/// Errors surfaced by [`LoraRandomSelectorNode::try_execute`].
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Widget description of one input parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum ParamSpec {
    Choice {
        choices: Vec<String>,
        default: String,
    },
    Int {
        default: i64,
        min: i64,
        max: i64,
        step: i64,
    },
    Float {
        default: f64,
        min: f64,
        max: f64,
        step: f64,
    },
    Boolean {
        default: bool,
    },
    #[serde(rename = "STRING")]
    Text {
        default: String,
        multiline: bool,
    },
}

/// Input schema the host renders as widgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSchema {
    pub name: String,
    pub display_name: String,
    pub category: String,
    pub required: Vec<(String, ParamSpec)>,
    pub optional: Vec<(String, ParamSpec)>,
    pub return_names: Vec<String>,
}

impl NodeSchema {
    /// Schema for the given category choices; falls back to `["default"]`.
    pub fn for_categories(mut categories: Vec<String>) -> Self {
        if categories.is_empty() {
            categories.push("default".to_string());
        }
        let default_category = categories[0].clone();

        let required = vec![
            (
                "category".to_string(),
                ParamSpec::Choice {
                    choices: categories,
                    default: default_category,
                },
            ),
            (
                "num_loras".to_string(),
                ParamSpec::Int {
                    default: 1,
                    min: 1,
                    max: 5,
                    step: 1,
                },
            ),
            (
                "trigger_word_count".to_string(),
                ParamSpec::Int {
                    default: 1,
                    min: 0,
                    max: 5,
                    step: 1,
                },
            ),
            (
                "seed".to_string(),
                ParamSpec::Int {
                    default: RANDOM_SEED,
                    min: RANDOM_SEED,
                    max: MAX_DRAWN_SEED as i64,
                    step: 1,
                },
            ),
            (
                "enable_trigger_words".to_string(),
                ParamSpec::Boolean { default: true },
            ),
        ];

        let optional = vec![
            (
                "strength_override".to_string(),
                ParamSpec::Float {
                    default: USE_DEFAULT_STRENGTH,
                    min: USE_DEFAULT_STRENGTH,
                    max: 2.0,
                    step: 0.1,
                },
            ),
            (
                "base_prompt".to_string(),
                ParamSpec::Text {
                    default: String::new(),
                    multiline: true,
                },
            ),
        ];

        Self {
            name: NODE_NAME.to_string(),
            display_name: NODE_DISPLAY_NAME.to_string(),
            category: NODE_CATEGORY.to_string(),
            required,
            optional,
            return_names: RETURN_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// The node itself: a config store plus validator and prompt settings.
#[derive(Debug)]
pub struct LoraRandomSelectorNode {
    store: ConfigStore,
    validator: PathValidator,
    position: PromptPosition,
    reload_each_run: bool,
}

impl LoraRandomSelectorNode {
    pub fn new(config_root: impl Into<PathBuf>) -> Self {
        Self::with_store(ConfigStore::new(config_root))
    }

    pub fn with_store(store: ConfigStore) -> Self {
        Self {
            store,
            validator: PathValidator::default(),
            position: PromptPosition::End,
            reload_each_run: false,
        }
    }

    pub fn with_model_root(mut self, model_root: impl Into<PathBuf>) -> Self {
        self.validator = PathValidator::new(model_root);
        self
    }

    pub fn with_position(mut self, position: PromptPosition) -> Self {
        self.position = position;
        self
    }

    /// Re-read configuration files before every run.
    pub fn with_reload_each_run(mut self, reload: bool) -> Self {
        self.reload_each_run = reload;
        self
    }

    pub fn store_mut(&mut self) -> &mut ConfigStore {
        &mut self.store
    }

    /// Force the next run to read configuration from disk.
    pub fn reload(&mut self) -> Result<(), ConfigError> {
        self.store.reload().map(|_| ())
    }

    /// Input schema with the currently loaded categories as choices.
    pub fn input_schema(&mut self) -> NodeSchema {
        let categories = self
            .store
            .snapshot()
            .map(|s| s.category_names().into_iter().map(String::from).collect())
            .unwrap_or_default();
        NodeSchema::for_categories(categories)
    }

    /// Run the node, turning any failure into an error response.
    pub fn execute(&mut self, inputs: &NodeInputs) -> NodeOutputs {
        match self.try_execute(inputs) {
            Ok(outputs) => outputs,
            Err(e) => {
                let message = format!("LoRA selection failed: {}", e);
                error!(category = %inputs.category, "{}", message);
                // No second load attempt; a failed load leaves nothing cached
                let default_strength = self
                    .store
                    .cached()
                    .map(|s| s.settings.default_strength)
                    .unwrap_or_else(|| GlobalSettings::default().default_strength);
                NodeOutputs::error(&message, default_strength)
            }
        }
    }

    /// Run the node, surfacing failures to the caller.
    pub fn try_execute(&mut self, inputs: &NodeInputs) -> Result<NodeOutputs, NodeError> {
        let snapshot = if self.reload_each_run {
            self.store.reload()?
        } else {
            self.store.snapshot()?
        };
        let settings = &snapshot.settings;

        let engine = SelectionEngine::new(&snapshot);
        let mut result = engine.select(&inputs.category, &inputs.to_request())?;

        let warnings = self.validator.annotate(&mut result, settings.file_validation);

        let words = result.all_trigger_words();
        let trigger_words = join_words(&words, DEFAULT_SEPARATOR);
        let combined_prompt = compose_at(&inputs.base_prompt, &result, self.position);

        let info = LoraInfoReport::from_selection(&result, &trigger_words);
        let debug = DebugReport::build(
            &result,
            inputs.enable_trigger_words,
            settings.file_validation,
            &warnings,
            &snapshot.sources,
            settings.debug_mode,
        );

        let (lora_path, lora_strength) = result
            .first()
            .map(|s| (s.entry.file_path.clone(), s.strength))
            .unwrap_or_else(|| (String::new(), settings.default_strength));

        info!(
            category = %inputs.category,
            selected = result.len(),
            trigger_words = words.len(),
            "LoRA selection complete"
        );

        Ok(NodeOutputs {
            selected_lora_info: info.to_json()?,
            lora_path,
            lora_strength,
            trigger_words,
            combined_prompt,
            debug_info: debug.to_json()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Category, ConfigSnapshot, LoraEntry};
    use std::collections::BTreeMap;

    fn node(settings: GlobalSettings) -> LoraRandomSelectorNode {
        let category = Category::new("style", "Styles")
            .with_lora(
                "ink",
                LoraEntry::new("ink.safetensors")
                    .with_strength(0.8)
                    .with_trigger_words(["ink wash", "monochrome"]),
            )
            .with_lora(
                "neon",
                LoraEntry::new("neon.safetensors").with_trigger_words(["neon", "cyberpunk"]),
            );
        let snapshot = ConfigSnapshot::from_parts(
            BTreeMap::from([("style".to_string(), category)]),
            settings,
        );
        LoraRandomSelectorNode::with_store(ConfigStore::with_snapshot("/unused", snapshot))
            .with_model_root("/nonexistent/loras")
    }

    #[test]
    fn test_inputs_to_request() {
        let mut inputs = NodeInputs::new("style");
        inputs.num_loras = -3;
        inputs.trigger_word_count = 4;
        inputs.strength_override = 0.5;

        let request = inputs.to_request();
        assert_eq!(request.count, 0);
        assert_eq!(request.trigger_word_count, 4);
        assert_eq!(request.strength_override, StrengthOverride::Fixed(0.5));

        inputs.enable_trigger_words = false;
        assert_eq!(inputs.to_request().trigger_word_count, 0);
    }

    #[test]
    fn test_inputs_deserialize_defaults() {
        let inputs: NodeInputs = serde_json::from_str(r#"{"category": "style"}"#).unwrap();
        assert_eq!(inputs, NodeInputs::new("style"));
    }

    #[test]
    fn test_execute_outputs() {
        let mut node = node(GlobalSettings::default());
        let mut inputs = NodeInputs::new("style");
        inputs.num_loras = 2;
        inputs.trigger_word_count = 1;
        inputs.seed = 11;
        inputs.base_prompt = "a city".to_string();

        let outputs = node.execute(&inputs);
        assert!(!outputs.is_error());
        assert!(outputs.lora_path.ends_with(".safetensors"));
        assert!(outputs.combined_prompt.starts_with("a city, "));
        assert_eq!(outputs.trigger_words.split(", ").count(), 2);

        let info: serde_json::Value = serde_json::from_str(&outputs.selected_lora_info).unwrap();
        assert_eq!(info["selected_count"], 2);

        let debug: serde_json::Value = serde_json::from_str(&outputs.debug_info).unwrap();
        assert_eq!(debug["execution_info"]["seed_used"], 11);
        assert_eq!(debug["file_validation"]["ink"]["exists"], false);
    }

    #[test]
    fn test_execute_trigger_words_disabled() {
        let mut node = node(GlobalSettings::default());
        let mut inputs = NodeInputs::new("style");
        inputs.seed = 1;
        inputs.enable_trigger_words = false;
        inputs.base_prompt = "a city".to_string();

        let outputs = node.execute(&inputs);
        assert_eq!(outputs.trigger_words, "");
        assert_eq!(outputs.combined_prompt, "a city");
    }

    #[test]
    fn test_execute_file_validation_off() {
        let settings = GlobalSettings {
            file_validation: false,
            debug_mode: true,
            ..Default::default()
        };
        let mut node = node(settings);
        let mut inputs = NodeInputs::new("style");
        inputs.seed = 3;

        let outputs = node.execute(&inputs);
        let debug: serde_json::Value = serde_json::from_str(&outputs.debug_info).unwrap();
        assert_eq!(debug["file_validation_enabled"], false);
        let checks = debug["file_validation"].as_object().unwrap();
        assert!(checks.values().all(|c| c["exists"].is_null()));
        assert_eq!(debug["details"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_execute_unknown_category_returns_error_response() {
        let mut node = node(GlobalSettings::default());
        let outputs = node.execute(&NodeInputs::new("missing"));

        assert!(outputs.is_error());
        assert_eq!(outputs.lora_path, "");
        assert_eq!(outputs.lora_strength, 0.7);
        assert!(outputs.combined_prompt.contains("Unknown category"));
        assert_eq!(outputs.debug_info, outputs.combined_prompt);
    }

    #[test]
    fn test_try_execute_unknown_category() {
        let mut node = node(GlobalSettings::default());
        let err = node.try_execute(&NodeInputs::new("missing")).unwrap_err();
        assert!(matches!(err, NodeError::Config(ConfigError::UnknownCategory(_))));
    }

    #[test]
    fn test_strength_override_reaches_outputs() {
        let mut node = node(GlobalSettings::default());
        let mut inputs = NodeInputs::new("style");
        inputs.seed = 5;
        inputs.strength_override = 1.25;

        let outputs = node.execute(&inputs);
        assert_eq!(outputs.lora_strength, 1.25);
    }

    #[test]
    fn test_schema() {
        let mut node = node(GlobalSettings::default());
        let schema = node.input_schema();
        assert_eq!(schema.name, NODE_NAME);
        match &schema.required[0].1 {
            ParamSpec::Choice { choices, default } => {
                assert_eq!(choices, &vec!["style".to_string()]);
                assert_eq!(default, "style");
            }
            other => panic!("unexpected param: {:?}", other),
        }
        assert_eq!(schema.return_names.len(), 6);

        let empty = NodeSchema::for_categories(Vec::new());
        let json = serde_json::to_value(&empty).unwrap();
        assert_eq!(json["required"][0][1]["choices"], serde_json::json!(["default"]));
        assert_eq!(json["required"][1][1]["type"], "INT");
    }
}
