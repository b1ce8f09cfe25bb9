//! Integration tests: the host node against an on-disk config tree

use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use lora_random_selector::config::{init_defaults, ConfigLayout, CATEGORY_DIR_NAME, GLOBAL_SETTINGS_FILE};
use lora_random_selector::node::{LoraRandomSelectorNode, NodeInputs, NodeSchema, ParamSpec};
use lora_random_selector::PromptPosition;

struct Fixture {
    _temp: TempDir,
    config_dir: std::path::PathBuf,
    model_root: std::path::PathBuf,
}

fn write_json(path: &Path, value: Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
}

fn fixture(settings: Value) -> Fixture {
    let temp = TempDir::new().unwrap();
    let config_dir = temp.path().join("config");
    let model_root = temp.path().join("models");

    write_json(
        &config_dir.join(GLOBAL_SETTINGS_FILE),
        json!({ "global_settings": settings }),
    );
    write_json(
        &config_dir.join(CATEGORY_DIR_NAME).join("character.json"),
        json!({
            "category_info": {"name": "character", "description": "Characters"},
            "loras": {
                "anime_girl": {
                    "file_path": "characters/anime_girl.safetensors",
                    "strength_default": 0.8,
                    "trigger_words": ["anime girl", "kawaii"],
                    "tags": ["anime"]
                }
            }
        }),
    );

    fs::create_dir_all(model_root.join("characters")).unwrap();
    fs::write(model_root.join("characters/anime_girl.safetensors"), b"weights").unwrap();

    Fixture {
        _temp: temp,
        config_dir,
        model_root,
    }
}

fn node(fixture: &Fixture) -> LoraRandomSelectorNode {
    LoraRandomSelectorNode::new(&fixture.config_dir).with_model_root(&fixture.model_root)
}

#[test]
fn test_single_lora_two_words() {
    let fixture = fixture(json!({}));
    let mut node = node(&fixture);

    let mut inputs = NodeInputs::new("character");
    inputs.trigger_word_count = 2;
    inputs.seed = 42;
    inputs.base_prompt = "a cat".to_string();

    let outputs = node.execute(&inputs);
    assert!(!outputs.is_error());
    assert_eq!(outputs.lora_path, "characters/anime_girl.safetensors");
    assert_eq!(outputs.lora_strength, 0.8);

    let mut words: Vec<&str> = outputs.trigger_words.split(", ").collect();
    words.sort();
    assert_eq!(words, vec!["anime girl", "kawaii"]);
    assert!(outputs.combined_prompt.starts_with("a cat, "));
    assert_eq!(
        outputs.combined_prompt,
        format!("a cat, {}", outputs.trigger_words)
    );

    let debug: Value = serde_json::from_str(&outputs.debug_info).unwrap();
    assert_eq!(debug["file_validation"]["anime_girl"]["exists"], true);
    assert_eq!(debug["execution_info"]["seed_used"], 42);
}

#[test]
fn test_global_cap_from_settings_file() {
    let fixture = fixture(json!({"max_trigger_words": 1}));
    let mut node = node(&fixture);

    let mut inputs = NodeInputs::new("character");
    inputs.trigger_word_count = 5;
    inputs.seed = 7;

    let outputs = node.execute(&inputs);
    assert_eq!(outputs.trigger_words.split(", ").count(), 1);
}

#[test]
fn test_random_seed_from_settings() {
    let fixture = fixture(json!({"random_seed": 1234}));
    let mut node = node(&fixture);

    let outputs = node.execute(&NodeInputs::new("character"));
    let debug: Value = serde_json::from_str(&outputs.debug_info).unwrap();
    assert_eq!(debug["execution_info"]["seed_used"], 1234);
    assert_eq!(debug["execution_info"]["seed_source"], "settings");
}

#[test]
fn test_missing_file_is_warning_only() {
    let fixture = fixture(json!({}));
    fs::remove_file(fixture.model_root.join("characters/anime_girl.safetensors")).unwrap();
    let mut node = node(&fixture);

    let mut inputs = NodeInputs::new("character");
    inputs.seed = 1;
    let outputs = node.execute(&inputs);

    assert!(!outputs.is_error());
    assert_eq!(outputs.lora_path, "characters/anime_girl.safetensors");
    let debug: Value = serde_json::from_str(&outputs.debug_info).unwrap();
    assert_eq!(debug["file_validation"]["anime_girl"]["exists"], false);
    assert!(!debug["warnings"].as_array().unwrap().is_empty());
}

#[test]
fn test_unknown_category_error_response() {
    let fixture = fixture(json!({"default_strength": 0.4}));
    let mut node = node(&fixture);

    let outputs = node.execute(&NodeInputs::new("scenery"));
    assert!(outputs.is_error());
    assert_eq!(outputs.lora_path, "");
    assert_eq!(outputs.lora_strength, 0.4);
    assert_eq!(outputs.trigger_words, "");

    let info: Value = serde_json::from_str(&outputs.selected_lora_info).unwrap();
    assert_eq!(info["error"], true);
    assert_eq!(info["selected_count"], 0);
}

#[test]
fn test_malformed_category_error_response() {
    let fixture = fixture(json!({}));
    fs::write(
        fixture.config_dir.join(CATEGORY_DIR_NAME).join("broken.json"),
        "{ \"loras\": ",
    )
    .unwrap();
    let mut node = node(&fixture);

    let outputs = node.execute(&NodeInputs::new("character"));
    assert!(outputs.is_error());
    assert!(outputs.combined_prompt.contains("broken.json"));
}

#[test]
fn test_failed_reload_falls_back_to_builtin_strength() {
    let fixture = fixture(json!({"default_strength": 0.4}));
    let mut node = node(&fixture).with_reload_each_run(true);
    assert!(!node.execute(&NodeInputs::new("character")).is_error());

    fs::write(
        fixture.config_dir.join(CATEGORY_DIR_NAME).join("broken.json"),
        "[",
    )
    .unwrap();

    let outputs = node.execute(&NodeInputs::new("character"));
    assert!(outputs.is_error());
    assert_eq!(outputs.lora_strength, 0.7);
    assert!(!node.store_mut().is_loaded());
}

#[test]
fn test_reload_each_run_sees_new_category() {
    let fixture = fixture(json!({}));
    let mut node = node(&fixture).with_reload_each_run(true);
    assert!(!node.execute(&NodeInputs::new("character")).is_error());

    write_json(
        &fixture.config_dir.join(CATEGORY_DIR_NAME).join("scenery.json"),
        json!({
            "category_info": {"name": "scenery", "description": "Backgrounds"},
            "loras": {"forest": {"file_path": "forest.safetensors"}}
        }),
    );

    let outputs = node.execute(&NodeInputs::new("scenery"));
    assert!(!outputs.is_error());
    assert_eq!(outputs.lora_path, "forest.safetensors");
    assert_eq!(outputs.lora_strength, 0.7);
}

#[test]
fn test_beginning_position() {
    let fixture = fixture(json!({}));
    let mut node = node(&fixture).with_position(PromptPosition::Beginning);

    let mut inputs = NodeInputs::new("character");
    inputs.trigger_word_count = 1;
    inputs.seed = 3;
    inputs.base_prompt = "a cat".to_string();

    let outputs = node.execute(&inputs);
    assert_eq!(
        outputs.combined_prompt,
        format!("{}, a cat", outputs.trigger_words)
    );
}

#[test]
fn test_init_defaults_then_execute() {
    let temp = TempDir::new().unwrap();
    let layout = ConfigLayout::new(temp.path());
    let written = init_defaults(&layout).unwrap();
    assert_eq!(written.len(), 2);
    assert!(init_defaults(&layout).unwrap().is_empty());

    let mut node = LoraRandomSelectorNode::new(temp.path()).with_model_root(temp.path());
    let schema = node.input_schema();
    match &schema.required[0].1 {
        ParamSpec::Choice { choices, .. } => assert_eq!(choices, &vec!["character".to_string()]),
        other => panic!("unexpected param: {:?}", other),
    }

    let mut inputs = NodeInputs::new("character");
    inputs.seed = 9;
    let outputs = node.execute(&inputs);
    assert!(!outputs.is_error());
    assert_eq!(outputs.lora_strength, 0.8);
}

#[test]
fn test_schema_without_config() {
    let temp = TempDir::new().unwrap();
    let mut node = LoraRandomSelectorNode::new(temp.path());
    let schema = node.input_schema();
    assert_eq!(schema, NodeSchema::for_categories(Vec::new()));
}
