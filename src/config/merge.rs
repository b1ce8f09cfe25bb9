//! Settings merge logic
//!
//! A file layer is merged over the built-in defaults with:
//! - Objects: deep-merge by key
//! - Arrays: REPLACE (last wins)
//! - Scalars: override (last wins)

use serde_json::Value;

use super::defaults::GlobalSettings;

/// Deep merge two JSON values.
///
/// Merge semantics:
/// - Objects: deep-merge by key (recursive)
/// - Arrays: REPLACE (second wins entirely)
/// - Scalars: override (second wins)
/// - Null: override (null can override any value)
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = if let Some(base_value) = base_map.remove(&key) {
                    deep_merge(base_value, overlay_value)
                } else {
                    overlay_value
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }

        (Value::Array(_), overlay @ Value::Array(_)) => overlay,

        (_, overlay) => overlay,
    }
}

/// Merge multiple layers in order (first is base, last has highest precedence)
pub fn merge_layers(layers: Vec<Value>) -> Value {
    layers.into_iter().fold(Value::Null, deep_merge)
}

/// Resolve global settings from an optional file-provided `global_settings` object.
pub fn resolve_settings(file_layer: Option<Value>) -> Result<GlobalSettings, serde_json::Error> {
    let mut layers = vec![GlobalSettings::default().to_value()];
    layers.extend(file_layer);
    serde_json::from_value(merge_layers(layers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_override() {
        let result = deep_merge(json!({"max_trigger_words": 3}), json!({"max_trigger_words": 5}));
        assert_eq!(result["max_trigger_words"], 5);
    }

    #[test]
    fn test_object_deep_merge() {
        let base = json!({"a": {"x": 1, "y": 2}});
        let overlay = json!({"a": {"y": 3}});
        let result = deep_merge(base, overlay);

        assert_eq!(result["a"]["x"], 1);
        assert_eq!(result["a"]["y"], 3);
    }

    #[test]
    fn test_array_replace() {
        let result = deep_merge(json!({"words": ["a", "b", "c"]}), json!({"words": ["x"]}));
        assert_eq!(result["words"], json!(["x"]));
    }

    #[test]
    fn test_null_override() {
        let result = deep_merge(json!({"random_seed": 7}), json!({"random_seed": null}));
        assert!(result["random_seed"].is_null());
    }

    #[test]
    fn test_resolve_settings_partial_file() {
        let settings = resolve_settings(Some(json!({
            "max_trigger_words": 5,
            "debug_mode": true
        })))
        .unwrap();

        assert_eq!(settings.max_trigger_words, 5);
        assert!(settings.debug_mode);
        assert_eq!(settings.default_strength, 0.7);
        assert!(settings.file_validation);
        assert_eq!(settings.random_seed, None);
    }

    #[test]
    fn test_resolve_settings_no_file() {
        let settings = resolve_settings(None).unwrap();
        assert_eq!(settings, GlobalSettings::default());
    }

    #[test]
    fn test_resolve_settings_ignores_unknown_keys() {
        let settings = resolve_settings(Some(json!({"theme": "dark"}))).unwrap();
        assert_eq!(settings, GlobalSettings::default());
    }

    #[test]
    fn test_resolve_settings_wrong_type() {
        let result = resolve_settings(Some(json!({"max_trigger_words": "three"})));
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_layers() {
        let result = merge_layers(vec![
            json!({"default_strength": 0.7, "debug_mode": false}),
            json!({"default_strength": 0.9}),
            json!({"debug_mode": true}),
        ]);

        assert_eq!(result["default_strength"], 0.9);
        assert_eq!(result["debug_mode"], true);
    }
}
