//! LoRA configuration store
//!
//! Layers, lowest precedence first:
//! 1. Built-in global settings
//! 2. `global_settings.json` (partial, merged by key)
//!
//! Categories come from one JSON file each under `lora_style/`. A legacy
//! `lora_config.json` is migrated to that layout on first load.

mod defaults;
mod error;
mod io;
mod layout;
mod merge;
mod migrate;
mod schema;
mod store;

pub use defaults::GlobalSettings;
pub use error::ConfigError;
pub use layout::{
    ConfigLayout, CATEGORY_DIR_NAME, GLOBAL_SETTINGS_FILE, LEGACY_BACKUP_FILE, LEGACY_CONFIG_FILE,
};
pub use merge::{deep_merge, merge_layers, resolve_settings};
pub use migrate::{category_file_stem, migrate_legacy, plan_migration, MigrationFile, MigrationOutcome};
pub use schema::{
    Category, CategoryFile, CategoryInfo, GlobalSettingsFile, LegacyCategory, LegacyConfig,
    LoraEntry,
};
pub use store::{
    init_defaults, load_config, load_legacy, ConfigOrigin, ConfigSnapshot, ConfigSource,
    ConfigStore,
};
