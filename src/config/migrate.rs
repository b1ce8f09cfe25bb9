//! Legacy single-file to multi-file migration
//!
//! Migration is split in two:
//! - [`plan_migration`] is a pure transform from the legacy categories to the
//!   files the multi-file layout needs.
//! - [`migrate_legacy`] performs the I/O. New files are written into a staging
//!   directory, the staging directory is renamed into place (this is the
//!   "migrated" marker), and only then is the legacy file archived. A crash at
//!   any point leaves either the legacy file or the full new layout readable.

use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use regex_lite::Regex;
use tracing::{debug, info, warn};

use super::error::ConfigError;
use super::io::{read_json, write_json_atomic};
use super::layout::ConfigLayout;
use super::merge::{deep_merge, resolve_settings};
use super::schema::{Category, CategoryFile, CategoryInfo, GlobalSettingsFile, LegacyConfig};

/// One file of the multi-file layout produced from the legacy config.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationFile {
    /// File name inside the category directory (`<name>.json`)
    pub file_name: String,
    pub content: CategoryFile,
}

impl MigrationFile {
    pub fn file_stem(&self) -> &str {
        self.file_name
            .strip_suffix(".json")
            .unwrap_or(&self.file_name)
    }

    /// The category this file yields once loaded from the category directory.
    pub fn into_category(self) -> Category {
        let stem = self.file_stem().to_string();
        self.content.into_category(&stem)
    }
}

/// What a call to [`migrate_legacy`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MigrationOutcome {
    /// The multi-file layout already exists; nothing was touched.
    AlreadyMigrated,
    /// No legacy file to migrate.
    NoLegacyConfig,
    /// The legacy file was split into per-category files.
    Migrated {
        categories: usize,
        backup_path: PathBuf,
    },
}

fn unsafe_file_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"[/\\:*?"<>|]"#).expect("valid file name pattern"))
}

/// File stem for a category name. The declared name inside the file keeps
/// the original spelling, so lossy replacement here is harmless.
pub fn category_file_stem(name: &str) -> String {
    let replaced = unsafe_file_chars().replace_all(name, "_");
    let cleaned: String = replaced
        .chars()
        .map(|c| if c.is_control() { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned.starts_with('.') {
        format!("category_{}", cleaned.trim_start_matches('.'))
    } else {
        cleaned.to_string()
    }
}

/// Pure transform: legacy categories to multi-file layout files.
///
/// File names are unique; colliding stems get a numeric suffix.
pub fn plan_migration(legacy: &LegacyConfig) -> Vec<MigrationFile> {
    let mut used = HashSet::new();
    let mut files = Vec::with_capacity(legacy.categories.len());

    for (name, category) in &legacy.categories {
        let stem = category_file_stem(name);
        let mut file_name = format!("{}.json", stem);
        let mut suffix = 2;
        while !used.insert(file_name.to_lowercase()) {
            file_name = format!("{}-{}.json", stem, suffix);
            suffix += 1;
        }

        files.push(MigrationFile {
            file_name,
            content: CategoryFile {
                category_info: CategoryInfo {
                    name: Some(name.clone()),
                    description: category.description_or_default(name),
                },
                loras: category.loras.clone(),
            },
        });
    }

    files
}

/// Migrate the legacy config under `layout` if, and only if, the multi-file
/// layout does not exist yet.
pub fn migrate_legacy(layout: &ConfigLayout) -> Result<MigrationOutcome, ConfigError> {
    if layout.has_category_dir() {
        debug!(dir = %layout.category_dir().display(), "Category directory present, skipping migration");
        return Ok(MigrationOutcome::AlreadyMigrated);
    }
    if !layout.has_legacy_config() {
        return Ok(MigrationOutcome::NoLegacyConfig);
    }

    let legacy_path = layout.legacy_path();
    info!(path = %legacy_path.display(), "Migrating legacy LoRA config to per-category files");

    let legacy: LegacyConfig = read_json(&legacy_path)?.value;
    legacy
        .validate()
        .map_err(|reason| ConfigError::malformed(&legacy_path, reason))?;

    // Settings are checked before anything is written
    let settings_file = merged_settings_file(layout, &legacy)?;
    resolve_settings(settings_file.global_settings.clone())
        .map_err(|e| ConfigError::malformed(&legacy_path, e))?;

    let files = plan_migration(&legacy);

    // Stage every category file first
    let staging = layout.staging_dir();
    if staging.exists() {
        warn!(dir = %staging.display(), "Removing stale migration staging directory");
        fs::remove_dir_all(&staging).map_err(|e| ConfigError::io(&staging, e))?;
    }
    fs::create_dir_all(&staging).map_err(|e| ConfigError::io(&staging, e))?;

    for file in &files {
        write_json_atomic(&staging.join(&file.file_name), &file.content)?;
        debug!(file = %file.file_name, "Staged category file");
    }

    write_json_atomic(&layout.global_settings_path(), &settings_file)?;

    // Mark complete: the category directory appears in one rename
    let category_dir = layout.category_dir();
    fs::rename(&staging, &category_dir).map_err(|e| {
        ConfigError::Migration(format!(
            "could not move {} to {}: {}",
            staging.display(),
            category_dir.display(),
            e
        ))
    })?;

    let backup_path = next_backup_path(layout);
    fs::rename(&legacy_path, &backup_path).map_err(|e| {
        ConfigError::Migration(format!(
            "migrated, but could not archive {} to {}: {}",
            legacy_path.display(),
            backup_path.display(),
            e
        ))
    })?;

    info!(
        categories = files.len(),
        backup = %backup_path.display(),
        "Legacy config migrated"
    );

    Ok(MigrationOutcome::Migrated {
        categories: files.len(),
        backup_path,
    })
}

/// Settings file to write: legacy settings merged over an existing
/// `global_settings.json`, so values written by `init` survive unless the
/// legacy file sets them.
fn merged_settings_file(
    layout: &ConfigLayout,
    legacy: &LegacyConfig,
) -> Result<GlobalSettingsFile, ConfigError> {
    let legacy_settings = legacy
        .global_settings
        .clone()
        .unwrap_or_else(|| serde_json::json!({}));

    let path = layout.global_settings_path();
    if !path.is_file() {
        return Ok(GlobalSettingsFile {
            global_settings: Some(legacy_settings),
        });
    }

    let existing: GlobalSettingsFile = read_json(&path)?.value;
    info!(
        path = %path.display(),
        "Merging legacy settings into existing global settings file"
    );
    let base = existing
        .global_settings
        .unwrap_or_else(|| serde_json::json!({}));
    Ok(GlobalSettingsFile {
        global_settings: Some(deep_merge(base, legacy_settings)),
    })
}

/// Backup path that never clobbers an earlier backup.
fn next_backup_path(layout: &ConfigLayout) -> PathBuf {
    let default = layout.backup_path();
    if !default.exists() {
        return default;
    }
    let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
    layout
        .root()
        .join(format!("lora_config_backup.{}.json", stamp))
}
