//! Configuration store
//!
//! Loads global settings and categories from a configuration root, running
//! the one-time legacy migration first when needed. The loaded snapshot is
//! immutable and shared; `reload()` replaces it with a fresh read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::defaults::GlobalSettings;
use super::error::ConfigError;
use super::io::{read_json, write_json_atomic};
use super::layout::ConfigLayout;
use super::merge::resolve_settings;
use super::migrate::{migrate_legacy, MigrationOutcome};
use super::schema::{
    Category, CategoryFile, CategoryInfo, GlobalSettingsFile, LegacyConfig, LoraEntry,
};

/// Origin of a configuration source
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConfigOrigin {
    Builtin,
    GlobalSettings,
    Category,
    Legacy,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for builtin)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for builtin)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl ConfigSource {
    fn builtin() -> Self {
        Self {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }
    }

    fn file(origin: ConfigOrigin, path: &Path, digest: String) -> Self {
        Self {
            origin,
            path: Some(path.to_string_lossy().to_string()),
            digest: Some(digest),
        }
    }
}

/// An immutable view of the loaded configuration.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub categories: BTreeMap<String, Category>,
    pub settings: GlobalSettings,
    /// Contributing sources in load order
    pub sources: Vec<ConfigSource>,
    /// Migration result for the load that produced this snapshot
    pub migration: Option<MigrationOutcome>,
    pub loaded_at: DateTime<Utc>,
}

impl ConfigSnapshot {
    /// Build a snapshot from in-memory values.
    pub fn from_parts(categories: BTreeMap<String, Category>, settings: GlobalSettings) -> Self {
        Self {
            categories,
            settings,
            sources: vec![ConfigSource::builtin()],
            migration: None,
            loaded_at: Utc::now(),
        }
    }

    /// Look up a category by name.
    pub fn category(&self, name: &str) -> Result<&Category, ConfigError> {
        self.categories
            .get(name)
            .ok_or_else(|| ConfigError::UnknownCategory(name.to_string()))
    }

    /// Category names in sorted order.
    pub fn category_names(&self) -> Vec<&str> {
        self.categories.keys().map(String::as_str).collect()
    }

    pub fn settings(&self) -> &GlobalSettings {
        &self.settings
    }
}

/// Load configuration from `root`, migrating a legacy config first if needed.
pub fn load_config(root: impl Into<PathBuf>) -> Result<ConfigSnapshot, ConfigError> {
    let layout = ConfigLayout::new(root);
    load_layout(&layout)
}

fn load_layout(layout: &ConfigLayout) -> Result<ConfigSnapshot, ConfigError> {
    let migration = if layout.needs_migration() {
        Some(migrate_legacy(layout)?)
    } else {
        None
    };

    let mut sources = vec![ConfigSource::builtin()];

    let settings = load_global_settings(&layout.global_settings_path(), &mut sources)?;
    let categories = load_categories(&layout.category_dir(), &mut sources)?;

    info!(
        categories = categories.len(),
        root = %layout.root().display(),
        "Loaded LoRA configuration"
    );

    Ok(ConfigSnapshot {
        categories,
        settings,
        sources,
        migration,
        loaded_at: Utc::now(),
    })
}

fn load_global_settings(
    path: &Path,
    sources: &mut Vec<ConfigSource>,
) -> Result<GlobalSettings, ConfigError> {
    if !path.is_file() {
        warn!(path = %path.display(), "Global settings file not found, using built-in defaults");
        return Ok(GlobalSettings::default());
    }

    let loaded = read_json::<GlobalSettingsFile>(path)?;
    let settings = resolve_settings(loaded.value.global_settings)
        .map_err(|e| ConfigError::malformed(path, e))?;
    sources.push(ConfigSource::file(
        ConfigOrigin::GlobalSettings,
        path,
        loaded.digest,
    ));
    Ok(settings)
}

/// Files in the category directory that contribute a category.
fn is_category_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(OsStr::to_str)
        .map_or(true, |name| name.starts_with('.'));
    let json = path
        .extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    !hidden && json
}

fn load_categories(
    dir: &Path,
    sources: &mut Vec<ConfigSource>,
) -> Result<BTreeMap<String, Category>, ConfigError> {
    let mut categories = BTreeMap::new();
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "Category directory not found");
        return Ok(categories);
    }

    let mut origins: BTreeMap<String, PathBuf> = BTreeMap::new();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
            ConfigError::io(path, source)
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_category_file(path) {
            continue;
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let loaded = read_json::<CategoryFile>(path)?;
        loaded
            .value
            .validate()
            .map_err(|reason| ConfigError::malformed(path, reason))?;

        let category = loaded.value.into_category(&stem);
        if let Some(first) = origins.get(&category.name) {
            return Err(ConfigError::DuplicateCategory {
                name: category.name,
                first: first.clone(),
                second: path.to_path_buf(),
            });
        }

        debug!(
            category = %category.name,
            loras = category.len(),
            file = %path.display(),
            "Loaded category"
        );
        origins.insert(category.name.clone(), path.to_path_buf());
        sources.push(ConfigSource::file(ConfigOrigin::Category, path, loaded.digest));
        categories.insert(category.name.clone(), category);
    }

    Ok(categories)
}

/// Read a legacy single-file config directly, without migrating it.
pub fn load_legacy(path: &Path) -> Result<ConfigSnapshot, ConfigError> {
    let loaded = read_json::<LegacyConfig>(path)?;
    loaded
        .value
        .validate()
        .map_err(|reason| ConfigError::malformed(path, reason))?;

    let settings = resolve_settings(loaded.value.global_settings.clone())
        .map_err(|e| ConfigError::malformed(path, e))?;

    Ok(ConfigSnapshot {
        categories: loaded.value.to_categories(),
        settings,
        sources: vec![
            ConfigSource::builtin(),
            ConfigSource::file(ConfigOrigin::Legacy, path, loaded.digest),
        ],
        migration: None,
        loaded_at: Utc::now(),
    })
}

/// Write default `global_settings.json` and a sample category when absent.
///
/// Existing files are never overwritten. Returns the paths written.
pub fn init_defaults(layout: &ConfigLayout) -> Result<Vec<PathBuf>, ConfigError> {
    let mut written = Vec::new();

    fs::create_dir_all(layout.root()).map_err(|e| ConfigError::io(layout.root(), e))?;

    let settings_path = layout.global_settings_path();
    if !settings_path.exists() {
        let file = GlobalSettingsFile {
            global_settings: Some(GlobalSettings::default().to_value()),
        };
        write_json_atomic(&settings_path, &file)?;
        written.push(settings_path);
    }

    // A legacy config is migrated on first load instead
    if layout.has_legacy_config() {
        return Ok(written);
    }

    let category_dir = layout.category_dir();
    fs::create_dir_all(&category_dir).map_err(|e| ConfigError::io(&category_dir, e))?;

    let sample_path = category_dir.join("character.json");
    if !sample_path.exists() {
        let sample = CategoryFile {
            category_info: CategoryInfo {
                name: Some("character".to_string()),
                description: "Character LoRAs".to_string(),
            },
            loras: BTreeMap::from([(
                "sample_character".to_string(),
                LoraEntry::new("sample_character.safetensors")
                    .with_strength(0.8)
                    .with_trigger_words(["sample character", "anime girl"])
                    .with_tags(["character", "sample"]),
            )]),
        };
        write_json_atomic(&sample_path, &sample)?;
        written.push(sample_path);
    }

    for path in &written {
        info!(path = %path.display(), "Wrote default config file");
    }

    Ok(written)
}

/// Process-scoped configuration cache.
///
/// The first call to [`ConfigStore::snapshot`] loads from disk; later calls
/// reuse the snapshot until [`ConfigStore::reload`] or
/// [`ConfigStore::invalidate`] is called.
#[derive(Debug)]
pub struct ConfigStore {
    layout: ConfigLayout,
    snapshot: Option<Arc<ConfigSnapshot>>,
}

impl ConfigStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            layout: ConfigLayout::new(root),
            snapshot: None,
        }
    }

    /// A store pre-seeded with an in-memory snapshot.
    pub fn with_snapshot(root: impl Into<PathBuf>, snapshot: ConfigSnapshot) -> Self {
        Self {
            layout: ConfigLayout::new(root),
            snapshot: Some(Arc::new(snapshot)),
        }
    }

    pub fn layout(&self) -> &ConfigLayout {
        &self.layout
    }

    /// The cached snapshot, loading it on first use.
    pub fn snapshot(&mut self) -> Result<Arc<ConfigSnapshot>, ConfigError> {
        match &self.snapshot {
            Some(snapshot) => Ok(Arc::clone(snapshot)),
            None => self.reload(),
        }
    }

    /// The cached snapshot, if any, without touching the disk.
    pub fn cached(&self) -> Option<Arc<ConfigSnapshot>> {
        self.snapshot.clone()
    }

    /// Force a fresh read from disk.
    ///
    /// On failure the previous snapshot is dropped, so a broken file is
    /// never masked by stale data.
    pub fn reload(&mut self) -> Result<Arc<ConfigSnapshot>, ConfigError> {
        self.snapshot = None;
        let snapshot = Arc::new(load_layout(&self.layout)?);
        self.snapshot = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Drop the cached snapshot; the next access reloads.
    pub fn invalidate(&mut self) {
        self.snapshot = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot.is_some()
    }
}
