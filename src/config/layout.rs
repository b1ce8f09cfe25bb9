//! On-disk layout of a configuration root

use std::path::{Path, PathBuf};

/// Directory holding one JSON file per category.
pub const CATEGORY_DIR_NAME: &str = "lora_style";

/// Global settings file name.
pub const GLOBAL_SETTINGS_FILE: &str = "global_settings.json";

/// Legacy single-file config name.
pub const LEGACY_CONFIG_FILE: &str = "lora_config.json";

/// Where the legacy file is archived after migration.
pub const LEGACY_BACKUP_FILE: &str = "lora_config_backup.json";

/// Staging directory used while a migration is being written.
pub const MIGRATION_STAGING_DIR: &str = ".lora_style.migrating";

/// Resolved paths under a configuration root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLayout {
    root: PathBuf,
}

impl ConfigLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn category_dir(&self) -> PathBuf {
        self.root.join(CATEGORY_DIR_NAME)
    }

    pub fn global_settings_path(&self) -> PathBuf {
        self.root.join(GLOBAL_SETTINGS_FILE)
    }

    pub fn legacy_path(&self) -> PathBuf {
        self.root.join(LEGACY_CONFIG_FILE)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.root.join(LEGACY_BACKUP_FILE)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(MIGRATION_STAGING_DIR)
    }

    /// The multi-file layout exists; its presence marks migration as done.
    pub fn has_category_dir(&self) -> bool {
        self.category_dir().is_dir()
    }

    pub fn has_legacy_config(&self) -> bool {
        self.legacy_path().is_file()
    }

    /// Legacy file present and multi-file layout absent.
    pub fn needs_migration(&self) -> bool {
        self.has_legacy_config() && !self.has_category_dir()
    }
}
