//! Compiler configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.
//! `from_env` overlays the few settings an operator changes per machine.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::transform::ThemeSettings;

pub const ENV_VANILLA_SOURCE: &str = "MODFORGE_VANILLA_SOURCE";
pub const ENV_TARGET_VERSION: &str = "MODFORGE_TARGET_VERSION";
pub const ENV_DEDUP_RETRY_CAP: &str = "MODFORGE_DEDUP_RETRY_CAP";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("Malformed config: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgeConfig {
    #[serde(default = "default_target_version")]
    pub target_version: Version,
    #[serde(default)]
    pub vanilla_source: Option<PathBuf>,
    #[serde(default = "default_texture_size")]
    pub item_texture_size: u32,
    #[serde(default = "default_texture_size")]
    pub block_texture_size: u32,
    #[serde(default = "default_recolor_strength")]
    pub recolor_strength: f32,
    #[serde(default = "default_retry_cap")]
    pub dedup_retry_cap: u32,
    #[serde(default = "default_strength_step")]
    pub dedup_strength_step: f32,
}

fn default_target_version() -> Version {
    Version::new(1, 21, 1)
}

fn default_texture_size() -> u32 {
    32
}

fn default_recolor_strength() -> f32 {
    0.55
}

fn default_retry_cap() -> u32 {
    4
}

fn default_strength_step() -> f32 {
    0.12
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            target_version: default_target_version(),
            vanilla_source: None,
            item_texture_size: default_texture_size(),
            block_texture_size: default_texture_size(),
            recolor_strength: default_recolor_strength(),
            dedup_retry_cap: default_retry_cap(),
            dedup_strength_step: default_strength_step(),
        }
    }
}

/// Folder naming for one schema generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FolderConvention {
    pub recipe: &'static str,
    pub loot_table: &'static str,
    pub block_tags: &'static str,
    pub item_tags: &'static str,
}

pub const SINGULAR_FOLDERS: FolderConvention = FolderConvention {
    recipe: "recipe",
    loot_table: "loot_table",
    block_tags: "tags/block",
    item_tags: "tags/item",
};

pub const PLURAL_FOLDERS: FolderConvention = FolderConvention {
    recipe: "recipes",
    loot_table: "loot_tables",
    block_tags: "tags/blocks",
    item_tags: "tags/items",
};

/// Folder convention the runtime at `version` loads; the other one is
/// rejected.
pub fn folders_for(version: &Version) -> (FolderConvention, FolderConvention) {
    if *version >= Version::new(1, 21, 0) {
        (SINGULAR_FOLDERS, PLURAL_FOLDERS)
    } else {
        (PLURAL_FOLDERS, SINGULAR_FOLDERS)
    }
}

impl ForgeConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    /// Defaults overlaid with `MODFORGE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup; `from_env` passes the process
    /// environment.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(path) = lookup(ENV_VANILLA_SOURCE).filter(|v| !v.is_empty()) {
            self.vanilla_source = Some(PathBuf::from(path));
        }
        if let Some(v) = lookup(ENV_TARGET_VERSION) {
            self.target_version = Version::parse(v.trim()).map_err(|e| ConfigError::InvalidValue {
                key: ENV_TARGET_VERSION,
                reason: e.to_string(),
            })?;
        }
        if let Some(v) = lookup(ENV_DEDUP_RETRY_CAP) {
            self.dedup_retry_cap = v.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidValue { key: ENV_DEDUP_RETRY_CAP, reason: e.to_string() }
            })?;
        }
        self.check()?;
        Ok(self)
    }

    fn check(&self) -> Result<(), ConfigError> {
        for (key, size) in [
            ("itemTextureSize", self.item_texture_size),
            ("blockTextureSize", self.block_texture_size),
        ] {
            if size < crate::validation::MIN_TEXTURE_SIZE || size > 1024 {
                return Err(ConfigError::InvalidValue {
                    key,
                    reason: format!("{} is outside 16..=1024", size),
                });
            }
            if size % 16 != 0 {
                return Err(ConfigError::InvalidValue {
                    key,
                    reason: format!("{} is not a multiple of 16", size),
                });
            }
        }
        if !(0.0..=1.0).contains(&self.recolor_strength) {
            return Err(ConfigError::InvalidValue {
                key: "recolorStrength",
                reason: format!("{} is outside 0..=1", self.recolor_strength),
            });
        }
        Ok(())
    }

    pub fn folders(&self) -> FolderConvention {
        folders_for(&self.target_version).0
    }

    pub fn rejected_folders(&self) -> FolderConvention {
        folders_for(&self.target_version).1
    }

    pub fn theme_settings(&self) -> ThemeSettings {
        ThemeSettings {
            strength: self.recolor_strength,
            retry_cap: self.dedup_retry_cap,
            strength_step: self.dedup_strength_step,
            ..ThemeSettings::default()
        }
    }

    /// True when the vanilla source should be opened as a zip/jar archive.
    pub fn vanilla_source_is_archive(&self) -> bool {
        self.vanilla_source.as_deref().is_some_and(is_archive_path)
    }
}

pub fn is_archive_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zip") || e.eq_ignore_ascii_case("jar"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_object_is_default() {
        let c = ForgeConfig::from_json("{}").unwrap();
        assert_eq!(c, ForgeConfig::default());
        assert_eq!(c.folders(), SINGULAR_FOLDERS);
    }

    #[test]
    fn test_older_target_uses_plural_folders() {
        let c = ForgeConfig::from_json(r#"{"targetVersion":"1.20.4"}"#).unwrap();
        assert_eq!(c.folders().recipe, "recipes");
        assert_eq!(c.rejected_folders().recipe, "recipe");
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_VANILLA_SOURCE, "/opt/client.jar"),
            (ENV_DEDUP_RETRY_CAP, "7"),
        ]
        .into_iter()
        .collect();
        let c = ForgeConfig::default()
            .with_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(c.dedup_retry_cap, 7);
        assert!(c.vanilla_source_is_archive());
        assert_eq!(c.theme_settings().retry_cap, 7);
    }

    #[test]
    fn test_malformed_override_is_error() {
        let err = ForgeConfig::default()
            .with_overrides(|k| (k == ENV_TARGET_VERSION).then(|| "one.two".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: ENV_TARGET_VERSION, .. }));
    }

    #[test]
    fn test_tiny_texture_size_rejected() {
        assert!(ForgeConfig::from_json(r#"{"itemTextureSize":8}"#).is_err());
    }

    #[test]
    fn test_off_grid_texture_size_rejected() {
        let err = ForgeConfig::from_json(r#"{"blockTextureSize":24}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "blockTextureSize", .. }));
        assert!(err.to_string().contains("multiple of 16"));
        assert!(ForgeConfig::from_json(r#"{"itemTextureSize":40}"#).is_err());
        assert_eq!(ForgeConfig::from_json(r#"{"blockTextureSize":48}"#).unwrap().block_texture_size, 48);
    }
}
