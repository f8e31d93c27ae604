//! Build Validation Gate
//!
//! Runs against the packaged archive, not the in-memory tree, so it sees
//! exactly what the game will load. Checks run in a fixed order and the
//! first failing check reports one path and one reason.

use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::archive::{ArchiveError, ArchiveReader};
use crate::classify;
use crate::config::{folders_for, FolderConvention};
use crate::mapper::{blockstate_path, model_path, texture_path};
use crate::png;
use crate::resolver::texture_file_path;
use crate::spec::{AssetKind, ExpandedSpec};
use crate::templates::{BlockShape, TemplateRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateCheck {
    RecipeFolder,
    RecipeSchema,
    LootTableFolder,
    LootTableSchema,
    LootTableCoverage,
    DoorTextures,
    SignAssets,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("[{check:?}] {path}: {reason}")]
pub struct GateFailure {
    pub check: GateCheck,
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum GateError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Archive rejected: {0}")]
    Rejected(GateFailure),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateConfig {
    pub mod_id: String,
    pub block_ids: Vec<String>,
    /// Blocks that intentionally have no loot table.
    #[serde(default)]
    pub no_drop_ids: Vec<String>,
    /// Shapes declared explicitly; any other block is classified by id.
    #[serde(default)]
    pub shapes: BTreeMap<String, BlockShape>,
    #[serde(default = "default_target_version")]
    pub target_version: Version,
}

fn default_target_version() -> Version {
    crate::config::ForgeConfig::default().target_version
}

impl GateConfig {
    pub fn new(mod_id: &str, block_ids: Vec<String>) -> Self {
        Self {
            mod_id: mod_id.to_string(),
            block_ids,
            no_drop_ids: vec![],
            shapes: BTreeMap::new(),
            target_version: default_target_version(),
        }
    }

    pub fn from_spec(spec: &ExpandedSpec, target_version: &Version) -> Self {
        Self {
            mod_id: spec.mod_id.clone(),
            block_ids: spec.block_ids(),
            no_drop_ids: spec.no_drop_ids(),
            shapes: spec.blocks.iter().map(|b| (b.entity.id.clone(), b.shape)).collect(),
            target_version: target_version.clone(),
        }
    }

    pub fn with_no_drop(mut self, ids: Vec<String>) -> Self {
        self.no_drop_ids = ids;
        self
    }

    pub fn with_target_version(mut self, version: Version) -> Self {
        self.target_version = version;
        self
    }

    fn shape(&self, id: &str) -> BlockShape {
        self.shapes.get(id).copied().unwrap_or_else(|| classify::block_shape(id))
    }
}

/// Folder conventions resolved once per gate run.
struct Context<'c> {
    config: &'c GateConfig,
    accepted: FolderConvention,
    rejected: FolderConvention,
}

/// `data/<ns>/<folder>/...` where `<folder>` is a single path segment.
fn in_data_folder(name: &str, folder: &str) -> bool {
    let mut parts = name.splitn(4, '/');
    matches!(
        (parts.next(), parts.next(), parts.next(), parts.next()),
        (Some("data"), Some(_), Some(f), Some(rest)) if f == folder && !rest.is_empty()
    )
}

fn fail(check: GateCheck, path: &str, reason: impl Into<String>) -> Option<GateFailure> {
    Some(GateFailure { check, path: path.to_string(), reason: reason.into() })
}

/// One ordered gate check. `Ok(None)` passes.
trait GateRule {
    fn check(&self, archive: &mut ArchiveReader, ctx: &Context<'_>) -> Result<Option<GateFailure>, ArchiveError>;
}

/// Files under the folder name the target version does not load.
struct RejectedFolder {
    check: GateCheck,
    what: &'static str,
    folder: fn(&FolderConvention) -> &'static str,
}

impl GateRule for RejectedFolder {
    fn check(&self, archive: &mut ArchiveReader, ctx: &Context<'_>) -> Result<Option<GateFailure>, ArchiveError> {
        let rejected = (self.folder)(&ctx.rejected);
        let accepted = (self.folder)(&ctx.accepted);
        let mut misplaced = archive.names().filter(|n| in_data_folder(n, rejected));
        let Some(first) = misplaced.next() else {
            return Ok(None);
        };
        let others = misplaced.count();
        let mut reason = format!(
            "{} file under `{}/`; Minecraft {} only loads `data/<namespace>/{}/`",
            self.what, rejected, ctx.config.target_version, accepted
        );
        if others > 0 {
            reason.push_str(&format!(" ({} more file(s) affected)", others));
        }
        Ok(fail(self.check, first, reason))
    }
}

/// Every JSON file under the accepted folder parses and carries the
/// required top-level fields.
struct JsonSchema {
    check: GateCheck,
    folder: fn(&FolderConvention) -> &'static str,
    required: &'static [(&'static str, JsonKind)],
}

#[derive(Clone, Copy)]
enum JsonKind {
    Any,
    Array,
}

impl GateRule for JsonSchema {
    fn check(&self, archive: &mut ArchiveReader, ctx: &Context<'_>) -> Result<Option<GateFailure>, ArchiveError> {
        let folder = (self.folder)(&ctx.accepted);
        for entry in archive.entries(|n| in_data_folder(n, folder) && n.ends_with(".json")) {
            let (name, bytes) = entry?;
            let value: Value = match serde_json::from_slice(&bytes) {
                Ok(v) => v,
                Err(e) => return Ok(fail(self.check, &name, format!("invalid JSON: {}", e))),
            };
            for &(field, kind) in self.required {
                let ok = match (value.get(field), kind) {
                    (Some(_), JsonKind::Any) => true,
                    (Some(v), JsonKind::Array) => v.is_array(),
                    (None, _) => false,
                };
                if !ok {
                    let reason = match kind {
                        JsonKind::Any => format!("missing required field `{}`", field),
                        JsonKind::Array => format!("field `{}` must be an array", field),
                    };
                    return Ok(fail(self.check, &name, reason));
                }
            }
        }
        Ok(None)
    }
}

struct LootCoverage;

impl GateRule for LootCoverage {
    fn check(&self, archive: &mut ArchiveReader, ctx: &Context<'_>) -> Result<Option<GateFailure>, ArchiveError> {
        let exempt: BTreeSet<&str> = ctx.config.no_drop_ids.iter().map(String::as_str).collect();
        for id in &ctx.config.block_ids {
            if exempt.contains(id.as_str()) {
                continue;
            }
            let path = format!("data/{}/{}/blocks/{}.json", ctx.config.mod_id, ctx.accepted.loot_table, id);
            if !archive.contains(&path) {
                return Ok(fail(
                    GateCheck::LootTableCoverage,
                    &path,
                    format!("block `{}` has no loot table and is not marked as dropping nothing", id),
                ));
            }
        }
        Ok(None)
    }
}

struct DoorTextures;

impl GateRule for DoorTextures {
    fn check(&self, archive: &mut ArchiveReader, ctx: &Context<'_>) -> Result<Option<GateFailure>, ArchiveError> {
        let mod_id = &ctx.config.mod_id;
        for id in ctx.config.block_ids.iter().filter(|id| ctx.config.shape(id) == BlockShape::Door) {
            let mut dims = Vec::with_capacity(2);
            for half in ["_bottom", "_top"] {
                let path = texture_path(mod_id, AssetKind::Block, &format!("{}{}", id, half));
                let Some(bytes) = archive.read(&path)? else {
                    return Ok(fail(GateCheck::DoorTextures, &path, "door texture missing"));
                };
                let decoded = match png::decode(&bytes) {
                    Ok(d) => d,
                    Err(e) => return Ok(fail(GateCheck::DoorTextures, &path, format!("not a valid PNG: {}", e))),
                };
                let (w, h) = (decoded.width, decoded.height);
                if w != h || w % 16 != 0 {
                    return Ok(fail(
                        GateCheck::DoorTextures,
                        &path,
                        format!("door texture is {}x{}; expected a square multiple of 16", w, h),
                    ));
                }
                dims.push((path, w));
            }
            if let [(_, bottom), (top_path, top)] = dims.as_slice() {
                if bottom != top {
                    return Ok(fail(
                        GateCheck::DoorTextures,
                        top_path,
                        format!("door halves differ in size: bottom {0}x{0}, top {1}x{1}", bottom, top),
                    ));
                }
            }
        }
        Ok(None)
    }
}

struct SignAssets {
    registry: TemplateRegistry,
}

impl GateRule for SignAssets {
    fn check(&self, archive: &mut ArchiveReader, ctx: &Context<'_>) -> Result<Option<GateFailure>, ArchiveError> {
        let mod_id = &ctx.config.mod_id;
        for id in &ctx.config.block_ids {
            let shape = ctx.config.shape(id);
            if !shape.is_sign() {
                continue;
            }
            let template = self.registry.get(shape);
            let mut required = vec![
                blockstate_path(mod_id, id),
                model_path(mod_id, AssetKind::Block, id),
                texture_path(mod_id, AssetKind::Block, id),
            ];
            required.extend(template.entity_texture(mod_id, id).map(|loc| texture_file_path(&loc)));
            if let Some(missing) = required.iter().find(|p| !archive.contains(p)) {
                return Ok(fail(
                    GateCheck::SignAssets,
                    missing,
                    format!("{} `{}` is missing a required file", shape.name().replace('_', " "), id),
                ));
            }
        }
        Ok(None)
    }
}

fn rules() -> Vec<Box<dyn GateRule>> {
    vec![
        Box::new(RejectedFolder { check: GateCheck::RecipeFolder, what: "recipe", folder: |f| f.recipe }),
        Box::new(JsonSchema {
            check: GateCheck::RecipeSchema,
            folder: |f| f.recipe,
            required: &[("type", JsonKind::Any), ("result", JsonKind::Any)],
        }),
        Box::new(RejectedFolder { check: GateCheck::LootTableFolder, what: "loot table", folder: |f| f.loot_table }),
        Box::new(JsonSchema {
            check: GateCheck::LootTableSchema,
            folder: |f| f.loot_table,
            required: &[("type", JsonKind::Any), ("pools", JsonKind::Array)],
        }),
        Box::new(LootCoverage),
        Box::new(DoorTextures),
        Box::new(SignAssets { registry: TemplateRegistry::builtin() }),
    ]
}

/// Validate the archive at `path`. Returns the first failure only.
pub fn validate_archive(path: &Path, config: &GateConfig) -> Result<(), GateError> {
    let mut archive = ArchiveReader::open(path)?;
    let (accepted, rejected) = folders_for(&config.target_version);
    let ctx = Context { config, accepted, rejected };

    for rule in rules() {
        if let Some(failure) = rule.check(&mut archive, &ctx)? {
            info!(check = ?failure.check, path = %failure.path, "gate rejected archive");
            return Err(GateError::Rejected(failure));
        }
    }
    debug!(archive = %path.display(), blocks = config.block_ids.len(), "gate passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_data_folder() {
        assert!(in_data_folder("data/m/recipe/a.json", "recipe"));
        assert!(in_data_folder("data/minecraft/recipes/x/y.json", "recipes"));
        assert!(!in_data_folder("data/m/recipes/a.json", "recipe"));
        assert!(!in_data_folder("assets/m/recipe/a.json", "recipe"));
        assert!(!in_data_folder("data/m/recipe/", "recipe"));
    }

    #[test]
    fn test_explicit_shape_wins_over_classification() {
        let mut config = GateConfig::new("m", vec!["weird_panel".into()]);
        assert_eq!(config.shape("weird_panel"), BlockShape::Cube);
        config.shapes.insert("weird_panel".into(), BlockShape::Door);
        assert_eq!(config.shape("weird_panel"), BlockShape::Door);
        assert_eq!(config.shape("ruby_sign"), BlockShape::Sign);
    }

    #[test]
    fn test_gate_config_serde_defaults() {
        let config: GateConfig = serde_json::from_str(r#"{"modId":"m","blockIds":["a"]}"#).unwrap();
        assert!(config.no_drop_ids.is_empty());
        assert_eq!(config.target_version, Version::new(1, 21, 1));
    }
}
