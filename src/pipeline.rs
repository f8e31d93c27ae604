//! Compilation Pipeline - Single Entry Point
//!
//! CRITICAL: every texture passes the validation rules inside `compile`.
//! There is no path from a specification to output bytes that skips them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ForgeConfig;
use crate::emit::{self, EmitError};
use crate::gate::GateConfig;
use crate::hashing::{compute_manifest_hash, compute_tree_hash, sha256_hex};
use crate::mapper::{MapError, MaterializedFile, Mapper, TextureSizes};
use crate::source::AssetSource;
use crate::spec::{expand, ExpandedSpec, ModSpec, SpecError};
use crate::writer::{RunContext, RunStats, WriteError, Writer};
use crate::ENGINE_VERSION;

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
pub(crate) static VALIDATION_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_validation_call_count() -> u32 {
    VALIDATION_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_validation_call_count() {
    VALIDATION_CALL_COUNT.store(0, Ordering::SeqCst);
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Invalid specification: {0}")]
    Spec(#[from] SpecError),

    #[error("Mapping failed: {0}")]
    Map(#[from] MapError),

    #[error("Emitting data files failed: {0}")]
    Emit(#[from] EmitError),

    #[error("Materialization failed: {0}")]
    Write(#[from] WriteError),

    #[error("Two generated files share the path {0}")]
    PathCollision(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub path: String,
    pub size: usize,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildManifest {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub engine_version: String,
    pub mod_id: String,
    pub target_version: String,
    pub tree_hash: String,
    /// Hash of everything above except `runId` and `createdAt`, so equal
    /// builds share it.
    pub manifest_hash: String,
    pub files: Vec<FileEntry>,
    pub stats: RunStats,
}

/// The parts of a manifest that must be equal across identical builds.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ManifestContent<'a> {
    engine_version: &'a str,
    mod_id: &'a str,
    target_version: &'a str,
    tree_hash: &'a str,
    files: &'a [FileEntry],
}

#[derive(Debug, Clone)]
pub struct CompiledMod {
    pub spec: ExpandedSpec,
    pub files: Vec<MaterializedFile>,
    pub manifest: BuildManifest,
}

impl CompiledMod {
    pub fn file(&self, path: &str) -> Option<&MaterializedFile> {
        self.files
            .binary_search_by(|f| f.path.as_str().cmp(path))
            .ok()
            .map(|i| &self.files[i])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedFile {
    pub path: String,
    pub size: usize,
    pub data_base64: String,
    pub hash: String,
}

impl ExportedFile {
    pub fn from_file(file: &MaterializedFile) -> Option<Self> {
        let data = file.bytes()?;
        Some(Self {
            path: file.path.clone(),
            size: data.len(),
            data_base64: base64::Engine::encode(&base64::engine::general_purpose::STANDARD, data),
            hash: sha256_hex(data),
        })
    }
}

/// The compiler - single entry point from specification to file tree
pub struct ModCompiler {
    config: ForgeConfig,
    mapper: Mapper,
}

impl ModCompiler {
    pub fn new(config: ForgeConfig) -> Self {
        let mapper = Mapper::new(TextureSizes {
            item: config.item_texture_size,
            block: config.block_texture_size,
        });
        Self { config, mapper }
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    pub fn expand(&self, spec: &ModSpec) -> Result<ExpandedSpec, CompileError> {
        Ok(expand(spec)?)
    }

    /// Expand and map without producing texture bytes. Textures stay
    /// placeholders carrying their generation metadata.
    pub fn plan(&self, spec: &ModSpec) -> Result<(ExpandedSpec, Vec<MaterializedFile>), CompileError> {
        let expanded = self.expand(spec)?;
        let mut files = self.mapper.map(&expanded, &expanded.asset_keys())?;
        files.extend(emit::data_files(&expanded, &self.config.folders())?);
        files.sort_by(|a, b| a.path.cmp(&b.path));

        let mut seen = BTreeSet::new();
        for file in &files {
            if !seen.insert(file.path.as_str()) {
                return Err(CompileError::PathCollision(file.path.clone()));
            }
        }
        debug!(mod_id = %expanded.mod_id, files = files.len(), "planned file tree");
        Ok((expanded, files))
    }

    /// Compile a specification into a finished file tree.
    ///
    /// CRITICAL: texture bytes are produced only by the writer, which
    /// validates each one before it is accepted.
    pub async fn compile<S: AssetSource>(&self, spec: &ModSpec, source: &S) -> Result<CompiledMod, CompileError> {
        let (expanded, planned) = self.plan(spec)?;

        let mut ctx = RunContext::new();
        let writer = Writer::new(source, self.config.theme_settings());
        let files = writer.render(planned, &mut ctx).await?;

        let manifest = self.manifest(&expanded.mod_id, &files, ctx.stats)?;
        info!(
            mod_id = %manifest.mod_id,
            files = manifest.files.len(),
            tree_hash = %manifest.tree_hash,
            collisions = manifest.stats.collisions,
            "compiled mod"
        );
        Ok(CompiledMod { spec: expanded, files, manifest })
    }

    fn manifest(&self, mod_id: &str, files: &[MaterializedFile], stats: RunStats) -> Result<BuildManifest, CompileError> {
        let mut entries = Vec::with_capacity(files.len());
        let mut listing = Vec::with_capacity(files.len());
        for file in files {
            let bytes = file.bytes().ok_or_else(|| WriteError::Unrendered(file.path.clone()))?;
            entries.push(FileEntry { path: file.path.clone(), size: bytes.len(), sha256: sha256_hex(bytes) });
            listing.push((file.path.as_str(), bytes));
        }
        let tree_hash = compute_tree_hash(listing);
        let target_version = self.config.target_version.to_string();
        let manifest_hash = compute_manifest_hash(&ManifestContent {
            engine_version: ENGINE_VERSION,
            mod_id,
            target_version: &target_version,
            tree_hash: &tree_hash,
            files: &entries,
        })?;

        Ok(BuildManifest {
            run_id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            engine_version: ENGINE_VERSION.to_string(),
            mod_id: mod_id.to_string(),
            target_version,
            tree_hash,
            manifest_hash,
            files: entries,
            stats,
        })
    }

    /// Gate settings matching a compiled mod.
    pub fn gate_config(&self, spec: &ExpandedSpec) -> GateConfig {
        GateConfig::from_spec(spec, &self.config.target_version)
    }
}

impl Default for ModCompiler {
    fn default() -> Self {
        Self::new(ForgeConfig::default())
    }
}
