//! File Materialization Writer
//!
//! Turns placeholder textures into bytes and writes finished trees to disk.
//! Files are processed one at a time in path order so that the per-run
//! duplicate cache sees them in the same order on every run. All run state
//! lives in a [`RunContext`] built fresh for each compilation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Component, Path};
use thiserror::Error;
use tracing::{debug, info};

use crate::mapper::{FileContents, MaterializedFile, TextureMetadata, TextureRole};
use crate::png::{self, PngError, RgbaImage};
use crate::resolver::{self, canonical_location, texture_file_path, texture_stem, VanillaDependencies};
use crate::source::{AssetSource, SourceError};
use crate::spec::TextureSource;
use crate::synth::synthesize;
use crate::transform::{self, DedupCache, ThemeSettings};
use crate::validation::Validator;

#[cfg(feature = "test-hooks")]
use std::sync::atomic::Ordering;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Texture {path}: source {source_path} failed to decode: {source}")]
    Decode {
        path: String,
        source_path: String,
        #[source]
        source: PngError,
    },

    #[error("Texture {path}: encoding failed: {source}")]
    Encode {
        path: String,
        #[source]
        source: PngError,
    },

    #[error("Texture {path} failed validation: {reason}")]
    Validation { path: String, reason: String },

    #[error("Texture {0} has no generation metadata")]
    MissingMetadata(String),

    #[error("File {0} was never rendered")]
    Unrendered(String),

    #[error("Refusing to write outside the output directory: {0}")]
    UnsafePath(String),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Where a texture's pixels came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Copied,
    Templated,
    Synthesized,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub textures: u32,
    pub copied: u32,
    pub templated: u32,
    pub synthesized: u32,
    /// Textures that needed at least one dedup retry.
    pub retried: u32,
    pub collisions: u32,
    /// Textures accepted as duplicates after the retry cap.
    pub exhausted: u32,
    pub validation_warnings: u32,
}

/// Per-run state: duplicate cache, memoized resolver results, counters.
#[derive(Debug, Default)]
pub struct RunContext {
    pub dedup: DedupCache,
    resolved: HashMap<String, VanillaDependencies>,
    pub stats: RunStats,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolved_templates(&self) -> usize {
        self.resolved.len()
    }
}

pub struct Writer<'s, S> {
    source: &'s S,
    settings: ThemeSettings,
    validator: Validator,
}

impl<'s, S: AssetSource> Writer<'s, S> {
    pub fn new(source: &'s S, settings: ThemeSettings) -> Self {
        Self { source, settings, validator: Validator::new() }
    }

    /// Produce bytes for every placeholder in `files`.
    pub async fn render(
        &self,
        files: Vec<MaterializedFile>,
        ctx: &mut RunContext,
    ) -> Result<Vec<MaterializedFile>, WriteError> {
        let mut out = Vec::with_capacity(files.len());
        for mut file in files {
            if file.contents == FileContents::Placeholder {
                let meta = file
                    .metadata
                    .as_ref()
                    .ok_or_else(|| WriteError::MissingMetadata(file.path.clone()))?;
                let bytes = self.texture(&file.path, meta, ctx).await?;
                file.contents = FileContents::Binary(bytes);
            }
            out.push(file);
        }
        ctx.stats.collisions = ctx.dedup.collisions;
        ctx.stats.exhausted = ctx.dedup.exhausted;
        info!(
            textures = ctx.stats.textures,
            synthesized = ctx.stats.synthesized,
            collisions = ctx.stats.collisions,
            "textures rendered"
        );
        Ok(out)
    }

    async fn dependencies(&self, template: &str, ctx: &mut RunContext) -> VanillaDependencies {
        if let Some(found) = ctx.resolved.get(template) {
            return found.clone();
        }
        let deps = resolver::resolve(template, self.source).await;
        ctx.resolved.insert(template.to_string(), deps.clone());
        deps
    }

    async fn source_image(
        &self,
        path: &str,
        meta: &TextureMetadata,
        ctx: &mut RunContext,
    ) -> Result<(RgbaImage, Origin), WriteError> {
        match &meta.source {
            TextureSource::CopyFromVanilla(locations) => {
                for loc in locations {
                    let source_path = texture_file_path(&canonical_location(loc));
                    if let Some(bytes) = self.source.read(&source_path).await? {
                        return Ok((decode_source(path, &source_path, &bytes, meta.role)?, Origin::Copied));
                    }
                }
                debug!(path, "no vanilla texture to copy");
            }
            TextureSource::VanillaTemplate(template) => {
                let deps = self.dependencies(template, ctx).await;
                if let Some(source_path) = pick_template_texture(&deps, template, &meta.suffix) {
                    if let Some(bytes) = self.source.read(&source_path).await? {
                        return Ok((decode_source(path, &source_path, &bytes, meta.role)?, Origin::Templated));
                    }
                }
                debug!(path, template = %template, "template yielded no texture");
            }
            TextureSource::Procedural => {}
        }
        let image = synthesize(&meta.location, &meta.profile, meta.color, meta.width, meta.height);
        Ok((image, Origin::Synthesized))
    }

    /// source -> normalize -> decode -> theme -> encode -> validate
    async fn texture(&self, path: &str, meta: &TextureMetadata, ctx: &mut RunContext) -> Result<Vec<u8>, WriteError> {
        let (image, origin) = self.source_image(path, meta, ctx).await?;

        let hue = meta
            .color
            .and_then(transform::hint_hue)
            .unwrap_or_else(|| transform::target_hue(&meta.hue_key));
        let themed = transform::theme(&image, hue, path, &self.settings, &mut ctx.dedup);

        let bytes = png::encode_image(&themed.image).map_err(|source| WriteError::Encode {
            path: path.to_string(),
            source,
        })?;

        #[cfg(feature = "test-hooks")]
        crate::pipeline::VALIDATION_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

        let validation = self.validator.validate_png(path, &bytes);
        if !validation.valid {
            return Err(WriteError::Validation {
                path: path.to_string(),
                reason: validation.first_error().unwrap_or_else(|| "invalid texture".to_string()),
            });
        }

        let stats = &mut ctx.stats;
        stats.textures += 1;
        stats.validation_warnings += validation.violations.len() as u32;
        if themed.attempts > 0 {
            stats.retried += 1;
        }
        match origin {
            Origin::Copied => stats.copied += 1,
            Origin::Templated => stats.templated += 1,
            Origin::Synthesized => stats.synthesized += 1,
        }
        Ok(bytes)
    }
}

/// The template texture whose name carries the same suffix as the output
/// (`oak_door_bottom` for `maple_door_bottom`), else the first one found.
fn pick_template_texture(deps: &VanillaDependencies, template: &str, suffix: &str) -> Option<String> {
    let wanted = format!("{}{}", template, suffix);
    deps.texture_paths
        .iter()
        .find(|p| texture_stem(p) == wanted)
        .or_else(|| deps.texture_paths.first())
        .cloned()
}

fn decode_source(path: &str, source_path: &str, bytes: &[u8], role: TextureRole) -> Result<RgbaImage, WriteError> {
    let fail = |source| WriteError::Decode {
        path: path.to_string(),
        source_path: source_path.to_string(),
        source,
    };
    let normalized = transform::normalize(bytes).map_err(fail)?;
    let image = png::decode_rgba(&normalized).map_err(fail)?;
    Ok(match role {
        TextureRole::Item | TextureRole::Block => first_frame(image),
        TextureRole::Entity => image,
    })
}

/// Animated vanilla textures are vertical strips of square frames.
fn first_frame(image: RgbaImage) -> RgbaImage {
    let (w, h) = (image.width, image.height);
    if w == 0 || h <= w || h % w != 0 {
        return image;
    }
    let len = (w * w * 4) as usize;
    RgbaImage { width: w, height: w, pixels: image.pixels[..len].to_vec() }
}

/// Archive-relative path that stays inside the output directory.
pub fn is_safe_relative(path: &str) -> bool {
    let p = Path::new(path);
    !path.is_empty() && p.components().all(|c| matches!(c, Component::Normal(_)))
}

/// Write a rendered tree under `out_dir`, one file at a time.
pub async fn write_tree(out_dir: &Path, files: &[MaterializedFile]) -> Result<(), WriteError> {
    for file in files {
        if !is_safe_relative(&file.path) {
            return Err(WriteError::UnsafePath(file.path.clone()));
        }
        let bytes = file.bytes().ok_or_else(|| WriteError::Unrendered(file.path.clone()))?;
        let target = out_dir.join(&file.path);
        let io_err = |source| WriteError::Io { path: target.display().to_string(), source };
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(&target, bytes).await.map_err(io_err)?;
    }
    debug!(dir = %out_dir.display(), files = files.len(), "tree written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::Mapper;
    use crate::source::MemorySource;
    use crate::spec::{expand, ModSpec};

    fn gradient_png(w: u32, h: u32) -> Vec<u8> {
        let mut img = RgbaImage::new(w, h);
        for y in 0..h {
            for x in 0..w {
                img.set(x, y, [(x * 15) as u8, (y * 15) as u8, 60, 255]);
            }
        }
        png::encode_image(&img).unwrap()
    }

    #[tokio::test]
    async fn test_renders_every_placeholder() {
        let spec = expand(&ModSpec::from_json(r#"{"modId":"gems","items":[{"id":"ruby"}],"blocks":[{"id":"ruby_block"}]}"#).unwrap()).unwrap();
        let files = Mapper::default().map(&spec, &spec.asset_keys()).unwrap();
        let source = MemorySource::new();
        let writer = Writer::new(&source, ThemeSettings::default());
        let mut ctx = RunContext::new();
        let rendered = writer.render(files, &mut ctx).await.unwrap();
        assert!(rendered.iter().all(|f| f.contents != FileContents::Placeholder));
        assert_eq!(ctx.stats.textures, 2);
        assert_eq!(ctx.stats.synthesized, 2);
    }

    #[tokio::test]
    async fn test_copy_from_vanilla_and_template_suffix() {
        let source = MemorySource::new()
            .with("assets/minecraft/textures/item/oak_door.png", gradient_png(16, 16))
            .with("assets/minecraft/textures/block/oak_door_bottom.png", gradient_png(16, 16))
            .with("assets/minecraft/textures/block/oak_door_top.png", gradient_png(16, 16))
            .with(
                "assets/minecraft/blockstates/oak_door.json",
                r#"{"variants":{"half=lower":{"model":"minecraft:block/oak_door_bottom_left"},"half=upper":{"model":"minecraft:block/oak_door_top_left"}}}"#,
            )
            .with(
                "assets/minecraft/models/block/oak_door_bottom_left.json",
                r#"{"textures":{"bottom":"minecraft:block/oak_door_bottom","top":"minecraft:block/oak_door_top"}}"#,
            );
        let spec = expand(&ModSpec::from_json(r#"{"modId":"woods","woodTypes":[{"id":"maple"}]}"#).unwrap()).unwrap();
        let files = Mapper::default().map(&spec, &[crate::spec::AssetKey::block("maple_door")]).unwrap();
        let writer = Writer::new(&source, ThemeSettings::default());
        let mut ctx = RunContext::new();
        let rendered = writer.render(files, &mut ctx).await.unwrap();

        assert_eq!(ctx.stats.copied, 1);
        assert_eq!(ctx.stats.templated, 2);
        assert_eq!(ctx.resolved_templates(), 1);
        let bottom = rendered.iter().find(|f| f.path.ends_with("maple_door_bottom.png")).unwrap();
        let decoded = png::decode(bottom.bytes().unwrap()).unwrap();
        assert_eq!((decoded.width, decoded.height), (16, 16));
    }

    #[test]
    fn test_pick_template_texture() {
        let deps = VanillaDependencies {
            blockstate_path: None,
            model_paths: vec![],
            texture_paths: vec![
                "assets/minecraft/textures/block/stripped_oak_log.png".into(),
                "assets/minecraft/textures/block/stripped_oak_log_top.png".into(),
            ],
        };
        assert_eq!(
            pick_template_texture(&deps, "stripped_oak_log", "_top").as_deref(),
            Some("assets/minecraft/textures/block/stripped_oak_log_top.png")
        );
        assert_eq!(
            pick_template_texture(&deps, "stripped_oak_wood", "").as_deref(),
            Some("assets/minecraft/textures/block/stripped_oak_log.png")
        );
    }

    #[test]
    fn test_first_frame_of_strip() {
        let strip = RgbaImage::new(16, 64);
        let frame = first_frame(strip);
        assert_eq!((frame.width, frame.height), (16, 16));
        assert_eq!(frame.pixels.len(), 16 * 16 * 4);
    }

    #[test]
    fn test_safe_paths() {
        assert!(is_safe_relative("assets/gems/textures/item/ruby.png"));
        assert!(!is_safe_relative("../escape.png"));
        assert!(!is_safe_relative("/etc/passwd"));
        assert!(!is_safe_relative(""));
    }

    #[tokio::test]
    async fn test_write_tree_refuses_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let file = MaterializedFile { path: "a.png".into(), contents: FileContents::Placeholder, metadata: None };
        assert!(matches!(write_tree(dir.path(), &[file]).await, Err(WriteError::Unrendered(_))));
    }
}
