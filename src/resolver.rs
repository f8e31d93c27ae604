//! Vanilla Asset Resolver
//!
//! Finds the textures a vanilla block really uses by walking its blockstate,
//! every model the blockstate names, and each model's parent chain. Texture
//! maps are merged child-over-parent and `#variable` references are followed
//! to a concrete location. Only paths found in parsed JSON are returned;
//! nothing is derived from naming conventions.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

use crate::source::AssetSource;

/// Longest parent chain followed before giving up.
pub const MAX_PARENT_DEPTH: usize = 32;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VanillaDependencies {
    pub blockstate_path: Option<String>,
    pub model_paths: Vec<String>,
    pub texture_paths: Vec<String>,
}

impl VanillaDependencies {
    pub fn is_empty(&self) -> bool {
        self.blockstate_path.is_none() && self.model_paths.is_empty() && self.texture_paths.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct BlockstateFile {
    #[serde(default)]
    variants: Option<BTreeMap<String, VariantValue>>,
    #[serde(default)]
    multipart: Option<Vec<MultipartEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VariantValue {
    One(VariantModel),
    Many(Vec<VariantModel>),
}

impl VariantValue {
    fn models(&self) -> Vec<&str> {
        match self {
            Self::One(v) => vec![v.model.as_str()],
            Self::Many(vs) => vs.iter().map(|v| v.model.as_str()).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct VariantModel {
    model: String,
}

#[derive(Debug, Deserialize)]
struct MultipartEntry {
    apply: VariantValue,
}

#[derive(Debug, Clone, Deserialize)]
struct ModelFile {
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    textures: BTreeMap<String, String>,
}

/// `block/oak_planks` -> `minecraft:block/oak_planks`
pub fn canonical_location(loc: &str) -> String {
    if loc.contains(':') {
        loc.to_string()
    } else {
        format!("minecraft:{}", loc)
    }
}

fn split_location(loc: &str) -> (&str, &str) {
    loc.split_once(':').unwrap_or(("minecraft", loc))
}

pub fn blockstate_file_path(block_id: &str) -> String {
    format!("assets/minecraft/blockstates/{}.json", block_id)
}

pub fn model_file_path(loc: &str) -> String {
    let (ns, path) = split_location(loc);
    format!("assets/{}/models/{}.json", ns, path)
}

pub fn texture_file_path(loc: &str) -> String {
    let (ns, path) = split_location(loc);
    format!("assets/{}/textures/{}.png", ns, path)
}

/// `assets/minecraft/textures/block/oak_door_bottom.png` -> `oak_door_bottom`
pub fn texture_stem(path: &str) -> &str {
    let file = path.rsplit('/').next().unwrap_or(path);
    file.strip_suffix(".png").unwrap_or(file)
}

/// Follow `#name` references inside one merged texture map.
fn resolve_reference(textures: &BTreeMap<String, String>, value: &str) -> Option<String> {
    let mut current = value;
    let mut seen = HashSet::new();
    while let Some(key) = current.strip_prefix('#') {
        if !seen.insert(key) {
            return None;
        }
        current = textures.get(key)?.as_str();
    }
    Some(current.to_string())
}

struct Walk<'s, S> {
    source: &'s S,
    models: HashMap<String, Option<ModelFile>>,
}

impl<'s, S: AssetSource> Walk<'s, S> {
    async fn load_model(&mut self, loc: &str) -> Option<ModelFile> {
        if let Some(cached) = self.models.get(loc) {
            return cached.clone();
        }
        let path = model_file_path(loc);
        let parsed = match self.source.read(&path).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<ModelFile>(&bytes) {
                Ok(m) => Some(m),
                Err(e) => {
                    warn!(path = %path, error = %e, "skipping malformed model");
                    None
                }
            },
            Ok(None) => {
                debug!(path = %path, "model not present in asset source");
                None
            }
            Err(e) => {
                warn!(path = %path, error = %e, "skipping unreadable model");
                None
            }
        };
        self.models.insert(loc.to_string(), parsed.clone());
        parsed
    }

    /// Models from `root` up through its parents, child first.
    async fn chain(&mut self, root: &str) -> Vec<(String, ModelFile)> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(canonical_location(root));
        while let Some(loc) = next.take() {
            if out.len() >= MAX_PARENT_DEPTH || !visited.insert(loc.clone()) {
                break;
            }
            let Some(model) = self.load_model(&loc).await else {
                break;
            };
            next = model.parent.as_deref().map(canonical_location);
            out.push((loc, model));
        }
        out
    }
}

/// Resolve the vanilla block `template_id` against `source`.
///
/// A missing or unreadable blockstate yields an empty result. A malformed
/// model is skipped and the walk continues with the other models.
pub async fn resolve<S: AssetSource>(template_id: &str, source: &S) -> VanillaDependencies {
    let blockstate_path = blockstate_file_path(template_id);
    let bytes = match source.read(&blockstate_path).await {
        Ok(Some(b)) => b,
        Ok(None) => {
            debug!(template = template_id, "no vanilla blockstate");
            return VanillaDependencies::default();
        }
        Err(e) => {
            warn!(template = template_id, error = %e, "vanilla blockstate unreadable");
            return VanillaDependencies::default();
        }
    };
    let state: BlockstateFile = match serde_json::from_slice(&bytes) {
        Ok(s) => s,
        Err(e) => {
            warn!(path = %blockstate_path, error = %e, "malformed vanilla blockstate");
            return VanillaDependencies::default();
        }
    };

    let mut roots = BTreeSet::new();
    for value in state.variants.iter().flat_map(|v| v.values()) {
        roots.extend(value.models().into_iter().map(canonical_location));
    }
    for part in state.multipart.iter().flatten() {
        roots.extend(part.apply.models().into_iter().map(canonical_location));
    }

    let mut walk = Walk { source, models: HashMap::new() };
    let mut model_paths = BTreeSet::new();
    let mut texture_paths = BTreeSet::new();

    for root in &roots {
        let chain = walk.chain(root).await;
        let mut merged = BTreeMap::new();
        for (loc, model) in chain.iter().rev() {
            model_paths.insert(model_file_path(loc));
            merged.extend(model.textures.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        for value in merged.values() {
            if let Some(resolved) = resolve_reference(&merged, value) {
                texture_paths.insert(texture_file_path(&canonical_location(&resolved)));
            }
        }
    }

    debug!(
        template = template_id,
        models = model_paths.len(),
        textures = texture_paths.len(),
        "resolved vanilla template"
    );
    VanillaDependencies {
        blockstate_path: Some(blockstate_path),
        model_paths: model_paths.into_iter().collect(),
        texture_paths: texture_paths.into_iter().collect(),
    }
}
