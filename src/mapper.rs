//! Asset-Key Mapper
//!
//! Pure function from an expanded specification and a list of asset keys to
//! the in-memory file tree. Texture files are emitted as placeholders that
//! carry everything the writer needs to produce their bytes; models,
//! blockstates and the language file are emitted as finished JSON text.
//! Output is sorted by path, so the same input always yields the same tree.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::classify::{self, Archetype, MaterialClass};
use crate::emit::{self, EmitError};
use crate::profile::TextureProfile;
use crate::spec::{AssetKey, AssetKind, ExpandedBlock, ExpandedEntity, ExpandedSpec, TextureSource};
use crate::templates::{ItemRendering, TemplateRegistry};

/// Sign entity textures are 64x32 in vanilla.
pub const ENTITY_TEXTURE_SIZE: (u32, u32) = (64, 32);

#[derive(Debug, Error)]
pub enum MapError {
    #[error("Asset key {kind}:{id} is not declared in the specification")]
    UnknownKey { kind: &'static str, id: String },

    #[error("Asset key {key} is incomplete: missing {missing}")]
    Incomplete { key: String, missing: &'static str },

    #[error("Two assets map to the same path: {0}")]
    PathCollision(String),

    #[error("Failed to serialize {path}: {source}")]
    Serialize {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Emit(#[from] EmitError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "data")]
pub enum FileContents {
    Text(String),
    Binary(Vec<u8>),
    /// Bytes are produced by the writer from the file's texture metadata.
    Placeholder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextureRole {
    Item,
    Block,
    Entity,
}

/// How to produce one texture. Never influences the file's path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureMetadata {
    pub owner: AssetKey,
    pub role: TextureRole,
    pub material_class: MaterialClass,
    pub profile: TextureProfile,
    pub archetype: Archetype,
    pub color: Option<[u8; 3]>,
    pub source: TextureSource,
    /// Vanilla block id the source template was resolved from, used to
    /// match suffixes (`oak_door` + `_bottom`).
    pub template_id: Option<String>,
    /// Suffix of this texture relative to the owner id (`""`, `_top`, ...).
    pub suffix: String,
    /// Id the target hue is derived from. Wood family members share their
    /// family id so the whole family lands on one hue.
    pub hue_key: String,
    /// Texture location, also the synthesis seed.
    pub location: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializedFile {
    pub path: String,
    pub contents: FileContents,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TextureMetadata>,
}

impl MaterializedFile {
    pub fn text(path: String, text: String) -> Self {
        Self { path, contents: FileContents::Text(text), metadata: None }
    }

    pub fn is_texture(&self) -> bool {
        self.path.ends_with(".png")
    }

    /// Bytes of a finished file; `None` while still a placeholder.
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.contents {
            FileContents::Text(t) => Some(t.as_bytes()),
            FileContents::Binary(b) => Some(b),
            FileContents::Placeholder => None,
        }
    }
}

// --- Paths ---

/// `gems:item/ruby` -> `assets/gems/textures/item/ruby.png`
pub fn texture_path_for(location: &str) -> String {
    crate::resolver::texture_file_path(location)
}

pub fn texture_path(mod_id: &str, kind: AssetKind, name: &str) -> String {
    format!("assets/{}/textures/{}/{}.png", mod_id, kind.as_str(), name)
}

pub fn model_path(mod_id: &str, kind: AssetKind, name: &str) -> String {
    format!("assets/{}/models/{}/{}.json", mod_id, kind.as_str(), name)
}

pub fn blockstate_path(mod_id: &str, id: &str) -> String {
    format!("assets/{}/blockstates/{}.json", mod_id, id)
}

/// Output sizes for generated textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureSizes {
    pub item: u32,
    pub block: u32,
}

impl Default for TextureSizes {
    fn default() -> Self {
        Self { item: 32, block: 32 }
    }
}

pub struct Mapper {
    registry: TemplateRegistry,
    sizes: TextureSizes,
}

impl Mapper {
    pub fn new(sizes: TextureSizes) -> Self {
        Self { registry: TemplateRegistry::builtin(), sizes }
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// Map `keys` to files. Every key must be declared in `spec` and must
    /// yield at least one texture and one model.
    pub fn map(&self, spec: &ExpandedSpec, keys: &[AssetKey]) -> Result<Vec<MaterializedFile>, MapError> {
        let mut files: BTreeMap<String, MaterializedFile> = BTreeMap::new();
        let requested: BTreeSet<&AssetKey> = keys.iter().collect();

        for key in requested {
            let produced = match key.kind {
                AssetKind::Item => {
                    let item = spec.item(&key.id).ok_or_else(|| MapError::UnknownKey {
                        kind: "item",
                        id: key.id.clone(),
                    })?;
                    self.item_files(&spec.mod_id, item)?
                }
                AssetKind::Block => {
                    let block = spec.block(&key.id).ok_or_else(|| MapError::UnknownKey {
                        kind: "block",
                        id: key.id.clone(),
                    })?;
                    self.block_files(&spec.mod_id, block)?
                }
            };
            check_complete(key, &produced)?;
            for file in produced {
                if files.contains_key(&file.path) {
                    return Err(MapError::PathCollision(file.path));
                }
                files.insert(file.path.clone(), file);
            }
        }

        let lang = emit::lang_file(spec)?;
        if files.contains_key(&lang.path) {
            return Err(MapError::PathCollision(lang.path));
        }
        files.insert(lang.path.clone(), lang);

        Ok(files.into_values().collect())
    }

    fn item_files(&self, mod_id: &str, item: &ExpandedEntity) -> Result<Vec<MaterializedFile>, MapError> {
        let location = format!("{}:item/{}", mod_id, item.id);
        // A vanilla template on an item names the vanilla item sprite.
        let source = match &item.texture_source {
            TextureSource::VanillaTemplate(t) => TextureSource::CopyFromVanilla(vec![format!("minecraft:item/{}", t)]),
            other => other.clone(),
        };
        let texture = texture_file(
            texture_path(mod_id, AssetKind::Item, &item.id),
            TextureMetadata {
                owner: AssetKey::item(&item.id),
                role: TextureRole::Item,
                material_class: item.material_class,
                profile: item.profile.clone(),
                archetype: item.archetype,
                color: item.color,
                source,
                template_id: None,
                suffix: String::new(),
                hue_key: item.id.clone(),
                location: location.clone(),
                width: self.sizes.item,
                height: self.sizes.item,
            },
        );
        let model = serde_json::json!({
            "parent": classify::item_parent(&item.id),
            "textures": { "layer0": location },
        });
        Ok(vec![texture, json_file(model_path(mod_id, AssetKind::Item, &item.id), &model)?])
    }

    fn block_files(&self, mod_id: &str, block: &ExpandedBlock) -> Result<Vec<MaterializedFile>, MapError> {
        let entity = &block.entity;
        let id = &entity.id;
        let template = self.registry.get(block.shape);
        let hue_key = block.family.clone().unwrap_or_else(|| id.clone());
        let template_id = match &entity.texture_source {
            TextureSource::VanillaTemplate(t) => Some(t.clone()),
            _ => None,
        };
        let metadata = |role, source: &TextureSource, suffix: &str, location: String, (width, height)| TextureMetadata {
            owner: AssetKey::block(id),
            role,
            material_class: entity.material_class,
            profile: entity.profile.clone(),
            archetype: entity.archetype,
            color: entity.color,
            source: source.clone(),
            template_id: template_id.clone(),
            suffix: suffix.to_string(),
            hue_key: hue_key.clone(),
            location,
            width,
            height,
        };
        let block_size = (self.sizes.block, self.sizes.block);

        let mut out = Vec::new();
        for &suffix in template.textures {
            let name = format!("{}{}", id, suffix);
            out.push(texture_file(
                texture_path(mod_id, AssetKind::Block, &name),
                metadata(
                    TextureRole::Block,
                    &entity.texture_source,
                    suffix,
                    format!("{}:block/{}", mod_id, name),
                    block_size,
                ),
            ));
        }

        for (name, model) in template.render_models(mod_id, id) {
            out.push(json_file(model_path(mod_id, AssetKind::Block, &name), &model)?);
        }
        out.push(json_file(blockstate_path(mod_id, id), &template.render_blockstate(mod_id, id))?);
        out.push(json_file(
            model_path(mod_id, AssetKind::Item, id),
            &template.render_item_model(mod_id, id),
        )?);

        if template.item == ItemRendering::Generated {
            let location = format!("{}:item/{}", mod_id, id);
            out.push(texture_file(
                texture_path(mod_id, AssetKind::Item, id),
                metadata(
                    TextureRole::Item,
                    &block.item_texture_source,
                    "",
                    location,
                    (self.sizes.item, self.sizes.item),
                ),
            ));
        }

        if let Some(location) = template.entity_texture(mod_id, id) {
            let source = block.entity_texture_source.clone().unwrap_or(TextureSource::Procedural);
            out.push(texture_file(
                texture_path_for(&location),
                metadata(TextureRole::Entity, &source, "", location, ENTITY_TEXTURE_SIZE),
            ));
        }
        Ok(out)
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Self::new(TextureSizes::default())
    }
}

fn texture_file(path: String, metadata: TextureMetadata) -> MaterializedFile {
    MaterializedFile { path, contents: FileContents::Placeholder, metadata: Some(metadata) }
}

fn json_file(path: String, value: &serde_json::Value) -> Result<MaterializedFile, MapError> {
    let text = emit::pretty_json(value).map_err(|source| MapError::Serialize { path: path.clone(), source })?;
    Ok(MaterializedFile::text(path, text))
}

fn check_complete(key: &AssetKey, files: &[MaterializedFile]) -> Result<(), MapError> {
    let label = format!("{}:{}", key.kind.as_str(), key.id);
    let has = |needle: &str| files.iter().any(|f| f.path.contains(needle));
    if !files.iter().any(MaterializedFile::is_texture) {
        return Err(MapError::Incomplete { key: label, missing: "texture" });
    }
    if !has("/models/item/") {
        return Err(MapError::Incomplete { key: label, missing: "item model" });
    }
    if key.kind == AssetKind::Block {
        if !has("/models/block/") {
            return Err(MapError::Incomplete { key: label, missing: "block model" });
        }
        if !has("/blockstates/") {
            return Err(MapError::Incomplete { key: label, missing: "blockstate" });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{expand, ModSpec};

    fn expanded(json: &str) -> ExpandedSpec {
        expand(&ModSpec::from_json(json).unwrap()).unwrap()
    }

    fn paths(files: &[MaterializedFile]) -> Vec<&str> {
        files.iter().map(|f| f.path.as_str()).collect()
    }

    #[test]
    fn test_item_maps_to_texture_model_and_lang() {
        let spec = expanded(r#"{"modId":"gems","items":[{"id":"ruby","material":"gem"}]}"#);
        let files = Mapper::default().map(&spec, &spec.asset_keys()).unwrap();
        assert_eq!(
            paths(&files),
            vec![
                "assets/gems/lang/en_us.json",
                "assets/gems/models/item/ruby.json",
                "assets/gems/textures/item/ruby.png",
            ]
        );
        let tex = files[2].metadata.as_ref().unwrap();
        assert_eq!(tex.material_class, MaterialClass::Crystal);
        assert_eq!((tex.width, tex.height), (32, 32));
        assert_eq!(files[2].contents, FileContents::Placeholder);
    }

    #[test]
    fn test_block_as_item_uses_block_model() {
        let spec = expanded(r#"{"modId":"gems","blocks":[{"id":"ruby_block"}]}"#);
        let files = Mapper::default().map(&spec, &spec.asset_keys()).unwrap();
        let item_model = files.iter().find(|f| f.path == "assets/gems/models/item/ruby_block.json").unwrap();
        let FileContents::Text(text) = &item_model.contents else { panic!("expected text") };
        let v: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(v["parent"], "gems:block/ruby_block");
        assert!(paths(&files).contains(&"assets/gems/blockstates/ruby_block.json"));
    }

    #[test]
    fn test_door_gets_two_block_textures_and_item_sprite() {
        let spec = expanded(r#"{"modId":"woods","woodTypes":[{"id":"maple"}]}"#);
        let files = Mapper::default().map(&spec, &[AssetKey::block("maple_door")]).unwrap();
        let p = paths(&files);
        assert!(p.contains(&"assets/woods/textures/block/maple_door_bottom.png"));
        assert!(p.contains(&"assets/woods/textures/block/maple_door_top.png"));
        assert!(p.contains(&"assets/woods/textures/item/maple_door.png"));
        let sprite = files.iter().find(|f| f.path.ends_with("item/maple_door.png")).unwrap();
        assert_eq!(
            sprite.metadata.as_ref().unwrap().source,
            TextureSource::CopyFromVanilla(vec!["minecraft:item/oak_door".into()])
        );
        assert_eq!(sprite.metadata.as_ref().unwrap().hue_key, "maple");
    }

    #[test]
    fn test_sign_gets_entity_texture() {
        let spec = expanded(r#"{"modId":"woods","woodTypes":[{"id":"maple"}]}"#);
        let files = Mapper::default()
            .map(&spec, &[AssetKey::block("maple_sign"), AssetKey::block("maple_hanging_sign")])
            .unwrap();
        let p = paths(&files);
        assert!(p.contains(&"assets/woods/textures/entity/signs/maple.png"));
        assert!(p.contains(&"assets/woods/textures/entity/signs/hanging/maple.png"));
        let entity = files.iter().find(|f| f.path.ends_with("signs/maple.png")).unwrap();
        assert_eq!(entity.metadata.as_ref().unwrap().width, 64);
    }

    #[test]
    fn test_unknown_key_fails_loudly() {
        let spec = expanded(r#"{"modId":"gems","items":[{"id":"ruby"}]}"#);
        let err = Mapper::default().map(&spec, &[AssetKey::item("sapphire")]).unwrap_err();
        assert!(matches!(err, MapError::UnknownKey { kind: "item", .. }));
    }

    #[test]
    fn test_output_is_sorted_and_stable() {
        let spec = expanded(r#"{"modId":"woods","woodTypes":[{"id":"maple"}],"items":[{"id":"sap"}]}"#);
        let mapper = Mapper::default();
        let a = mapper.map(&spec, &spec.asset_keys()).unwrap();
        let mut reversed = spec.asset_keys();
        reversed.reverse();
        let b = mapper.map(&spec, &reversed).unwrap();
        assert_eq!(a, b);
        assert!(a.windows(2).all(|w| w[0].path < w[1].path));
    }
}
