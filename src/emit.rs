//! Recipe / Tag / Loot / Language Emitters
//!
//! Pure functions from the expanded specification to finished JSON files.
//! Data folders follow the [`FolderConvention`] of the target runtime; field
//! names and nesting are the runtime's contract and are written out
//! literally.

use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::classify::MaterialClass;
use crate::config::FolderConvention;
use crate::mapper::MaterializedFile;
use crate::spec::{AssetKind, ExpandedSpec, Recipe, WoodFamily, WoodRole};
use crate::templates::BlockShape;

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("Cooking recipe '{recipe}' turns {item} into itself")]
    SelfLoop { recipe: String, item: String },

    #[error("Cooking recipe '{recipe}' needs an item ingredient, got tag {tag}")]
    TagResult { recipe: String, tag: String },

    #[error("Failed to serialize {path}: {source}")]
    Serialize {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Two-space pretty JSON with a trailing newline.
pub fn pretty_json(value: &Value) -> Result<String, serde_json::Error> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    Ok(text)
}

fn file(path: String, value: &Value) -> Result<MaterializedFile, EmitError> {
    let text = pretty_json(value).map_err(|source| EmitError::Serialize { path: path.clone(), source })?;
    Ok(MaterializedFile::text(path, text))
}

// --- Paths ---

pub fn recipe_path(folders: &FolderConvention, mod_id: &str, id: &str) -> String {
    format!("data/{}/{}/{}.json", mod_id, folders.recipe, id)
}

pub fn loot_table_path(folders: &FolderConvention, mod_id: &str, block_id: &str) -> String {
    format!("data/{}/{}/blocks/{}.json", mod_id, folders.loot_table, block_id)
}

pub fn tag_path(folders: &FolderConvention, namespace: &str, kind: AssetKind, tag: &str) -> String {
    let folder = match kind {
        AssetKind::Block => folders.block_tags,
        AssetKind::Item => folders.item_tags,
    };
    format!("data/{}/{}/{}.json", namespace, folder, tag)
}

pub fn lang_path(mod_id: &str) -> String {
    format!("assets/{}/lang/en_us.json", mod_id)
}

// --- Ingredients ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ingredient {
    Item(String),
    Tag(String),
}

impl Ingredient {
    pub fn to_json(&self) -> Value {
        match self {
            Self::Item(id) => json!({ "item": id }),
            Self::Tag(id) => json!({ "tag": id }),
        }
    }
}

fn qualify_id(mod_id: &str, id: &str) -> String {
    if id.contains(':') {
        id.to_string()
    } else {
        format!("{}:{}", mod_id, id)
    }
}

/// `ruby` -> `gems:ruby`, `minecraft:stick` unchanged, `#planks` ->
/// tag `gems:planks`.
pub fn qualify(mod_id: &str, reference: &str) -> Ingredient {
    match reference.strip_prefix('#') {
        Some(tag) => Ingredient::Tag(qualify_id(mod_id, tag)),
        None => Ingredient::Item(qualify_id(mod_id, reference)),
    }
}

// --- Recipes ---

pub fn recipe_json(mod_id: &str, recipe: &Recipe) -> Result<Value, EmitError> {
    Ok(match recipe {
        Recipe::Shaped { category, pattern, key, result, count, .. } => {
            let key: Map<String, Value> = key
                .iter()
                .map(|(c, v)| (c.to_string(), qualify(mod_id, v).to_json()))
                .collect();
            json!({
                "type": "minecraft:crafting_shaped",
                "category": category,
                "pattern": pattern,
                "key": key,
                "result": { "id": qualify_id(mod_id, result), "count": count },
            })
        }
        Recipe::Shapeless { category, ingredients, result, count, .. } => {
            let ingredients: Vec<Value> = ingredients.iter().map(|i| qualify(mod_id, i).to_json()).collect();
            json!({
                "type": "minecraft:crafting_shapeless",
                "category": category,
                "ingredients": ingredients,
                "result": { "id": qualify_id(mod_id, result), "count": count },
            })
        }
        Recipe::Cooking { id, kind, category, ingredient, result, experience, cooking_time } => {
            let ingredient = qualify(mod_id, ingredient);
            let result = match qualify(mod_id, result) {
                Ingredient::Item(r) => r,
                Ingredient::Tag(tag) => return Err(EmitError::TagResult { recipe: id.clone(), tag }),
            };
            if ingredient == Ingredient::Item(result.clone()) {
                return Err(EmitError::SelfLoop { recipe: id.clone(), item: result });
            }
            json!({
                "type": kind.type_id(),
                "category": category,
                "ingredient": ingredient.to_json(),
                "result": { "id": result },
                "experience": experience,
                "cookingtime": cooking_time,
            })
        }
    })
}

pub fn recipe_files(spec: &ExpandedSpec, folders: &FolderConvention) -> Result<Vec<MaterializedFile>, EmitError> {
    spec.recipes
        .iter()
        .map(|r| file(recipe_path(folders, &spec.mod_id, r.id()), &recipe_json(&spec.mod_id, r)?))
        .collect()
}

// --- Loot tables ---

fn state_condition(block: &str, property: &str, value: &str) -> Value {
    json!({
        "condition": "minecraft:block_state_property",
        "block": block,
        "properties": { property: value },
    })
}

pub fn loot_table_json(mod_id: &str, block_id: &str, shape: BlockShape) -> Value {
    let name = qualify_id(mod_id, block_id);
    let mut entry = json!({ "type": "minecraft:item", "name": name });

    match shape {
        BlockShape::Door => {
            entry["conditions"] = json!([state_condition(&name, "half", "lower")]);
        }
        BlockShape::Slab => {
            entry["functions"] = json!([{
                "function": "minecraft:set_count",
                "add": false,
                "count": 2.0,
                "conditions": [state_condition(&name, "type", "double")],
            }]);
        }
        _ => {}
    }

    json!({
        "type": "minecraft:block",
        "pools": [{
            "rolls": 1.0,
            "bonus_rolls": 0.0,
            "entries": [entry],
            "conditions": [{ "condition": "minecraft:survives_explosion" }],
        }],
    })
}

/// One loot table per block, except blocks declared to drop nothing.
pub fn loot_table_files(spec: &ExpandedSpec, folders: &FolderConvention) -> Result<Vec<MaterializedFile>, EmitError> {
    spec.blocks
        .iter()
        .filter(|b| !b.drops_nothing)
        .map(|b| {
            file(
                loot_table_path(folders, &spec.mod_id, &b.entity.id),
                &loot_table_json(&spec.mod_id, &b.entity.id, b.shape),
            )
        })
        .collect()
}

// --- Tags ---

/// (namespace, kind, tag name) -> values
type TagSet = BTreeMap<(String, AssetKind, String), BTreeSet<String>>;

fn add(tags: &mut TagSet, namespace: &str, kind: AssetKind, tag: &str, value: String) {
    tags.entry((namespace.to_string(), kind, tag.to_string())).or_default().insert(value);
}

const BOTH: [AssetKind; 2] = [AssetKind::Block, AssetKind::Item];

fn family_tags(tags: &mut TagSet, mod_id: &str, family: &WoodFamily) {
    let q = |role: WoodRole| qualify_id(mod_id, &family.member(role));
    let logs_tag = format!("{}_logs", family.id);

    for kind in BOTH {
        for role in [WoodRole::Log, WoodRole::Wood, WoodRole::StrippedLog, WoodRole::StrippedWood] {
            add(tags, mod_id, kind, &logs_tag, q(role));
        }
        add(tags, "minecraft", kind, "logs_that_burn", format!("#{}:{}", mod_id, logs_tag));
        for (tag, role) in [
            ("planks", WoodRole::Planks),
            ("wooden_stairs", WoodRole::Stairs),
            ("wooden_slabs", WoodRole::Slab),
            ("wooden_fences", WoodRole::Fence),
            ("fence_gates", WoodRole::FenceGate),
            ("wooden_doors", WoodRole::Door),
            ("wooden_trapdoors", WoodRole::Trapdoor),
            ("wooden_buttons", WoodRole::Button),
            ("wooden_pressure_plates", WoodRole::PressurePlate),
        ] {
            add(tags, "minecraft", kind, tag, q(role));
        }
    }

    add(tags, "minecraft", AssetKind::Block, "standing_signs", q(WoodRole::Sign));
    add(tags, "minecraft", AssetKind::Block, "ceiling_hanging_signs", q(WoodRole::HangingSign));
    add(tags, "minecraft", AssetKind::Item, "signs", q(WoodRole::Sign));
    add(tags, "minecraft", AssetKind::Item, "hanging_signs", q(WoodRole::HangingSign));
}

fn mineable_tag(class: MaterialClass) -> Option<&'static str> {
    match class {
        MaterialClass::Wood => Some("mineable/axe"),
        MaterialClass::Stone | MaterialClass::Metal | MaterialClass::Crystal => Some("mineable/pickaxe"),
        MaterialClass::Food | MaterialClass::Generic => None,
    }
}

/// Additive tag merges. Every file uses `"replace": false` so the runtime's
/// own members are kept.
pub fn tag_files(spec: &ExpandedSpec, folders: &FolderConvention) -> Result<Vec<MaterializedFile>, EmitError> {
    let mut tags = TagSet::new();
    for family in &spec.wood_families {
        family_tags(&mut tags, &spec.mod_id, family);
    }
    for block in &spec.blocks {
        if let Some(tag) = mineable_tag(block.entity.material_class) {
            add(&mut tags, "minecraft", AssetKind::Block, tag, qualify_id(&spec.mod_id, &block.entity.id));
        }
    }

    tags.into_iter()
        .map(|((namespace, kind, tag), values)| {
            file(
                tag_path(folders, &namespace, kind, &tag),
                &json!({ "replace": false, "values": values.into_iter().collect::<Vec<_>>() }),
            )
        })
        .collect()
}

// --- Language ---

/// `en_us.json` covering every declared item and block, keys sorted.
pub fn lang_json(spec: &ExpandedSpec) -> Value {
    let mut entries = BTreeMap::new();
    for item in &spec.items {
        entries.insert(format!("item.{}.{}", spec.mod_id, item.id), item.display_name.clone());
    }
    for block in &spec.blocks {
        entries.insert(format!("block.{}.{}", spec.mod_id, block.entity.id), block.entity.display_name.clone());
    }
    json!(entries)
}

pub fn lang_file(spec: &ExpandedSpec) -> Result<MaterializedFile, EmitError> {
    file(lang_path(&spec.mod_id), &lang_json(spec))
}

/// Recipes, loot tables and tags, sorted by path.
pub fn data_files(spec: &ExpandedSpec, folders: &FolderConvention) -> Result<Vec<MaterializedFile>, EmitError> {
    let mut files = recipe_files(spec, folders)?;
    files.extend(loot_table_files(spec, folders)?);
    files.extend(tag_files(spec, folders)?);
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}
