//! Specification IR - Raw Input and the Expand-With-Defaults Pass
//!
//! The raw specification is whatever the interpretation layer produced:
//! optional fields everywhere. [`expand`] validates it once and produces an
//! [`ExpandedSpec`] in which every field is populated, wood families are
//! unrolled into their fifteen members, and every recipe has an id.
//! Downstream code never asks "is this field present".

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::classify::{self, Archetype, MaterialClass};
use crate::profile::{derive_profile, ProfileOverride, TextureProfile};
use crate::templates::BlockShape;

pub const MAX_ID_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("Malformed specification: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid mod id '{0}': expected [a-z][a-z0-9_]{{1,63}}")]
    InvalidModId(String),

    #[error("Invalid id '{id}': {reason}")]
    InvalidId { id: String, reason: String },

    #[error("Duplicate id '{0}'")]
    DuplicateId(String),

    #[error("Duplicate recipe id '{0}'")]
    DuplicateRecipe(String),

    #[error("Invalid color '{value}' on '{id}': expected #rrggbb")]
    InvalidColor { id: String, value: String },

    #[error("Recipe '{recipe}' references unknown local id '{reference}'")]
    UnknownReference { recipe: String, reference: String },

    #[error("Recipe '{recipe}': {reason}")]
    InvalidRecipe { recipe: String, reason: String },
}

// --- Raw input ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModSpec {
    pub mod_id: String,
    #[serde(default)]
    pub items: Vec<EntitySpec>,
    #[serde(default)]
    pub blocks: Vec<BlockSpec>,
    #[serde(default)]
    pub wood_types: Vec<WoodTypeSpec>,
    #[serde(default)]
    pub recipes: Vec<RecipeSpec>,
}

impl ModSpec {
    pub fn from_json(text: &str) -> Result<Self, SpecError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySpec {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub texture_profile: Option<ProfileOverride>,
    #[serde(default)]
    pub vanilla_template: Option<String>,
    #[serde(default)]
    pub copy_from_vanilla: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSpec {
    #[serde(flatten)]
    pub entity: EntitySpec,
    #[serde(default)]
    pub drops_nothing: bool,
    #[serde(default)]
    pub shape: Option<BlockShape>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WoodTypeSpec {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecipeSpec {
    Shaped(ShapedSpec),
    Shapeless(ShapelessSpec),
    Smelting(CookingSpec),
    Blasting(CookingSpec),
    Smoking(CookingSpec),
    CampfireCooking(CookingSpec),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapedSpec {
    #[serde(default)]
    pub id: Option<String>,
    pub pattern: Vec<String>,
    pub key: BTreeMap<char, String>,
    pub result: String,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub category: Option<CraftingCategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapelessSpec {
    #[serde(default)]
    pub id: Option<String>,
    pub ingredients: Vec<String>,
    pub result: String,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub category: Option<CraftingCategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookingSpec {
    #[serde(default)]
    pub id: Option<String>,
    pub ingredient: String,
    pub result: String,
    #[serde(default = "default_experience")]
    pub experience: f64,
    #[serde(default)]
    pub cooking_time: Option<u32>,
    #[serde(default)]
    pub category: Option<CookingCategory>,
}

fn default_count() -> u32 { 1 }
fn default_experience() -> f64 { 0.1 }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CraftingCategory {
    Building,
    Redstone,
    Equipment,
    Misc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CookingCategory {
    Food,
    Blocks,
    Misc,
}

// --- Expanded IR ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Item,
    Block,
}

impl AssetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Block => "block",
        }
    }
}

/// The unit the mapper resolves into files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetKey {
    pub kind: AssetKind,
    pub id: String,
}

impl AssetKey {
    pub fn item(id: &str) -> Self {
        Self { kind: AssetKind::Item, id: id.to_string() }
    }

    pub fn block(id: &str) -> Self {
        Self { kind: AssetKind::Block, id: id.to_string() }
    }
}

/// Where a texture's pixels come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum TextureSource {
    Procedural,
    /// Walk this vanilla block's blockstate/model graph and re-theme the
    /// textures it references.
    VanillaTemplate(String),
    /// Copy these vanilla texture locations directly (first readable wins).
    CopyFromVanilla(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedEntity {
    pub id: String,
    pub display_name: String,
    pub material_class: MaterialClass,
    pub profile: TextureProfile,
    pub archetype: Archetype,
    pub color: Option<[u8; 3]>,
    pub texture_source: TextureSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedBlock {
    #[serde(flatten)]
    pub entity: ExpandedEntity,
    pub shape: BlockShape,
    pub drops_nothing: bool,
    /// Source for the flat inventory sprite of shapes that render as
    /// `item/generated` (doors, signs).
    pub item_texture_source: TextureSource,
    /// Source for the sign entity texture; `None` for non-sign shapes.
    pub entity_texture_source: Option<TextureSource>,
    /// Wood family this block was expanded from.
    pub family: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WoodFamily {
    pub id: String,
    pub display_name: String,
    /// Member block ids in the fixed family order.
    pub members: Vec<String>,
}

impl WoodFamily {
    pub fn member(&self, role: WoodRole) -> String {
        role.block_id(&self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CookingKind {
    Smelting,
    Blasting,
    Smoking,
    CampfireCooking,
}

impl CookingKind {
    pub fn type_id(self) -> &'static str {
        match self {
            Self::Smelting => "minecraft:smelting",
            Self::Blasting => "minecraft:blasting",
            Self::Smoking => "minecraft:smoking",
            Self::CampfireCooking => "minecraft:campfire_cooking",
        }
    }

    pub fn default_time(self) -> u32 {
        match self {
            Self::Smelting => 200,
            Self::Blasting | Self::Smoking => 100,
            Self::CampfireCooking => 600,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Smelting => "smelting",
            Self::Blasting => "blasting",
            Self::Smoking => "smoking",
            Self::CampfireCooking => "campfire_cooking",
        }
    }
}

/// A recipe with every default applied. Ingredient and result strings are
/// still as written (local or namespaced); emitters qualify them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Recipe {
    Shaped {
        id: String,
        category: CraftingCategory,
        pattern: Vec<String>,
        key: BTreeMap<char, String>,
        result: String,
        count: u32,
    },
    Shapeless {
        id: String,
        category: CraftingCategory,
        ingredients: Vec<String>,
        result: String,
        count: u32,
    },
    Cooking {
        id: String,
        kind: CookingKind,
        category: CookingCategory,
        ingredient: String,
        result: String,
        experience: f64,
        cooking_time: u32,
    },
}

impl Recipe {
    pub fn id(&self) -> &str {
        match self {
            Self::Shaped { id, .. } | Self::Shapeless { id, .. } | Self::Cooking { id, .. } => id,
        }
    }

    fn references(&self) -> Vec<&str> {
        match self {
            Self::Shaped { key, result, .. } => {
                key.values().map(String::as_str).chain(std::iter::once(result.as_str())).collect()
            }
            Self::Shapeless { ingredients, result, .. } => {
                ingredients.iter().map(String::as_str).chain(std::iter::once(result.as_str())).collect()
            }
            Self::Cooking { ingredient, result, .. } => vec![ingredient.as_str(), result.as_str()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedSpec {
    pub mod_id: String,
    pub items: Vec<ExpandedEntity>,
    pub blocks: Vec<ExpandedBlock>,
    pub wood_families: Vec<WoodFamily>,
    pub recipes: Vec<Recipe>,
}

impl ExpandedSpec {
    /// Every asset key the specification declares, items first, in
    /// declaration order.
    pub fn asset_keys(&self) -> Vec<AssetKey> {
        self.items
            .iter()
            .map(|i| AssetKey::item(&i.id))
            .chain(self.blocks.iter().map(|b| AssetKey::block(&b.entity.id)))
            .collect()
    }

    pub fn item(&self, id: &str) -> Option<&ExpandedEntity> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn block(&self, id: &str) -> Option<&ExpandedBlock> {
        self.blocks.iter().find(|b| b.entity.id == id)
    }

    pub fn block_ids(&self) -> Vec<String> {
        self.blocks.iter().map(|b| b.entity.id.clone()).collect()
    }

    /// Blocks that intentionally have no loot table.
    pub fn no_drop_ids(&self) -> Vec<String> {
        self.blocks
            .iter()
            .filter(|b| b.drops_nothing)
            .map(|b| b.entity.id.clone())
            .collect()
    }
}

// --- Id rules ---

pub fn validate_id(id: &str) -> Result<(), SpecError> {
    let fail = |reason: &str| SpecError::InvalidId { id: id.to_string(), reason: reason.to_string() };
    if id.is_empty() {
        return Err(fail("empty"));
    }
    if id.len() > MAX_ID_LEN {
        return Err(fail("longer than 64 characters"));
    }
    let mut chars = id.chars();
    if !chars.next().is_some_and(|c| c.is_ascii_lowercase()) {
        return Err(fail("must start with a lowercase letter"));
    }
    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
        return Err(fail("only lowercase letters, digits and '_' are allowed"));
    }
    Ok(())
}

pub fn validate_mod_id(id: &str) -> Result<(), SpecError> {
    if id.len() < 2 || validate_id(id).is_err() {
        return Err(SpecError::InvalidModId(id.to_string()));
    }
    Ok(())
}

/// "ruby_block" -> "Ruby Block"
pub fn title_case(id: &str) -> String {
    id.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut c = w.chars();
            match c.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + c.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn parse_color(id: &str, value: &str) -> Result<[u8; 3], SpecError> {
    let bad = || SpecError::InvalidColor { id: id.to_string(), value: value.to_string() };
    let hex = value.strip_prefix('#').ok_or_else(bad)?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(bad());
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| bad());
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

// --- Wood families ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WoodRole {
    Log,
    Wood,
    StrippedLog,
    StrippedWood,
    Planks,
    Stairs,
    Slab,
    Fence,
    FenceGate,
    Door,
    Trapdoor,
    PressurePlate,
    Button,
    Sign,
    HangingSign,
}

impl WoodRole {
    pub const ALL: [WoodRole; 15] = [
        WoodRole::Log,
        WoodRole::Wood,
        WoodRole::StrippedLog,
        WoodRole::StrippedWood,
        WoodRole::Planks,
        WoodRole::Stairs,
        WoodRole::Slab,
        WoodRole::Fence,
        WoodRole::FenceGate,
        WoodRole::Door,
        WoodRole::Trapdoor,
        WoodRole::PressurePlate,
        WoodRole::Button,
        WoodRole::Sign,
        WoodRole::HangingSign,
    ];

    pub fn block_id(self, wood: &str) -> String {
        match self {
            Self::StrippedLog => format!("stripped_{}_log", wood),
            Self::StrippedWood => format!("stripped_{}_wood", wood),
            other => format!("{}_{}", wood, other.suffix()),
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Log | Self::StrippedLog => "log",
            Self::Wood | Self::StrippedWood => "wood",
            Self::Planks => "planks",
            Self::Stairs => "stairs",
            Self::Slab => "slab",
            Self::Fence => "fence",
            Self::FenceGate => "fence_gate",
            Self::Door => "door",
            Self::Trapdoor => "trapdoor",
            Self::PressurePlate => "pressure_plate",
            Self::Button => "button",
            Self::Sign => "sign",
            Self::HangingSign => "hanging_sign",
        }
    }

    pub fn shape(self) -> BlockShape {
        match self {
            Self::Log | Self::Wood | Self::StrippedLog | Self::StrippedWood => BlockShape::Column,
            Self::Planks => BlockShape::Cube,
            Self::Stairs => BlockShape::Stairs,
            Self::Slab => BlockShape::Slab,
            Self::Fence => BlockShape::Fence,
            Self::FenceGate => BlockShape::FenceGate,
            Self::Door => BlockShape::Door,
            Self::Trapdoor => BlockShape::Trapdoor,
            Self::PressurePlate => BlockShape::PressurePlate,
            Self::Button => BlockShape::Button,
            Self::Sign => BlockShape::Sign,
            Self::HangingSign => BlockShape::HangingSign,
        }
    }
}

/// Vanilla family every generated wood type is templated on.
const TEMPLATE_WOOD: &str = "oak";

fn expand_wood_family(spec: &WoodTypeSpec) -> (WoodFamily, Vec<ExpandedBlock>) {
    let display = spec.display_name.clone().unwrap_or_else(|| title_case(&spec.id));
    let mut blocks = Vec::new();

    for role in WoodRole::ALL {
        let id = role.block_id(&spec.id);
        let template = role.block_id(TEMPLATE_WOOD);
        let display_name = title_case(&id).replace(&title_case(&spec.id), &display);
        let shape = role.shape();

        let profile = derive_profile(&display_name, &id, Some("wood"), MaterialClass::Wood);
        let item_texture_source = match shape {
            BlockShape::Door | BlockShape::Sign | BlockShape::HangingSign => {
                TextureSource::CopyFromVanilla(vec![format!("minecraft:item/{}", template)])
            }
            _ => TextureSource::Procedural,
        };
        let entity_texture_source = match shape {
            BlockShape::Sign => Some(TextureSource::CopyFromVanilla(vec![format!(
                "minecraft:entity/signs/{}",
                TEMPLATE_WOOD
            )])),
            BlockShape::HangingSign => Some(TextureSource::CopyFromVanilla(vec![format!(
                "minecraft:entity/signs/hanging/{}",
                TEMPLATE_WOOD
            )])),
            _ => None,
        };

        blocks.push(ExpandedBlock {
            entity: ExpandedEntity {
                archetype: classify::archetype(&id, &display_name),
                id,
                display_name,
                material_class: MaterialClass::Wood,
                profile,
                color: None,
                texture_source: TextureSource::VanillaTemplate(template),
            },
            shape,
            drops_nothing: false,
            item_texture_source,
            entity_texture_source,
            family: Some(spec.id.clone()),
        });
    }

    let family = WoodFamily {
        id: spec.id.clone(),
        display_name: display,
        members: blocks.iter().map(|b| b.entity.id.clone()).collect(),
    };
    (family, blocks)
}

fn shaped(
    id: String,
    category: CraftingCategory,
    pattern: &[&str],
    key: &[(char, &str)],
    result: &str,
    count: u32,
) -> Recipe {
    Recipe::Shaped {
        id,
        category,
        pattern: pattern.iter().map(|s| s.to_string()).collect(),
        key: key.iter().map(|(c, v)| (*c, v.to_string())).collect(),
        result: result.to_string(),
        count,
    }
}

fn wood_recipes(family: &WoodFamily) -> Vec<Recipe> {
    let w = &family.id;
    let planks = family.member(WoodRole::Planks);
    let log = family.member(WoodRole::Log);
    let stripped_log = family.member(WoodRole::StrippedLog);
    let slab = family.member(WoodRole::Slab);
    let logs_tag = format!("#{}_logs", w);

    let member = |role: WoodRole| family.member(role);
    use CraftingCategory::{Building, Equipment, Misc, Redstone};

    let mut recipes = vec![
        Recipe::Shapeless {
            id: planks.clone(),
            category: Building,
            ingredients: vec![logs_tag],
            result: planks.clone(),
            count: 4,
        },
        shaped(member(WoodRole::Wood), Building, &["##", "##"], &[('#', log.as_str())], &member(WoodRole::Wood), 3),
        shaped(
            member(WoodRole::StrippedWood),
            Building,
            &["##", "##"],
            &[('#', stripped_log.as_str())],
            &member(WoodRole::StrippedWood),
            3,
        ),
        shaped(member(WoodRole::Stairs), Building, &["#  ", "## ", "###"], &[('#', planks.as_str())], &member(WoodRole::Stairs), 4),
        shaped(slab.clone(), Building, &["###"], &[('#', planks.as_str())], &slab, 6),
        shaped(
            member(WoodRole::Fence),
            Misc,
            &["W#W", "W#W"],
            &[('W', planks.as_str()), ('#', "minecraft:stick")],
            &member(WoodRole::Fence),
            3,
        ),
        shaped(
            member(WoodRole::FenceGate),
            Redstone,
            &["#W#", "#W#"],
            &[('#', "minecraft:stick"), ('W', planks.as_str())],
            &member(WoodRole::FenceGate),
            1,
        ),
        shaped(member(WoodRole::Door), Redstone, &["##", "##", "##"], &[('#', planks.as_str())], &member(WoodRole::Door), 3),
        shaped(member(WoodRole::Trapdoor), Redstone, &["###", "###"], &[('#', planks.as_str())], &member(WoodRole::Trapdoor), 2),
        shaped(
            member(WoodRole::PressurePlate),
            Redstone,
            &["##"],
            &[('#', planks.as_str())],
            &member(WoodRole::PressurePlate),
            1,
        ),
        Recipe::Shapeless {
            id: member(WoodRole::Button),
            category: Redstone,
            ingredients: vec![planks.clone()],
            result: member(WoodRole::Button),
            count: 1,
        },
        shaped(
            member(WoodRole::Sign),
            Misc,
            &["###", "###", " X "],
            &[('#', planks.as_str()), ('X', "minecraft:stick")],
            &member(WoodRole::Sign),
            3,
        ),
        shaped(
            member(WoodRole::HangingSign),
            Misc,
            &["X X", "###", "###"],
            &[('X', "minecraft:chain"), ('#', stripped_log.as_str())],
            &member(WoodRole::HangingSign),
            6,
        ),
    ];

    let from = |what: &str| format!("{}_from_{}", what, planks);
    recipes.extend([
        shaped(from("stick"), Misc, &["#", "#"], &[('#', planks.as_str())], "minecraft:stick", 4),
        shaped(from("crafting_table"), Misc, &["##", "##"], &[('#', planks.as_str())], "minecraft:crafting_table", 1),
        shaped(from("chest"), Misc, &["###", "# #", "###"], &[('#', planks.as_str())], "minecraft:chest", 1),
        shaped(
            from("barrel"),
            Misc,
            &["PSP", "P P", "PSP"],
            &[('P', planks.as_str()), ('S', slab.as_str())],
            "minecraft:barrel",
            1,
        ),
        shaped(from("bowl"), Misc, &["# #", " # "], &[('#', planks.as_str())], "minecraft:bowl", 4),
        shaped(
            from("shield"),
            Equipment,
            &["WiW", "WWW", " W "],
            &[('W', planks.as_str()), ('i', "minecraft:iron_ingot")],
            "minecraft:shield",
            1,
        ),
        shaped(
            from("wooden_pickaxe"),
            Equipment,
            &["###", " X ", " X "],
            &[('#', planks.as_str()), ('X', "minecraft:stick")],
            "minecraft:wooden_pickaxe",
            1,
        ),
        shaped(
            from("wooden_axe"),
            Equipment,
            &["##", "#X", " X"],
            &[('#', planks.as_str()), ('X', "minecraft:stick")],
            "minecraft:wooden_axe",
            1,
        ),
        shaped(
            from("wooden_shovel"),
            Equipment,
            &["#", "X", "X"],
            &[('#', planks.as_str()), ('X', "minecraft:stick")],
            "minecraft:wooden_shovel",
            1,
        ),
        shaped(
            from("wooden_hoe"),
            Equipment,
            &["##", " X", " X"],
            &[('#', planks.as_str()), ('X', "minecraft:stick")],
            "minecraft:wooden_hoe",
            1,
        ),
        shaped(
            from("wooden_sword"),
            Equipment,
            &["#", "#", "X"],
            &[('#', planks.as_str()), ('X', "minecraft:stick")],
            "minecraft:wooden_sword",
            1,
        ),
    ]);
    recipes
}

// --- Expansion ---

fn expand_entity(e: &EntitySpec) -> Result<ExpandedEntity, SpecError> {
    validate_id(&e.id)?;
    let display_name = e.display_name.clone().unwrap_or_else(|| title_case(&e.id));
    let material_class = classify::material_class(e.material.as_deref(), &e.id, &display_name);
    let mut profile = derive_profile(&display_name, &e.id, e.material.as_deref(), material_class);
    if let Some(o) = &e.texture_profile {
        profile = profile.with_override(o);
    }
    let color = e.color.as_deref().map(|c| parse_color(&e.id, c)).transpose()?;

    let texture_source = if !e.copy_from_vanilla.is_empty() {
        TextureSource::CopyFromVanilla(e.copy_from_vanilla.clone())
    } else if let Some(template) = &e.vanilla_template {
        validate_id(template)?;
        TextureSource::VanillaTemplate(template.clone())
    } else {
        TextureSource::Procedural
    };

    Ok(ExpandedEntity {
        archetype: classify::archetype(&e.id, &display_name),
        id: e.id.clone(),
        display_name,
        material_class,
        profile,
        color,
        texture_source,
    })
}

fn expand_block(b: &BlockSpec) -> Result<ExpandedBlock, SpecError> {
    let entity = expand_entity(&b.entity)?;
    let shape = b.shape.unwrap_or_else(|| classify::block_shape(&entity.id));
    let entity_texture_source = shape.is_sign().then_some(TextureSource::Procedural);
    Ok(ExpandedBlock {
        entity,
        shape,
        drops_nothing: b.drops_nothing,
        item_texture_source: TextureSource::Procedural,
        entity_texture_source,
        family: None,
    })
}

fn expand_recipe(r: &RecipeSpec) -> Recipe {
    match r {
        RecipeSpec::Shaped(s) => Recipe::Shaped {
            id: s.id.clone().unwrap_or_else(|| local_name(&s.result)),
            category: s.category.unwrap_or(CraftingCategory::Misc),
            pattern: s.pattern.clone(),
            key: s.key.clone(),
            result: s.result.clone(),
            count: s.count,
        },
        RecipeSpec::Shapeless(s) => Recipe::Shapeless {
            id: s.id.clone().unwrap_or_else(|| local_name(&s.result)),
            category: s.category.unwrap_or(CraftingCategory::Misc),
            ingredients: s.ingredients.clone(),
            result: s.result.clone(),
            count: s.count,
        },
        RecipeSpec::Smelting(c) => expand_cooking(c, CookingKind::Smelting),
        RecipeSpec::Blasting(c) => expand_cooking(c, CookingKind::Blasting),
        RecipeSpec::Smoking(c) => expand_cooking(c, CookingKind::Smoking),
        RecipeSpec::CampfireCooking(c) => expand_cooking(c, CookingKind::CampfireCooking),
    }
}

fn expand_cooking(c: &CookingSpec, kind: CookingKind) -> Recipe {
    Recipe::Cooking {
        id: c.id.clone().unwrap_or_else(|| format!("{}_from_{}", local_name(&c.result), kind.suffix())),
        kind,
        category: c.category.unwrap_or(CookingCategory::Misc),
        ingredient: c.ingredient.clone(),
        result: c.result.clone(),
        experience: c.experience,
        cooking_time: c.cooking_time.unwrap_or_else(|| kind.default_time()),
    }
}

/// "gems:ruby" -> "ruby", "#minecraft:logs" -> "logs"
fn local_name(reference: &str) -> String {
    let r = reference.trim_start_matches('#');
    r.rsplit(':').next().unwrap_or(r).to_string()
}

fn check_recipe(recipe: &Recipe, mod_id: &str, known: &BTreeSet<String>, local_tags: &BTreeSet<String>) -> Result<(), SpecError> {
    validate_id(recipe.id()).map_err(|_| SpecError::InvalidRecipe {
        recipe: recipe.id().to_string(),
        reason: "recipe id is not a valid slug".into(),
    })?;

    if let Recipe::Shaped { pattern, key, .. } = recipe {
        if pattern.is_empty() || pattern.len() > 3 || pattern.iter().any(|row| row.is_empty() || row.chars().count() > 3) {
            return Err(SpecError::InvalidRecipe {
                recipe: recipe.id().to_string(),
                reason: "pattern must be 1-3 rows of 1-3 characters".into(),
            });
        }
        for c in pattern.iter().flat_map(|row| row.chars()) {
            if c != ' ' && !key.contains_key(&c) {
                return Err(SpecError::InvalidRecipe {
                    recipe: recipe.id().to_string(),
                    reason: format!("pattern symbol '{}' has no key entry", c),
                });
            }
        }
    }

    for reference in recipe.references() {
        let (is_tag, name) = match reference.strip_prefix('#') {
            Some(rest) => (true, rest),
            None => (false, reference),
        };
        let local = match name.split_once(':') {
            Some((ns, path)) if ns == mod_id => path,
            Some(_) => continue,
            None => name,
        };
        let exists = if is_tag { local_tags.contains(local) } else { known.contains(local) };
        if !exists {
            return Err(SpecError::UnknownReference {
                recipe: recipe.id().to_string(),
                reference: reference.to_string(),
            });
        }
    }
    Ok(())
}

/// Validate the raw specification and apply every default.
pub fn expand(spec: &ModSpec) -> Result<ExpandedSpec, SpecError> {
    validate_mod_id(&spec.mod_id)?;

    let items = spec.items.iter().map(expand_entity).collect::<Result<Vec<_>, _>>()?;
    let mut blocks = spec.blocks.iter().map(expand_block).collect::<Result<Vec<_>, _>>()?;

    let mut wood_families = Vec::new();
    let mut recipes = Vec::new();
    for wood in &spec.wood_types {
        validate_id(&wood.id)?;
        let (family, members) = expand_wood_family(wood);
        for m in &members {
            validate_id(&m.entity.id)?;
        }
        blocks.extend(members);
        recipes.extend(wood_recipes(&family));
        wood_families.push(family);
    }
    recipes.extend(spec.recipes.iter().map(expand_recipe));

    let mut known = BTreeSet::new();
    for id in items.iter().map(|i| &i.id).chain(blocks.iter().map(|b| &b.entity.id)) {
        if !known.insert(id.clone()) {
            return Err(SpecError::DuplicateId(id.clone()));
        }
    }

    let local_tags: BTreeSet<String> = wood_families.iter().map(|f| format!("{}_logs", f.id)).collect();
    let mut recipe_ids = BTreeSet::new();
    for recipe in &recipes {
        if !recipe_ids.insert(recipe.id().to_string()) {
            return Err(SpecError::DuplicateRecipe(recipe.id().to_string()));
        }
        check_recipe(recipe, &spec.mod_id, &known, &local_tags)?;
    }

    Ok(ExpandedSpec {
        mod_id: spec.mod_id.clone(),
        items,
        blocks,
        wood_families,
        recipes,
    })
}
