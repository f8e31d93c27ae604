//! Template System - Per-Shape Model and Blockstate Contracts
//!
//! Every block shape owns a fixed set of model files (parent + texture slots)
//! and a blockstate layout. Shapes beyond a plain cube all need several
//! models and a property-driven blockstate, so they never fall back to the
//! single-texture cube template.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockShape {
    Cube,
    Column,
    Stairs,
    Slab,
    Fence,
    FenceGate,
    Door,
    Trapdoor,
    Button,
    PressurePlate,
    Sign,
    HangingSign,
}

impl BlockShape {
    pub const ALL: [BlockShape; 12] = [
        BlockShape::Cube,
        BlockShape::Column,
        BlockShape::Stairs,
        BlockShape::Slab,
        BlockShape::Fence,
        BlockShape::FenceGate,
        BlockShape::Door,
        BlockShape::Trapdoor,
        BlockShape::Button,
        BlockShape::PressurePlate,
        BlockShape::Sign,
        BlockShape::HangingSign,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Cube => "cube",
            Self::Column => "column",
            Self::Stairs => "stairs",
            Self::Slab => "slab",
            Self::Fence => "fence",
            Self::FenceGate => "fence_gate",
            Self::Door => "door",
            Self::Trapdoor => "trapdoor",
            Self::Button => "button",
            Self::PressurePlate => "pressure_plate",
            Self::Sign => "sign",
            Self::HangingSign => "hanging_sign",
        }
    }

    pub fn is_sign(self) -> bool {
        matches!(self, Self::Sign | Self::HangingSign)
    }
}

/// One texture slot in a model: slot name -> this block's texture with the
/// given suffix (`""` is the block's own texture).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub name: &'static str,
    pub texture_suffix: &'static str,
}

const fn slot(name: &'static str, texture_suffix: &'static str) -> Slot {
    Slot { name, texture_suffix }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelTemplate {
    /// Appended to the block id to form the model name.
    pub suffix: &'static str,
    /// Vanilla parent model, `None` for particle-only models (signs).
    pub parent: Option<&'static str>,
    pub slots: &'static [Slot],
}

const fn model(suffix: &'static str, parent: &'static str, slots: &'static [Slot]) -> ModelTemplate {
    ModelTemplate { suffix, parent: Some(parent), slots }
}

/// How the block's inventory item renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemRendering {
    /// Item model inherits from the block model with this suffix so the
    /// inventory icon matches the placed block.
    BlockModel(&'static str),
    /// Flat `item/generated` sprite with its own item texture.
    Generated,
}

#[derive(Debug, Clone, Copy)]
pub struct ShapeTemplate {
    pub shape: BlockShape,
    pub models: &'static [ModelTemplate],
    /// Block texture suffixes this shape needs (`""` = `<id>.png`).
    pub textures: &'static [&'static str],
    pub item: ItemRendering,
    /// Sign shapes additionally need an entity texture.
    pub entity_texture_dir: Option<&'static str>,
}

const OWN: &[Slot] = &[slot("all", "")];
const COLUMN: &[Slot] = &[slot("end", "_top"), slot("side", "")];
const BOTTOM_TOP_SIDE: &[Slot] = &[slot("bottom", ""), slot("top", ""), slot("side", "")];
const TEXTURE: &[Slot] = &[slot("texture", "")];
const DOOR: &[Slot] = &[slot("bottom", "_bottom"), slot("top", "_top")];
const PARTICLE: &[Slot] = &[slot("particle", "")];

const CUBE: ShapeTemplate = ShapeTemplate {
    shape: BlockShape::Cube,
    models: &[model("", "minecraft:block/cube_all", OWN)],
    textures: &[""],
    item: ItemRendering::BlockModel(""),
    entity_texture_dir: None,
};

const COLUMN_TEMPLATE: ShapeTemplate = ShapeTemplate {
    shape: BlockShape::Column,
    models: &[
        model("", "minecraft:block/cube_column", COLUMN),
        model("_horizontal", "minecraft:block/cube_column_horizontal", COLUMN),
    ],
    textures: &["", "_top"],
    item: ItemRendering::BlockModel(""),
    entity_texture_dir: None,
};

const STAIRS: ShapeTemplate = ShapeTemplate {
    shape: BlockShape::Stairs,
    models: &[
        model("", "minecraft:block/stairs", BOTTOM_TOP_SIDE),
        model("_inner", "minecraft:block/inner_stairs", BOTTOM_TOP_SIDE),
        model("_outer", "minecraft:block/outer_stairs", BOTTOM_TOP_SIDE),
    ],
    textures: &[""],
    item: ItemRendering::BlockModel(""),
    entity_texture_dir: None,
};

const SLAB: ShapeTemplate = ShapeTemplate {
    shape: BlockShape::Slab,
    models: &[
        model("", "minecraft:block/slab", BOTTOM_TOP_SIDE),
        model("_top", "minecraft:block/slab_top", BOTTOM_TOP_SIDE),
        model("_double", "minecraft:block/cube_all", OWN),
    ],
    textures: &[""],
    item: ItemRendering::BlockModel(""),
    entity_texture_dir: None,
};

const FENCE: ShapeTemplate = ShapeTemplate {
    shape: BlockShape::Fence,
    models: &[
        model("_post", "minecraft:block/fence_post", TEXTURE),
        model("_side", "minecraft:block/fence_side", TEXTURE),
        model("_inventory", "minecraft:block/fence_inventory", TEXTURE),
    ],
    textures: &[""],
    item: ItemRendering::BlockModel("_inventory"),
    entity_texture_dir: None,
};

const FENCE_GATE: ShapeTemplate = ShapeTemplate {
    shape: BlockShape::FenceGate,
    models: &[
        model("", "minecraft:block/template_fence_gate", TEXTURE),
        model("_open", "minecraft:block/template_fence_gate_open", TEXTURE),
        model("_wall", "minecraft:block/template_fence_gate_wall", TEXTURE),
        model("_wall_open", "minecraft:block/template_fence_gate_wall_open", TEXTURE),
    ],
    textures: &[""],
    item: ItemRendering::BlockModel(""),
    entity_texture_dir: None,
};

const DOOR_TEMPLATE: ShapeTemplate = ShapeTemplate {
    shape: BlockShape::Door,
    models: &[
        model("_bottom_left", "minecraft:block/door_bottom_left", DOOR),
        model("_bottom_left_open", "minecraft:block/door_bottom_left_open", DOOR),
        model("_bottom_right", "minecraft:block/door_bottom_right", DOOR),
        model("_bottom_right_open", "minecraft:block/door_bottom_right_open", DOOR),
        model("_top_left", "minecraft:block/door_top_left", DOOR),
        model("_top_left_open", "minecraft:block/door_top_left_open", DOOR),
        model("_top_right", "minecraft:block/door_top_right", DOOR),
        model("_top_right_open", "minecraft:block/door_top_right_open", DOOR),
    ],
    textures: &["_bottom", "_top"],
    item: ItemRendering::Generated,
    entity_texture_dir: None,
};

const TRAPDOOR: ShapeTemplate = ShapeTemplate {
    shape: BlockShape::Trapdoor,
    models: &[
        model("_bottom", "minecraft:block/template_orientable_trapdoor_bottom", TEXTURE),
        model("_top", "minecraft:block/template_orientable_trapdoor_top", TEXTURE),
        model("_open", "minecraft:block/template_orientable_trapdoor_open", TEXTURE),
    ],
    textures: &[""],
    item: ItemRendering::BlockModel("_bottom"),
    entity_texture_dir: None,
};

const BUTTON: ShapeTemplate = ShapeTemplate {
    shape: BlockShape::Button,
    models: &[
        model("", "minecraft:block/button", TEXTURE),
        model("_pressed", "minecraft:block/button_pressed", TEXTURE),
        model("_inventory", "minecraft:block/button_inventory", TEXTURE),
    ],
    textures: &[""],
    item: ItemRendering::BlockModel("_inventory"),
    entity_texture_dir: None,
};

const PRESSURE_PLATE: ShapeTemplate = ShapeTemplate {
    shape: BlockShape::PressurePlate,
    models: &[
        model("", "minecraft:block/pressure_plate_up", TEXTURE),
        model("_down", "minecraft:block/pressure_plate_down", TEXTURE),
    ],
    textures: &[""],
    item: ItemRendering::BlockModel(""),
    entity_texture_dir: None,
};

const SIGN: ShapeTemplate = ShapeTemplate {
    shape: BlockShape::Sign,
    models: &[ModelTemplate { suffix: "", parent: None, slots: PARTICLE }],
    textures: &[""],
    item: ItemRendering::Generated,
    entity_texture_dir: Some("entity/signs"),
};

const HANGING_SIGN: ShapeTemplate = ShapeTemplate {
    shape: BlockShape::HangingSign,
    models: &[ModelTemplate { suffix: "", parent: None, slots: PARTICLE }],
    textures: &[""],
    item: ItemRendering::Generated,
    entity_texture_dir: Some("entity/signs/hanging"),
};

/// Template registry - one template per shape
pub struct TemplateRegistry {
    templates: BTreeMap<BlockShape, ShapeTemplate>,
}

impl TemplateRegistry {
    pub fn builtin() -> Self {
        let templates = [
            CUBE,
            COLUMN_TEMPLATE,
            STAIRS,
            SLAB,
            FENCE,
            FENCE_GATE,
            DOOR_TEMPLATE,
            TRAPDOOR,
            BUTTON,
            PRESSURE_PLATE,
            SIGN,
            HANGING_SIGN,
        ]
        .into_iter()
        .map(|t| (t.shape, t))
        .collect();
        Self { templates }
    }

    pub fn get(&self, shape: BlockShape) -> &ShapeTemplate {
        // builtin() covers every BlockShape variant
        self.templates.get(&shape).unwrap_or(&CUBE)
    }

    pub fn list(&self) -> Vec<&ShapeTemplate> {
        self.templates.values().collect()
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ShapeTemplate {
    /// Render every block model for `id` as `(model name, json)`.
    pub fn render_models(&self, mod_id: &str, id: &str) -> Vec<(String, Value)> {
        self.models
            .iter()
            .map(|m| {
                let mut textures = Map::new();
                for s in m.slots {
                    textures.insert(
                        s.name.to_string(),
                        Value::String(format!("{}:block/{}{}", mod_id, id, s.texture_suffix)),
                    );
                }
                let mut body = Map::new();
                if let Some(parent) = m.parent {
                    body.insert("parent".into(), Value::String(parent.into()));
                }
                body.insert("textures".into(), Value::Object(textures));
                (format!("{}{}", id, m.suffix), Value::Object(body))
            })
            .collect()
    }

    /// Render the blockstate for `id`.
    pub fn render_blockstate(&self, mod_id: &str, id: &str) -> Value {
        let m = |suffix: &str| format!("{}:block/{}{}", mod_id, id, suffix);
        match self.shape {
            BlockShape::Cube | BlockShape::Sign | BlockShape::HangingSign => {
                json!({ "variants": { "": { "model": m("") } } })
            }
            BlockShape::Column => json!({
                "variants": {
                    "axis=x": variant(&m("_horizontal"), 90, 90, false),
                    "axis=y": variant(&m(""), 0, 0, false),
                    "axis=z": variant(&m("_horizontal"), 90, 0, false),
                }
            }),
            BlockShape::Slab => json!({
                "variants": {
                    "type=bottom": variant(&m(""), 0, 0, false),
                    "type=double": variant(&m("_double"), 0, 0, false),
                    "type=top": variant(&m("_top"), 0, 0, false),
                }
            }),
            BlockShape::PressurePlate => json!({
                "variants": {
                    "powered=false": variant(&m(""), 0, 0, false),
                    "powered=true": variant(&m("_down"), 0, 0, false),
                }
            }),
            BlockShape::Stairs => stairs_variants(&m),
            BlockShape::Fence => fence_multipart(&m),
            BlockShape::FenceGate => fence_gate_variants(&m),
            BlockShape::Door => door_variants(&m),
            BlockShape::Trapdoor => trapdoor_variants(&m),
            BlockShape::Button => button_variants(&m),
        }
    }
}

/// `maple_hanging_sign` -> `maple`, `ruby_sign` -> `ruby`
pub fn sign_material(id: &str) -> &str {
    id.strip_suffix("_hanging_sign")
        .or_else(|| id.strip_suffix("_sign"))
        .unwrap_or(id)
}

impl ShapeTemplate {
    /// Entity texture location (`<mod>:entity/signs/<material>`) for sign
    /// shapes, `None` for everything else.
    pub fn entity_texture(&self, mod_id: &str, id: &str) -> Option<String> {
        self.entity_texture_dir
            .map(|dir| format!("{}:{}/{}", mod_id, dir, sign_material(id)))
    }

    /// Item model JSON for this shape.
    pub fn render_item_model(&self, mod_id: &str, id: &str) -> Value {
        match self.item {
            ItemRendering::BlockModel(suffix) => json!({ "parent": format!("{}:block/{}{}", mod_id, id, suffix) }),
            ItemRendering::Generated => json!({
                "parent": "minecraft:item/generated",
                "textures": { "layer0": format!("{}:item/{}", mod_id, id) }
            }),
        }
    }
}

const FACINGS: [&str; 4] = ["east", "north", "south", "west"];

fn variant(model: &str, x: u32, y: u32, uvlock: bool) -> Value {
    let mut v = Map::new();
    v.insert("model".into(), Value::String(model.into()));
    if x != 0 {
        v.insert("x".into(), json!(x));
    }
    if y != 0 {
        v.insert("y".into(), json!(y));
    }
    if uvlock {
        v.insert("uvlock".into(), Value::Bool(true));
    }
    Value::Object(v)
}

/// Rotation for models authored facing east.
fn east_based_y(facing: &str) -> u32 {
    match facing {
        "south" => 90,
        "west" => 180,
        "north" => 270,
        _ => 0,
    }
}

/// Rotation for models authored facing north.
fn north_based_y(facing: &str) -> u32 {
    match facing {
        "east" => 90,
        "south" => 180,
        "west" => 270,
        _ => 0,
    }
}

fn stairs_variants(m: &dyn Fn(&str) -> String) -> Value {
    let mut variants = Map::new();
    for facing in FACINGS {
        for half in ["bottom", "top"] {
            for shape in ["inner_left", "inner_right", "outer_left", "outer_right", "straight"] {
                let model = match shape {
                    "straight" => m(""),
                    s if s.starts_with("inner") => m("_inner"),
                    _ => m("_outer"),
                };
                let base = east_based_y(facing);
                let left = shape.ends_with("_left");
                let y = match (half, left, shape == "straight") {
                    ("bottom", true, _) => base + 270,
                    ("bottom", false, _) => base,
                    (_, true, _) | (_, _, true) => base,
                    _ => base + 90,
                } % 360;
                let x = if half == "top" { 180 } else { 0 };
                variants.insert(
                    format!("facing={},half={},shape={}", facing, half, shape),
                    variant(&model, x, y, x != 0 || y != 0),
                );
            }
        }
    }
    json!({ "variants": variants })
}

fn fence_multipart(m: &dyn Fn(&str) -> String) -> Value {
    let mut parts = vec![json!({ "apply": { "model": m("_post") } })];
    for (side, y) in [("north", 0), ("east", 90), ("south", 180), ("west", 270)] {
        parts.push(json!({
            "when": { side: "true" },
            "apply": variant(&m("_side"), 0, y, true),
        }));
    }
    json!({ "multipart": parts })
}

fn fence_gate_variants(m: &dyn Fn(&str) -> String) -> Value {
    let mut variants = Map::new();
    for facing in FACINGS {
        let y = match facing {
            "west" => 90,
            "north" => 180,
            "east" => 270,
            _ => 0,
        };
        for in_wall in [false, true] {
            for open in [false, true] {
                let suffix = match (in_wall, open) {
                    (false, false) => "",
                    (false, true) => "_open",
                    (true, false) => "_wall",
                    (true, true) => "_wall_open",
                };
                variants.insert(
                    format!("facing={},in_wall={},open={}", facing, in_wall, open),
                    variant(&m(suffix), 0, y, true),
                );
            }
        }
    }
    json!({ "variants": variants })
}

fn door_variants(m: &dyn Fn(&str) -> String) -> Value {
    let mut variants = Map::new();
    for facing in FACINGS {
        for half in ["lower", "upper"] {
            for hinge in ["left", "right"] {
                for open in [false, true] {
                    let part = if half == "lower" { "bottom" } else { "top" };
                    let suffix = format!("_{}_{}{}", part, hinge, if open { "_open" } else { "" });
                    let base = east_based_y(facing);
                    let y = match (open, hinge) {
                        (false, _) => base,
                        (true, "left") => base + 90,
                        (true, _) => base + 270,
                    } % 360;
                    variants.insert(
                        format!("facing={},half={},hinge={},open={}", facing, half, hinge, open),
                        variant(&m(&suffix), 0, y, false),
                    );
                }
            }
        }
    }
    json!({ "variants": variants })
}

fn trapdoor_variants(m: &dyn Fn(&str) -> String) -> Value {
    let mut variants = Map::new();
    for facing in FACINGS {
        for half in ["bottom", "top"] {
            for open in [false, true] {
                let y = north_based_y(facing);
                let (suffix, x, y) = match (half, open) {
                    (_, false) => (if half == "bottom" { "_bottom" } else { "_top" }, 0, y),
                    ("bottom", true) => ("_open", 0, y),
                    _ => ("_open", 180, (y + 180) % 360),
                };
                variants.insert(
                    format!("facing={},half={},open={}", facing, half, open),
                    variant(&m(suffix), x, y, false),
                );
            }
        }
    }
    json!({ "variants": variants })
}

fn button_variants(m: &dyn Fn(&str) -> String) -> Value {
    let mut variants = Map::new();
    for face in ["ceiling", "floor", "wall"] {
        for facing in FACINGS {
            for powered in [false, true] {
                let model = m(if powered { "_pressed" } else { "" });
                let y = north_based_y(facing);
                let (x, y, uvlock) = match face {
                    "floor" => (0, y, false),
                    "wall" => (90, y, true),
                    _ => (180, (y + 180) % 360, false),
                };
                variants.insert(
                    format!("face={},facing={},powered={}", face, facing, powered),
                    variant(&model, x, y, uvlock),
                );
            }
        }
    }
    json!({ "variants": variants })
}
