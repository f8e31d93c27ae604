//! Rule-Based Classification
//!
//! Every classifier is an ordered table of (predicate, variant) rules. The
//! first matching rule wins. Tables are plain data so they can be tested on
//! their own, away from the mapper and the texture pipeline.

use serde::{Deserialize, Serialize};

use crate::templates::BlockShape;

/// A test applied to an id or a display name.
///
/// Word-based predicates split the subject on `_`, `-` and whitespace and
/// compare case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    Exact(&'static str),
    Prefix(&'static str),
    Suffix(&'static str),
    Contains(&'static str),
    Word(&'static str),
    WordPrefix(&'static str),
    Always,
}

impl Predicate {
    pub fn matches(&self, subject: &str) -> bool {
        match self {
            Self::Exact(s) => subject == *s,
            Self::Prefix(s) => subject.starts_with(s),
            Self::Suffix(s) => subject.ends_with(s),
            Self::Contains(s) => subject.contains(s),
            Self::Word(w) => words(subject).any(|t| t == *w),
            Self::WordPrefix(w) => words(subject).any(|t| t.starts_with(w)),
            Self::Always => true,
        }
    }
}

fn words(subject: &str) -> impl Iterator<Item = String> + '_ {
    subject
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
}

#[derive(Debug, Clone, Copy)]
pub struct Rule<T> {
    pub predicate: Predicate,
    pub variant: T,
}

impl<T> Rule<T> {
    pub const fn new(predicate: Predicate, variant: T) -> Self {
        Self { predicate, variant }
    }
}

/// Ordered rule table.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<T: 'static> {
    rules: &'static [Rule<T>],
}

impl<T: Copy + 'static> Classifier<T> {
    pub const fn new(rules: &'static [Rule<T>]) -> Self {
        Self { rules }
    }

    pub fn classify(&self, subject: &str) -> Option<T> {
        self.rules
            .iter()
            .find(|rule| rule.predicate.matches(subject))
            .map(|rule| rule.variant)
    }

    /// All distinct variants whose predicate matches, in table order.
    pub fn classify_all(&self, subject: &str) -> Vec<T>
    where
        T: PartialEq,
    {
        let mut out: Vec<T> = Vec::new();
        for rule in self.rules {
            if rule.predicate.matches(subject) && !out.contains(&rule.variant) {
                out.push(rule.variant);
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialClass {
    Wood,
    Stone,
    Metal,
    Food,
    Crystal,
    Generic,
}

/// Descriptive rendering hints. Never affects paths or keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Archetype {
    Emissive,
    Glow,
    Translucent,
    Plain,
}

// Order matters: longer suffixes that share a tail with shorter ones
// (`_hanging_sign`/`_sign`, `_fence_gate`/`_fence`, `_trapdoor`/`_door`)
// must come first.
const SHAPE_RULES: &[Rule<BlockShape>] = &[
    Rule::new(Predicate::Suffix("_hanging_sign"), BlockShape::HangingSign),
    Rule::new(Predicate::Suffix("_sign"), BlockShape::Sign),
    Rule::new(Predicate::Suffix("_fence_gate"), BlockShape::FenceGate),
    Rule::new(Predicate::Suffix("_fence"), BlockShape::Fence),
    Rule::new(Predicate::Suffix("_pressure_plate"), BlockShape::PressurePlate),
    Rule::new(Predicate::Suffix("_trapdoor"), BlockShape::Trapdoor),
    Rule::new(Predicate::Suffix("_door"), BlockShape::Door),
    Rule::new(Predicate::Suffix("_button"), BlockShape::Button),
    Rule::new(Predicate::Suffix("_stairs"), BlockShape::Stairs),
    Rule::new(Predicate::Suffix("_slab"), BlockShape::Slab),
    Rule::new(Predicate::Suffix("_log"), BlockShape::Column),
    Rule::new(Predicate::Suffix("_wood"), BlockShape::Column),
    Rule::new(Predicate::Suffix("_stem"), BlockShape::Column),
    Rule::new(Predicate::Suffix("_hyphae"), BlockShape::Column),
    Rule::new(Predicate::Suffix("_pillar"), BlockShape::Column),
    Rule::new(Predicate::Always, BlockShape::Cube),
];

const MATERIAL_RULES: &[Rule<MaterialClass>] = &[
    Rule::new(Predicate::Word("gem"), MaterialClass::Crystal),
    Rule::new(Predicate::WordPrefix("crystal"), MaterialClass::Crystal),
    Rule::new(Predicate::Word("ruby"), MaterialClass::Crystal),
    Rule::new(Predicate::Word("sapphire"), MaterialClass::Crystal),
    Rule::new(Predicate::Word("emerald"), MaterialClass::Crystal),
    Rule::new(Predicate::Word("amethyst"), MaterialClass::Crystal),
    Rule::new(Predicate::Word("diamond"), MaterialClass::Crystal),
    Rule::new(Predicate::Word("topaz"), MaterialClass::Crystal),
    Rule::new(Predicate::Word("jade"), MaterialClass::Crystal),
    Rule::new(Predicate::Word("quartz"), MaterialClass::Crystal),
    Rule::new(Predicate::Word("shard"), MaterialClass::Crystal),
    Rule::new(Predicate::Word("glass"), MaterialClass::Crystal),
    Rule::new(Predicate::Word("wood"), MaterialClass::Wood),
    Rule::new(Predicate::WordPrefix("wooden"), MaterialClass::Wood),
    Rule::new(Predicate::Word("log"), MaterialClass::Wood),
    Rule::new(Predicate::WordPrefix("plank"), MaterialClass::Wood),
    Rule::new(Predicate::Word("timber"), MaterialClass::Wood),
    Rule::new(Predicate::Word("bark"), MaterialClass::Wood),
    Rule::new(Predicate::Word("stick"), MaterialClass::Wood),
    Rule::new(Predicate::Word("stone"), MaterialClass::Stone),
    Rule::new(Predicate::Word("rock"), MaterialClass::Stone),
    Rule::new(Predicate::WordPrefix("brick"), MaterialClass::Stone),
    Rule::new(Predicate::WordPrefix("cobble"), MaterialClass::Stone),
    Rule::new(Predicate::Word("granite"), MaterialClass::Stone),
    Rule::new(Predicate::Word("marble"), MaterialClass::Stone),
    Rule::new(Predicate::Word("slate"), MaterialClass::Stone),
    Rule::new(Predicate::Word("basalt"), MaterialClass::Stone),
    Rule::new(Predicate::Word("ore"), MaterialClass::Stone),
    Rule::new(Predicate::Word("metal"), MaterialClass::Metal),
    Rule::new(Predicate::Word("ingot"), MaterialClass::Metal),
    Rule::new(Predicate::Word("nugget"), MaterialClass::Metal),
    Rule::new(Predicate::Word("iron"), MaterialClass::Metal),
    Rule::new(Predicate::Word("steel"), MaterialClass::Metal),
    Rule::new(Predicate::Word("copper"), MaterialClass::Metal),
    Rule::new(Predicate::Word("gold"), MaterialClass::Metal),
    Rule::new(Predicate::Word("silver"), MaterialClass::Metal),
    Rule::new(Predicate::Word("bronze"), MaterialClass::Metal),
    Rule::new(Predicate::Word("tin"), MaterialClass::Metal),
    Rule::new(Predicate::Word("alloy"), MaterialClass::Metal),
    Rule::new(Predicate::Word("food"), MaterialClass::Food),
    Rule::new(Predicate::WordPrefix("apple"), MaterialClass::Food),
    Rule::new(Predicate::WordPrefix("berr"), MaterialClass::Food),
    Rule::new(Predicate::Word("bread"), MaterialClass::Food),
    Rule::new(Predicate::Word("meat"), MaterialClass::Food),
    Rule::new(Predicate::Word("pie"), MaterialClass::Food),
    Rule::new(Predicate::Word("cake"), MaterialClass::Food),
    Rule::new(Predicate::Word("cheese"), MaterialClass::Food),
    Rule::new(Predicate::Word("stew"), MaterialClass::Food),
    Rule::new(Predicate::Word("soup"), MaterialClass::Food),
    Rule::new(Predicate::WordPrefix("cookie"), MaterialClass::Food),
    Rule::new(Predicate::WordPrefix("fruit"), MaterialClass::Food),
];

const ARCHETYPE_RULES: &[Rule<Archetype>] = &[
    Rule::new(Predicate::Word("lamp"), Archetype::Emissive),
    Rule::new(Predicate::Word("lantern"), Archetype::Emissive),
    Rule::new(Predicate::Word("torch"), Archetype::Emissive),
    Rule::new(Predicate::Word("lava"), Archetype::Emissive),
    Rule::new(Predicate::Word("magma"), Archetype::Emissive),
    Rule::new(Predicate::Word("ember"), Archetype::Emissive),
    Rule::new(Predicate::WordPrefix("glow"), Archetype::Glow),
    Rule::new(Predicate::Word("luminous"), Archetype::Glow),
    Rule::new(Predicate::Word("radiant"), Archetype::Glow),
    Rule::new(Predicate::Word("glass"), Archetype::Translucent),
    Rule::new(Predicate::Word("pane"), Archetype::Translucent),
    Rule::new(Predicate::Word("ice"), Archetype::Translucent),
    Rule::new(Predicate::Word("slime"), Archetype::Translucent),
    Rule::new(Predicate::Always, Archetype::Plain),
];

const ITEM_PARENT_RULES: &[Rule<&str>] = &[
    Rule::new(Predicate::Suffix("_sword"), "minecraft:item/handheld"),
    Rule::new(Predicate::Suffix("_pickaxe"), "minecraft:item/handheld"),
    Rule::new(Predicate::Suffix("_axe"), "minecraft:item/handheld"),
    Rule::new(Predicate::Suffix("_shovel"), "minecraft:item/handheld"),
    Rule::new(Predicate::Suffix("_hoe"), "minecraft:item/handheld"),
    Rule::new(Predicate::Exact("stick"), "minecraft:item/handheld"),
    Rule::new(Predicate::Suffix("_rod"), "minecraft:item/handheld_rod"),
    Rule::new(Predicate::Always, "minecraft:item/generated"),
];

pub const SHAPES: Classifier<BlockShape> = Classifier::new(SHAPE_RULES);
pub const MATERIALS: Classifier<MaterialClass> = Classifier::new(MATERIAL_RULES);
pub const ARCHETYPES: Classifier<Archetype> = Classifier::new(ARCHETYPE_RULES);
pub const ITEM_PARENTS: Classifier<&str> = Classifier::new(ITEM_PARENT_RULES);

pub fn block_shape(id: &str) -> BlockShape {
    SHAPES.classify(id).unwrap_or(BlockShape::Cube)
}

/// Material class from the explicit hint first, then the id, then the
/// display name.
pub fn material_class(hint: Option<&str>, id: &str, display_name: &str) -> MaterialClass {
    hint.and_then(|h| MATERIALS.classify(h))
        .or_else(|| MATERIALS.classify(id))
        .or_else(|| MATERIALS.classify(display_name))
        .unwrap_or(MaterialClass::Generic)
}

/// Parent model for a flat item sprite: tools are held like tools.
pub fn item_parent(id: &str) -> &'static str {
    ITEM_PARENTS.classify(id).unwrap_or("minecraft:item/generated")
}

pub fn archetype(id: &str, display_name: &str) -> Archetype {
    match ARCHETYPES.classify(id) {
        Some(Archetype::Plain) | None => ARCHETYPES.classify(display_name).unwrap_or(Archetype::Plain),
        Some(found) => found,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        assert!(Predicate::Suffix("_door").matches("maple_door"));
        assert!(Predicate::Word("gem").matches("Rough Gem"));
        assert!(!Predicate::Word("gem").matches("gemstone"));
        assert!(Predicate::WordPrefix("glow").matches("glowing_moss"));
        assert!(Predicate::Always.matches(""));
    }

    #[test]
    fn test_shape_rules_prefer_longer_suffixes() {
        assert_eq!(block_shape("maple_hanging_sign"), BlockShape::HangingSign);
        assert_eq!(block_shape("maple_sign"), BlockShape::Sign);
        assert_eq!(block_shape("maple_fence_gate"), BlockShape::FenceGate);
        assert_eq!(block_shape("maple_fence"), BlockShape::Fence);
        assert_eq!(block_shape("maple_trapdoor"), BlockShape::Trapdoor);
        assert_eq!(block_shape("maple_door"), BlockShape::Door);
        assert_eq!(block_shape("stripped_maple_log"), BlockShape::Column);
        assert_eq!(block_shape("ruby_block"), BlockShape::Cube);
    }

    #[test]
    fn test_material_hint_wins_over_name() {
        assert_eq!(material_class(Some("gem"), "ruby", "Ruby"), MaterialClass::Crystal);
        assert_eq!(material_class(Some("metal"), "ruby_ingot", "Ruby Ingot"), MaterialClass::Metal);
        assert_eq!(material_class(None, "copper_nugget", "Copper Nugget"), MaterialClass::Metal);
        assert_eq!(material_class(None, "widget", "Widget"), MaterialClass::Generic);
    }

    #[test]
    fn test_archetype_falls_back_to_display_name() {
        assert_eq!(archetype("crystal_lamp", "Crystal Lamp"), Archetype::Emissive);
        assert_eq!(archetype("fancy_block", "Glowing Block"), Archetype::Glow);
        assert_eq!(archetype("ruby", "Ruby"), Archetype::Plain);
    }

    #[test]
    fn test_item_parent() {
        assert_eq!(item_parent("ruby"), "minecraft:item/generated");
        assert_eq!(item_parent("ruby_pickaxe"), "minecraft:item/handheld");
        assert_eq!(item_parent("ruby_axe"), "minecraft:item/handheld");
    }

    #[test]
    fn test_classify_all_keeps_table_order() {
        let found = MATERIALS.classify_all("iron_wood");
        assert_eq!(found, vec![MaterialClass::Wood, MaterialClass::Metal]);
    }
}
