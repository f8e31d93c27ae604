//! Texture Profiles
//!
//! A profile describes what a texture should look like: material, one or two
//! physical traits, one or two surface styles and up to two motifs. It is
//! derived from the display name and material hint only, so the same entity
//! always gets the same profile.

use serde::{Deserialize, Serialize};

use crate::classify::{Classifier, MaterialClass, Predicate, Rule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhysicalTrait {
    Hard,
    Soft,
    Dense,
    Light,
    Brittle,
    Fibrous,
    Reflective,
    Organic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceStyle {
    Smooth,
    Rough,
    Polished,
    Grainy,
    Faceted,
    Porous,
    Matte,
}

/// Motifs are listed in the order they are stamped during synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Motif {
    Strata,
    Grain,
    Rings,
    Veins,
    Holes,
    Bubbles,
    Flakes,
}

impl Motif {
    /// Noise amplitude used when this motif is present.
    pub fn noise_amplitude(self) -> i32 {
        match self {
            Self::Grain => 16,
            Self::Strata | Self::Flakes => 14,
            Self::Holes => 12,
            Self::Veins | Self::Rings => 10,
            Self::Bubbles => 8,
        }
    }
}

pub const MAX_TRAITS: usize = 2;
pub const MAX_STYLES: usize = 2;
pub const MAX_MOTIFS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureProfile {
    pub material_hint: String,
    pub material_class: MaterialClass,
    pub traits: Vec<PhysicalTrait>,
    pub surface_styles: Vec<SurfaceStyle>,
    pub motifs: Vec<Motif>,
}

/// Partial profile as written in a specification. Missing fields are filled
/// from the derived profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileOverride {
    #[serde(default)]
    pub material_hint: Option<String>,
    #[serde(default)]
    pub traits: Option<Vec<PhysicalTrait>>,
    #[serde(default)]
    pub surface_styles: Option<Vec<SurfaceStyle>>,
    #[serde(default)]
    pub motifs: Option<Vec<Motif>>,
}

const TRAIT_RULES: &[Rule<PhysicalTrait>] = &[
    Rule::new(Predicate::Word("heavy"), PhysicalTrait::Dense),
    Rule::new(Predicate::Word("dense"), PhysicalTrait::Dense),
    Rule::new(Predicate::Word("soft"), PhysicalTrait::Soft),
    Rule::new(Predicate::Word("fluffy"), PhysicalTrait::Soft),
    Rule::new(Predicate::Word("light"), PhysicalTrait::Light),
    Rule::new(Predicate::Word("brittle"), PhysicalTrait::Brittle),
    Rule::new(Predicate::Word("cracked"), PhysicalTrait::Brittle),
    Rule::new(Predicate::Word("shiny"), PhysicalTrait::Reflective),
    Rule::new(Predicate::Word("polished"), PhysicalTrait::Reflective),
    Rule::new(Predicate::Word("hardened"), PhysicalTrait::Hard),
];

const STYLE_RULES: &[Rule<SurfaceStyle>] = &[
    Rule::new(Predicate::Word("polished"), SurfaceStyle::Polished),
    Rule::new(Predicate::Word("smooth"), SurfaceStyle::Smooth),
    Rule::new(Predicate::Word("rough"), SurfaceStyle::Rough),
    Rule::new(Predicate::Word("raw"), SurfaceStyle::Rough),
    Rule::new(Predicate::Word("cracked"), SurfaceStyle::Rough),
    Rule::new(Predicate::Word("porous"), SurfaceStyle::Porous),
    Rule::new(Predicate::Word("sponge"), SurfaceStyle::Porous),
    Rule::new(Predicate::Word("cut"), SurfaceStyle::Faceted),
];

const MOTIF_RULES: &[Rule<Motif>] = &[
    Rule::new(Predicate::Word("log"), Motif::Rings),
    Rule::new(Predicate::Word("stump"), Motif::Rings),
    Rule::new(Predicate::Word("trunk"), Motif::Rings),
    Rule::new(Predicate::Word("marble"), Motif::Veins),
    Rule::new(Predicate::WordPrefix("vein"), Motif::Veins),
    Rule::new(Predicate::Word("cheese"), Motif::Holes),
    Rule::new(Predicate::Word("sponge"), Motif::Holes),
    Rule::new(Predicate::Word("porous"), Motif::Holes),
    Rule::new(Predicate::Word("slime"), Motif::Bubbles),
    Rule::new(Predicate::Word("lava"), Motif::Bubbles),
    Rule::new(Predicate::WordPrefix("bubbl"), Motif::Bubbles),
    Rule::new(Predicate::Word("sandstone"), Motif::Strata),
    Rule::new(Predicate::WordPrefix("layer"), Motif::Strata),
    Rule::new(Predicate::Word("ore"), Motif::Flakes),
    Rule::new(Predicate::Word("granite"), Motif::Flakes),
    Rule::new(Predicate::Word("speckled"), Motif::Flakes),
];

const TRAITS: Classifier<PhysicalTrait> = Classifier::new(TRAIT_RULES);
const STYLES: Classifier<SurfaceStyle> = Classifier::new(STYLE_RULES);
const MOTIFS: Classifier<Motif> = Classifier::new(MOTIF_RULES);

fn class_defaults(class: MaterialClass) -> (PhysicalTrait, SurfaceStyle, Option<Motif>) {
    match class {
        MaterialClass::Wood => (PhysicalTrait::Fibrous, SurfaceStyle::Grainy, Some(Motif::Grain)),
        MaterialClass::Stone => (PhysicalTrait::Hard, SurfaceStyle::Rough, Some(Motif::Strata)),
        MaterialClass::Metal => (PhysicalTrait::Dense, SurfaceStyle::Polished, None),
        MaterialClass::Food => (PhysicalTrait::Organic, SurfaceStyle::Matte, None),
        MaterialClass::Crystal => (PhysicalTrait::Hard, SurfaceStyle::Faceted, None),
        MaterialClass::Generic => (PhysicalTrait::Hard, SurfaceStyle::Matte, None),
    }
}

fn push_unique<T: PartialEq>(out: &mut Vec<T>, v: T, cap: usize) {
    if out.len() < cap && !out.contains(&v) {
        out.push(v);
    }
}

/// Derive a profile from the display name, the entity id and the material
/// class already chosen for the entity.
pub fn derive_profile(display_name: &str, id: &str, material_hint: Option<&str>, class: MaterialClass) -> TextureProfile {
    let (default_trait, default_style, default_motif) = class_defaults(class);
    let subject = format!("{} {}", display_name, id.replace('_', " "));

    let mut traits = vec![default_trait];
    for t in TRAITS.classify_all(&subject) {
        push_unique(&mut traits, t, MAX_TRAITS);
    }

    let mut surface_styles = Vec::new();
    for s in STYLES.classify_all(&subject) {
        push_unique(&mut surface_styles, s, MAX_STYLES);
    }
    push_unique(&mut surface_styles, default_style, MAX_STYLES);

    let mut motifs = Vec::new();
    for m in MOTIFS.classify_all(&subject) {
        push_unique(&mut motifs, m, MAX_MOTIFS);
    }
    if let Some(m) = default_motif {
        push_unique(&mut motifs, m, MAX_MOTIFS);
    }
    motifs.sort();

    let material_hint = material_hint
        .map(str::to_string)
        .unwrap_or_else(|| class_hint(class).to_string());

    TextureProfile {
        material_hint,
        material_class: class,
        traits,
        surface_styles,
        motifs,
    }
}

fn class_hint(class: MaterialClass) -> &'static str {
    match class {
        MaterialClass::Wood => "wood",
        MaterialClass::Stone => "stone",
        MaterialClass::Metal => "metal",
        MaterialClass::Food => "food",
        MaterialClass::Crystal => "crystal",
        MaterialClass::Generic => "generic",
    }
}

impl TextureProfile {
    /// Apply a partial override, keeping the bounds on every list.
    pub fn with_override(mut self, o: &ProfileOverride) -> Self {
        if let Some(hint) = &o.material_hint {
            self.material_hint = hint.clone();
        }
        if let Some(traits) = &o.traits {
            if !traits.is_empty() {
                self.traits = bounded(traits, MAX_TRAITS);
            }
        }
        if let Some(styles) = &o.surface_styles {
            if !styles.is_empty() {
                self.surface_styles = bounded(styles, MAX_STYLES);
            }
        }
        if let Some(motifs) = &o.motifs {
            self.motifs = bounded(motifs, MAX_MOTIFS);
            self.motifs.sort();
        }
        self
    }

    /// Noise amplitude for synthesis: ±12 for a plain texture, otherwise the
    /// largest amplitude among the motifs.
    pub fn noise_amplitude(&self) -> i32 {
        self.motifs
            .iter()
            .map(|m| m.noise_amplitude())
            .max()
            .unwrap_or(12)
    }
}

fn bounded<T: PartialEq + Copy>(items: &[T], cap: usize) -> Vec<T> {
    let mut out = Vec::new();
    for v in items {
        push_unique(&mut out, *v, cap);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_is_deterministic() {
        let a = derive_profile("Maple Log", "maple_log", None, MaterialClass::Wood);
        let b = derive_profile("Maple Log", "maple_log", None, MaterialClass::Wood);
        assert_eq!(a, b);
        assert_eq!(a.motifs, vec![Motif::Grain, Motif::Rings]);
        assert_eq!(a.material_hint, "wood");
    }

    #[test]
    fn test_profile_bounds() {
        let p = derive_profile(
            "Heavy Shiny Cracked Polished Rough Speckled Marble Ore",
            "x",
            Some("stone"),
            MaterialClass::Stone,
        );
        assert!(!p.traits.is_empty() && p.traits.len() <= MAX_TRAITS);
        assert!(!p.surface_styles.is_empty() && p.surface_styles.len() <= MAX_STYLES);
        assert!(p.motifs.len() <= MAX_MOTIFS);
    }

    #[test]
    fn test_plain_gem_has_no_motifs() {
        let p = derive_profile("Ruby", "ruby", Some("gem"), MaterialClass::Crystal);
        assert!(p.motifs.is_empty());
        assert_eq!(p.noise_amplitude(), 12);
        assert_eq!(p.surface_styles, vec![SurfaceStyle::Faceted]);
    }

    #[test]
    fn test_override_fills_only_given_fields() {
        let base = derive_profile("Ruby", "ruby", Some("gem"), MaterialClass::Crystal);
        let o = ProfileOverride {
            motifs: Some(vec![Motif::Veins, Motif::Veins, Motif::Holes, Motif::Grain]),
            ..Default::default()
        };
        let p = base.clone().with_override(&o);
        assert_eq!(p.motifs, vec![Motif::Veins, Motif::Holes]);
        assert_eq!(p.traits, base.traits);
    }
}
