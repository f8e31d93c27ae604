//! Contract Invariant Tests
//!
//! These tests verify the non-negotiable guarantees.

use modforge_core::{
    emit::EmitError,
    mapper::FileContents,
    png::{self, ColorType},
    source::MemorySource,
    spec::AssetKind,
    CompileError, CompiledMod, ModCompiler, ModSpec,
};
use serde_json::Value;
use std::collections::HashSet;

const RUBY: &str = r#"{"modId":"gems","items":[{"id":"ruby","material":"gem"}]}"#;

const MIXED: &str = r####"{
    "modId": "woods",
    "items": [
        {"id": "ruby", "material": "gem"},
        {"id": "sapphire", "material": "gem", "color": "#2040c0"},
        {"id": "copper_rod"}
    ],
    "blocks": [
        {"id": "ruby_block", "material": "crystal"},
        {"id": "sapphire_lamp", "material": "glass", "dropsNothing": true}
    ],
    "woodTypes": [{"id": "maple"}],
    "recipes": [
        {"type": "shaped", "pattern": ["###", "###", "###"], "key": {"#": "ruby"}, "result": "ruby_block"},
        {"type": "shapeless", "id": "ruby_from_block", "ingredients": ["ruby_block"], "result": "ruby", "count": 9},
        {"type": "blasting", "ingredient": "minecraft:redstone", "result": "sapphire", "experience": 0.7}
    ]
}"####;

const MAPLE_MEMBERS: [&str; 15] = [
    "maple_log",
    "maple_wood",
    "stripped_maple_log",
    "stripped_maple_wood",
    "maple_planks",
    "maple_stairs",
    "maple_slab",
    "maple_fence",
    "maple_fence_gate",
    "maple_door",
    "maple_trapdoor",
    "maple_pressure_plate",
    "maple_button",
    "maple_sign",
    "maple_hanging_sign",
];

async fn compile(json: &str) -> Result<CompiledMod, CompileError> {
    let spec = ModSpec::from_json(json).unwrap();
    ModCompiler::default().compile(&spec, &MemorySource::new()).await
}

fn json_of(compiled: &CompiledMod, path: &str) -> Value {
    let file = compiled.file(path).unwrap_or_else(|| panic!("missing {}", path));
    match &file.contents {
        FileContents::Text(t) => serde_json::from_str(t).unwrap(),
        other => panic!("{} is not text: {:?}", path, other),
    }
}

/// INVARIANT: Same specification, same bytes
#[tokio::test]
async fn test_compilation_is_deterministic() {
    let a = compile(MIXED).await.unwrap();
    let b = compile(MIXED).await.unwrap();

    let paths_a: Vec<&str> = a.files.iter().map(|f| f.path.as_str()).collect();
    let paths_b: Vec<&str> = b.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths_a, paths_b);
    for (fa, fb) in a.files.iter().zip(&b.files) {
        assert_eq!(fa.contents, fb.contents, "contents differ for {}", fa.path);
    }
    assert_eq!(a.manifest.tree_hash, b.manifest.tree_hash);
    assert_eq!(a.manifest.files, b.manifest.files);
}

/// INVARIANT: Output is sorted by path and free of placeholders
#[tokio::test]
async fn test_output_sorted_and_rendered() {
    let compiled = compile(MIXED).await.unwrap();
    assert!(compiled.files.windows(2).all(|w| w[0].path < w[1].path));
    assert!(compiled.files.iter().all(|f| f.contents != FileContents::Placeholder));
}

/// INVARIANT: Every declared id yields a complete asset set
#[tokio::test]
async fn test_every_key_is_complete() {
    let compiled = compile(MIXED).await.unwrap();
    let m = &compiled.spec.mod_id;

    for key in compiled.spec.asset_keys() {
        let id = &key.id;
        let item_model = format!("assets/{}/models/item/{}.json", m, id);
        assert!(compiled.file(&item_model).is_some(), "missing {}", item_model);

        let has_texture = compiled.files.iter().any(|f| {
            f.is_texture() && f.metadata.as_ref().is_some_and(|meta| meta.owner == key)
        });
        assert!(has_texture, "no texture for {:?}", key);

        if key.kind == AssetKind::Block {
            let blockstate = format!("assets/{}/blockstates/{}.json", m, id);
            assert!(compiled.file(&blockstate).is_some(), "missing {}", blockstate);
            let block_model_prefix = format!("assets/{}/models/block/{}", m, id);
            assert!(compiled.files.iter().any(|f| f.path.starts_with(&block_model_prefix)));
        }
    }
}

/// INVARIANT: Every written texture decodes as truecolor and passes the rules
#[tokio::test]
async fn test_every_texture_is_valid_truecolor() {
    let compiled = compile(MIXED).await.unwrap();
    for file in compiled.files.iter().filter(|f| f.is_texture()) {
        let decoded = png::decode(file.bytes().unwrap()).unwrap();
        assert!(decoded.color_type.is_truecolor(), "{}", file.path);
        assert!(decoded.width >= 16 && decoded.height >= 16, "{}", file.path);
    }
}

/// INVARIANT: Textures of different entities are never byte-identical
#[tokio::test]
async fn test_textures_are_distinct_across_entities() {
    let compiled = compile(MIXED).await.unwrap();
    let mut seen = HashSet::new();
    for file in compiled.files.iter().filter(|f| f.is_texture()) {
        let rgba = png::decode_rgba(file.bytes().unwrap()).unwrap();
        assert!(seen.insert(rgba.pixels), "duplicate pixels at {}", file.path);
    }
}

#[tokio::test]
async fn test_ruby_scenario() {
    let compiled = compile(RUBY).await.unwrap();

    let texture = compiled.file("assets/gems/textures/item/ruby.png").unwrap();
    let decoded = png::decode(texture.bytes().unwrap()).unwrap();
    assert_eq!((decoded.width, decoded.height), (32, 32));
    assert_eq!(decoded.color_type, ColorType::Rgba);
    let rgba = decoded.to_rgba().unwrap();
    assert!(rgba.pixels.chunks_exact(4).all(|p| p[3] == 255));
    let distinct: HashSet<&[u8]> = rgba.pixels.chunks_exact(4).collect();
    assert!(distinct.len() >= 2);

    let model = json_of(&compiled, "assets/gems/models/item/ruby.json");
    assert_eq!(model["parent"], "minecraft:item/generated");
    assert_eq!(model["textures"]["layer0"], "gems:item/ruby");

    let lang = json_of(&compiled, "assets/gems/lang/en_us.json");
    assert_eq!(lang["item.gems.ruby"], "Ruby");
}

#[tokio::test]
async fn test_maple_scenario() {
    let compiled = compile(MIXED).await.unwrap();

    let family: Vec<&str> = compiled
        .spec
        .blocks
        .iter()
        .filter(|b| b.family.as_deref() == Some("maple"))
        .map(|b| b.entity.id.as_str())
        .collect();
    assert_eq!(family, MAPLE_MEMBERS);

    for what in [
        "stick",
        "crafting_table",
        "chest",
        "barrel",
        "bowl",
        "shield",
        "wooden_pickaxe",
        "wooden_axe",
        "wooden_shovel",
        "wooden_hoe",
        "wooden_sword",
    ] {
        let path = format!("data/woods/recipe/{}_from_maple_planks.json", what);
        let recipe = json_of(&compiled, &path);
        assert_eq!(recipe["result"]["id"], format!("minecraft:{}", what));
    }

    let family_recipes: Vec<Value> = compiled
        .files
        .iter()
        .filter(|f| f.path.starts_with("data/woods/recipe/") && f.path.contains("maple"))
        .map(|f| json_of(&compiled, &f.path))
        .collect();
    assert!(family_recipes.iter().all(|r| {
        let t = r["type"].as_str().unwrap();
        t == "minecraft:crafting_shaped" || t == "minecraft:crafting_shapeless"
    }));

    for id in MAPLE_MEMBERS {
        let path = format!("data/woods/loot_table/blocks/{}.json", id);
        let loot = json_of(&compiled, &path);
        assert_eq!(loot["type"], "minecraft:block");
        assert_eq!(loot["pools"][0]["entries"][0]["name"], format!("woods:{}", id));
    }

    let planks_tag = json_of(&compiled, "data/minecraft/tags/block/planks.json");
    assert_eq!(planks_tag["replace"], false);
    assert!(planks_tag["values"].as_array().unwrap().contains(&Value::from("woods:maple_planks")));
}

#[tokio::test]
async fn test_drops_nothing_block_has_no_loot_table() {
    let compiled = compile(MIXED).await.unwrap();
    assert!(compiled.file("data/woods/loot_table/blocks/sapphire_lamp.json").is_none());
    assert!(compiled.file("data/woods/loot_table/blocks/ruby_block.json").is_some());
}

/// INVARIANT: A cooking recipe never turns an item into itself
#[tokio::test]
async fn test_cooking_self_loop_fails_the_build() {
    let json = r#"{"modId":"gems","items":[{"id":"ruby"}],
        "recipes":[{"type":"smelting","ingredient":"ruby","result":"gems:ruby"}]}"#;
    let err = compile(json).await.unwrap_err();
    assert!(matches!(err, CompileError::Emit(EmitError::SelfLoop { .. })), "{:?}", err);
}

/// INVARIANT: Malformed specifications fail before anything is produced
#[tokio::test]
async fn test_invalid_specification_is_rejected() {
    let bad_id = r#"{"modId":"gems","items":[{"id":"Ruby Gem"}]}"#;
    assert!(matches!(compile(bad_id).await, Err(CompileError::Spec(_))));

    let duplicate = r#"{"modId":"gems","items":[{"id":"ruby"}],"blocks":[{"id":"ruby"}]}"#;
    assert!(matches!(compile(duplicate).await, Err(CompileError::Spec(_))));
}

/// INVARIANT: Validation cannot be bypassed
#[cfg(feature = "test-hooks")]
#[tokio::test]
async fn test_compile_always_validates() {
    use modforge_core::pipeline::{get_validation_call_count, reset_validation_call_count};

    reset_validation_call_count();
    let compiled = compile(RUBY).await.unwrap();
    let textures = compiled.files.iter().filter(|f| f.is_texture()).count() as u32;

    // Other tests in this binary may validate concurrently.
    assert!(get_validation_call_count() >= textures);
    assert_eq!(compiled.manifest.stats.textures, textures);
}
