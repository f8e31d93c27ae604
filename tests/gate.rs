//! Gate Contract Tests
//!
//! Archives are built with `zip::ZipWriter` in temp directories and judged
//! exactly as a packaged mod would be.

use modforge_core::{
    archive::pack_resources,
    gate::{validate_archive, GateCheck, GateConfig, GateError, GateFailure},
    png::{encode_image, RgbaImage},
    source::MemorySource,
    ForgeConfig, ModCompiler, ModSpec,
};
use semver::Version;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const RECIPE: &[u8] = br#"{"type":"minecraft:crafting_shapeless","ingredients":[],"result":{"id":"m:a"}}"#;
const LOOT: &[u8] = br#"{"type":"minecraft:block","pools":[]}"#;

fn write_zip(dir: &Path, entries: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join("mod.jar");
    let mut zip = ZipWriter::new(std::fs::File::create(&path).unwrap());
    for (name, bytes) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap();
    path
}

fn texture(w: u32, h: u32) -> Vec<u8> {
    let mut img = RgbaImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            img.set(x, y, [(x * 7) as u8, (y * 5) as u8, 90, 255]);
        }
    }
    encode_image(&img).unwrap()
}

fn rejected(result: Result<(), GateError>) -> GateFailure {
    match result {
        Err(GateError::Rejected(f)) => f,
        other => panic!("expected a gate rejection, got {:?}", other),
    }
}

/// INVARIANT: Only the first offending path is reported
#[test]
fn test_misplaced_recipes_report_one_path() {
    let dir = tempfile::tempdir().unwrap();
    let archive = write_zip(
        dir.path(),
        &[
            ("data/m/recipes/c.json", RECIPE),
            ("data/m/recipes/a.json", RECIPE),
            ("data/m/recipes/b.json", RECIPE),
        ],
    );
    let failure = rejected(validate_archive(&archive, &GateConfig::new("m", vec![])));
    assert_eq!(failure.check, GateCheck::RecipeFolder);
    assert_eq!(failure.path, "data/m/recipes/a.json");
    assert!(!failure.path.contains(','));
    assert!(failure.reason.contains("2 more"));
}

#[test]
fn test_plural_folders_are_accepted_for_older_targets() {
    let dir = tempfile::tempdir().unwrap();
    let archive = write_zip(
        dir.path(),
        &[("data/m/recipes/a.json", RECIPE), ("data/m/loot_tables/blocks/stone.json", LOOT)],
    );
    let config = GateConfig::new("m", vec!["stone".into()]).with_target_version(Version::new(1, 20, 4));
    assert!(validate_archive(&archive, &config).is_ok());

    let modern = GateConfig::new("m", vec!["stone".into()]);
    assert_eq!(rejected(validate_archive(&archive, &modern)).check, GateCheck::RecipeFolder);
}

#[test]
fn test_recipe_schema() {
    let dir = tempfile::tempdir().unwrap();
    let archive = write_zip(
        dir.path(),
        &[
            ("data/m/recipe/good.json", RECIPE),
            ("data/m/recipe/no_result.json", &br#"{"type":"minecraft:smelting"}"#[..]),
        ],
    );
    let failure = rejected(validate_archive(&archive, &GateConfig::new("m", vec![])));
    assert_eq!(failure.check, GateCheck::RecipeSchema);
    assert_eq!(failure.path, "data/m/recipe/no_result.json");
    assert!(failure.reason.contains("result"));

    let archive = write_zip(dir.path(), &[("data/m/recipe/broken.json", &b"{"[..])]);
    let failure = rejected(validate_archive(&archive, &GateConfig::new("m", vec![])));
    assert!(failure.reason.contains("invalid JSON"));
}

#[test]
fn test_recipe_checks_run_before_loot_checks() {
    let dir = tempfile::tempdir().unwrap();
    let archive = write_zip(
        dir.path(),
        &[("data/m/loot_tables/blocks/a.json", LOOT), ("data/m/recipe/bad.json", &b"[]"[..])],
    );
    let failure = rejected(validate_archive(&archive, &GateConfig::new("m", vec![])));
    assert_eq!(failure.check, GateCheck::RecipeSchema);
}

#[test]
fn test_loot_table_folder_and_schema() {
    let dir = tempfile::tempdir().unwrap();
    let archive = write_zip(dir.path(), &[("data/m/loot_tables/blocks/a.json", LOOT)]);
    let failure = rejected(validate_archive(&archive, &GateConfig::new("m", vec![])));
    assert_eq!(failure.check, GateCheck::LootTableFolder);

    let archive = write_zip(
        dir.path(),
        &[("data/m/loot_table/blocks/a.json", &br#"{"type":"minecraft:block","pools":{}}"#[..])],
    );
    let failure = rejected(validate_archive(&archive, &GateConfig::new("m", vec![])));
    assert_eq!(failure.check, GateCheck::LootTableSchema);
    assert!(failure.reason.contains("pools"));
}

#[test]
fn test_missing_loot_table_unless_exempt() {
    let dir = tempfile::tempdir().unwrap();
    let archive = write_zip(dir.path(), &[("data/m/loot_table/blocks/a.json", LOOT)]);

    let config = GateConfig::new("m", vec!["a".into(), "glass_pane".into()]);
    let failure = rejected(validate_archive(&archive, &config));
    assert_eq!(failure.check, GateCheck::LootTableCoverage);
    assert_eq!(failure.path, "data/m/loot_table/blocks/glass_pane.json");

    let exempt = config.with_no_drop(vec!["glass_pane".into()]);
    assert!(validate_archive(&archive, &exempt).is_ok());
}

#[test]
fn test_door_textures() {
    let dir = tempfile::tempdir().unwrap();
    let loot: (&str, &[u8]) = ("data/m/loot_table/blocks/oak_like_door.json", LOOT);
    let config = GateConfig::new("m", vec!["oak_like_door".into()]);

    let bottom = texture(16, 16);
    let top = texture(16, 16);
    let ok = write_zip(
        dir.path(),
        &[
            loot,
            ("assets/m/textures/block/oak_like_door_bottom.png", bottom.as_slice()),
            ("assets/m/textures/block/oak_like_door_top.png", top.as_slice()),
        ],
    );
    assert!(validate_archive(&ok, &config).is_ok());

    let missing_top = write_zip(dir.path(), &[loot, ("assets/m/textures/block/oak_like_door_bottom.png", bottom.as_slice())]);
    let failure = rejected(validate_archive(&missing_top, &config));
    assert_eq!(failure.check, GateCheck::DoorTextures);
    assert_eq!(failure.path, "assets/m/textures/block/oak_like_door_top.png");

    let wide = texture(32, 16);
    let not_square = write_zip(
        dir.path(),
        &[
            loot,
            ("assets/m/textures/block/oak_like_door_bottom.png", wide.as_slice()),
            ("assets/m/textures/block/oak_like_door_top.png", top.as_slice()),
        ],
    );
    let failure = rejected(validate_archive(&not_square, &config));
    assert!(failure.reason.contains("32x16"));

    let big_top = texture(32, 32);
    let mismatched = write_zip(
        dir.path(),
        &[
            loot,
            ("assets/m/textures/block/oak_like_door_bottom.png", bottom.as_slice()),
            ("assets/m/textures/block/oak_like_door_top.png", big_top.as_slice()),
        ],
    );
    let failure = rejected(validate_archive(&mismatched, &config));
    assert_eq!(failure.path, "assets/m/textures/block/oak_like_door_top.png");

    let corrupt = write_zip(
        dir.path(),
        &[
            loot,
            ("assets/m/textures/block/oak_like_door_bottom.png", &b"\x89PNG\r\n\x1a\n"[..]),
            ("assets/m/textures/block/oak_like_door_top.png", top.as_slice()),
        ],
    );
    let failure = rejected(validate_archive(&corrupt, &config));
    assert!(failure.reason.contains("not a valid PNG"));
}

#[test]
fn test_sign_requires_entity_texture() {
    let dir = tempfile::tempdir().unwrap();
    let tex = texture(16, 16);
    let entries: Vec<(&str, &[u8])> = vec![
        ("data/m/loot_table/blocks/elm_hanging_sign.json", LOOT),
        ("assets/m/blockstates/elm_hanging_sign.json", &b"{}"[..]),
        ("assets/m/models/block/elm_hanging_sign.json", &b"{}"[..]),
        ("assets/m/textures/block/elm_hanging_sign.png", tex.as_slice()),
    ];
    let config = GateConfig::new("m", vec!["elm_hanging_sign".into()]);

    let archive = write_zip(dir.path(), &entries);
    let failure = rejected(validate_archive(&archive, &config));
    assert_eq!(failure.check, GateCheck::SignAssets);
    assert_eq!(failure.path, "assets/m/textures/entity/signs/hanging/elm.png");

    let mut complete = entries.clone();
    complete.push(("assets/m/textures/entity/signs/hanging/elm.png", tex.as_slice()));
    let archive = write_zip(dir.path(), &complete);
    assert!(validate_archive(&archive, &config).is_ok());
}

#[test]
fn test_unreadable_archive_is_an_error_not_a_rejection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mod.jar");
    std::fs::write(&path, b"definitely not a zip").unwrap();
    assert!(matches!(
        validate_archive(&path, &GateConfig::new("m", vec![])),
        Err(GateError::Archive(_))
    ));
}

/// INVARIANT: A compiled and packed mod passes its own gate
#[tokio::test]
async fn test_compiled_mod_passes_gate() {
    let spec = ModSpec::from_json(
        r#"{"modId":"woods","woodTypes":[{"id":"maple"}],
            "items":[{"id":"ruby"}],
            "blocks":[{"id":"ruby_block"},{"id":"ghost_block","dropsNothing":true}]}"#,
    )
    .unwrap();
    let compiler = ModCompiler::default();
    let compiled = compiler.compile(&spec, &MemorySource::new()).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("woods.jar");
    pack_resources(&compiled.files, &archive).unwrap();
    let config = compiler.gate_config(&compiled.spec);
    assert_eq!(config.no_drop_ids, vec!["ghost_block".to_string()]);
    assert!(validate_archive(&archive, &config).is_ok());
}

#[tokio::test]
async fn test_older_target_compiles_into_folders_its_gate_accepts() {
    let spec = ModSpec::from_json(r#"{"modId":"woods","woodTypes":[{"id":"maple"}]}"#).unwrap();
    let config = ForgeConfig::from_json(r#"{"targetVersion":"1.20.4","blockTextureSize":16}"#).unwrap();
    let compiler = ModCompiler::new(config);
    let compiled = compiler.compile(&spec, &MemorySource::new()).await.unwrap();

    assert!(compiled.file("data/woods/recipes/maple_planks.json").is_some());
    assert!(compiled.file("data/woods/loot_tables/blocks/maple_door.json").is_some());
    assert!(compiled.file("data/minecraft/tags/blocks/planks.json").is_some());
    assert!(compiled.file("data/woods/recipe/maple_planks.json").is_none());

    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("woods.jar");
    pack_resources(&compiled.files, &archive).unwrap();
    assert!(validate_archive(&archive, &compiler.gate_config(&compiled.spec)).is_ok());
}
