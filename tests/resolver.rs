//! Resolver Faithfulness Tests
//!
//! The resolver may only report paths it read out of parsed JSON.

use modforge_core::{resolve, source::MemorySource};

fn door_source() -> MemorySource {
    MemorySource::new()
        .with(
            "assets/minecraft/blockstates/oak_door.json",
            r#"{"variants":{
                "facing=east,half=lower,hinge=left,open=false":{"model":"minecraft:block/oak_door_bottom_left"},
                "facing=east,half=upper,hinge=left,open=false":[
                    {"model":"minecraft:block/oak_door_top_left"},
                    {"model":"minecraft:block/oak_door_top_left","y":90}
                ]}}"#,
        )
        .with(
            "assets/minecraft/models/block/oak_door_bottom_left.json",
            r#"{"parent":"minecraft:block/door_bottom_left","textures":{"bottom":"minecraft:block/oak_door_bottom","top":"minecraft:block/oak_door_top"}}"#,
        )
        .with(
            "assets/minecraft/models/block/oak_door_top_left.json",
            r#"{"parent":"minecraft:block/door_top_left","textures":{"bottom":"minecraft:block/oak_door_bottom","top":"minecraft:block/oak_door_top"}}"#,
        )
        .with(
            "assets/minecraft/models/block/door_bottom_left.json",
            r##"{"textures":{"particle":"#bottom"},"elements":[]}"##,
        )
        .with(
            "assets/minecraft/models/block/door_top_left.json",
            r##"{"textures":{"particle":"#top"},"elements":[]}"##,
        )
        // Present in the source, named like a door texture, never referenced.
        .with("assets/minecraft/textures/block/oak_door_side.png", vec![0u8; 8])
}

/// INVARIANT: exactly the referenced textures, nothing guessed
#[tokio::test]
async fn test_returns_exactly_the_referenced_textures() {
    let deps = resolve("oak_door", &door_source()).await;
    assert_eq!(
        deps.texture_paths,
        vec![
            "assets/minecraft/textures/block/oak_door_bottom.png".to_string(),
            "assets/minecraft/textures/block/oak_door_top.png".to_string(),
        ]
    );
    assert_eq!(
        deps.model_paths,
        vec![
            "assets/minecraft/models/block/door_bottom_left.json".to_string(),
            "assets/minecraft/models/block/door_top_left.json".to_string(),
            "assets/minecraft/models/block/oak_door_bottom_left.json".to_string(),
            "assets/minecraft/models/block/oak_door_top_left.json".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_unknown_template_yields_nothing() {
    let deps = resolve("spruce_door", &door_source()).await;
    assert!(deps.is_empty());
    assert!(deps.texture_paths.is_empty());
}

#[tokio::test]
async fn test_malformed_blockstate_yields_nothing() {
    let source = MemorySource::new().with("assets/minecraft/blockstates/oak_door.json", "{\"variants\":");
    assert!(resolve("oak_door", &source).await.is_empty());
}

#[tokio::test]
async fn test_parent_indirection_resolves_through_child_map() {
    let source = MemorySource::new()
        .with(
            "assets/minecraft/blockstates/oak_planks.json",
            r#"{"variants":{"":{"model":"block/oak_planks"}}}"#,
        )
        .with(
            "assets/minecraft/models/block/oak_planks.json",
            r#"{"parent":"block/cube_all","textures":{"all":"block/oak_planks"}}"#,
        )
        .with(
            "assets/minecraft/models/block/cube_all.json",
            r##"{"parent":"block/cube","textures":{"particle":"#all","down":"#all","up":"#all"}}"##,
        )
        .with(
            "assets/minecraft/models/block/cube.json",
            r##"{"textures":{"particle":"#down"}}"##,
        );
    let deps = resolve("oak_planks", &source).await;
    assert_eq!(deps.texture_paths, vec!["assets/minecraft/textures/block/oak_planks.png".to_string()]);
    assert_eq!(deps.model_paths.len(), 3);
}
