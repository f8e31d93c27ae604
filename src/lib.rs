//! ModForge Core - Mod Asset Compiler
//!
//! # The Laws (Non-Negotiable)
//! 1. Same Specification, Same Bytes
//! 2. Every Requested Key Yields a Complete Asset Set
//! 3. Validation Is Mandatory
//! 4. Resolve Templates, Never Guess Paths
//! 5. The Gate Judges the Archive, Not the Plan
//! 6. Run State Lives in the Run

pub mod archive;
pub mod classify;
pub mod config;
pub mod emit;
pub mod gate;
pub mod hashing;
pub mod mapper;
pub mod pipeline;
pub mod png;
pub mod profile;
pub mod resolver;
pub mod source;
pub mod spec;
pub mod synth;
pub mod templates;
pub mod transform;
pub mod validation;
pub mod writer;

pub use config::ForgeConfig;
pub use gate::{validate_archive, GateConfig, GateError, GateFailure};
pub use hashing::{canonical_json, compute_manifest_hash, compute_tree_hash};
pub use mapper::{FileContents, MaterializedFile, Mapper};
pub use pipeline::{BuildManifest, CompileError, CompiledMod, ModCompiler};
pub use resolver::{resolve, VanillaDependencies};
pub use source::{AssetSource, DirectorySource, MemorySource, VanillaSource};
pub use spec::{expand, AssetKey, AssetKind, ExpandedSpec, ModSpec};
pub use validation::{ValidationResult, ValidationRule, ValidationViolation, ViolationSeverity};
pub use writer::{write_tree, RunContext};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
