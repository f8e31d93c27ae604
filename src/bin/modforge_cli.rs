//! ModForge CLI - Bridge interface for the build orchestrator
//!
//! Commands: templates, map, resolve, compile, gate
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 on validation or gate failure

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use modforge_core::{
    archive::pack_resources,
    gate::{validate_archive, GateConfig, GateError},
    pipeline::{CompileError, ExportedFile},
    resolver::resolve,
    source::VanillaSource,
    templates::{ItemRendering, TemplateRegistry},
    writer::write_tree,
    ForgeConfig, ModCompiler, ModSpec,
};

#[derive(Parser)]
#[command(name = "modforge-cli")]
#[command(about = "ModForge CLI - Mod Asset Compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a ForgeConfig JSON file (MODFORGE_* variables override it)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Vanilla asset source: extracted directory or client .jar/.zip
    #[arg(long, global = true)]
    vanilla: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List block shape templates
    Templates,

    /// Plan the file tree for a specification without rendering textures
    Map {
        /// Specification JSON file
        #[arg(short, long)]
        spec: PathBuf,
    },

    /// Resolve the textures a vanilla block depends on
    Resolve {
        /// Vanilla block id, e.g. oak_door
        #[arg(short, long)]
        template: String,
    },

    /// Compile a specification into a mod resource tree
    Compile {
        /// Specification JSON file
        #[arg(short, long)]
        spec: PathBuf,

        /// Write the tree under this directory
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Pack the tree into this zip and run the gate on it
        #[arg(short, long)]
        archive: Option<PathBuf>,

        /// Include every file (base64) in the JSON output
        #[arg(long)]
        files: bool,
    },

    /// Run the build validation gate on a packaged archive
    Gate {
        /// Archive to validate
        #[arg(short, long)]
        archive: PathBuf,

        /// Specification the archive was built from
        #[arg(short, long)]
        spec: Option<PathBuf>,

        /// Gate settings JSON (GateConfig); used when no spec is given
        #[arg(short, long)]
        payload: Option<String>,
    },
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => println!(r#"{{"success": false, "error": "Serialization failed: {}"}}"#, e),
    }
}

fn failure(error: impl std::fmt::Display) -> ExitCode {
    print_json(&json!({ "success": false, "error": error.to_string() }));
    ExitCode::FAILURE
}

fn load_config(path: Option<&Path>, vanilla: Option<PathBuf>) -> Result<ForgeConfig, String> {
    let base = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p).map_err(|e| format!("Failed to read {}: {}", p.display(), e))?;
            ForgeConfig::from_json(&text).map_err(|e| e.to_string())?
        }
        None => ForgeConfig::default(),
    };
    let mut config = base.with_overrides(|key| std::env::var(key).ok()).map_err(|e| e.to_string())?;
    if vanilla.is_some() {
        config.vanilla_source = vanilla;
    }
    Ok(config)
}

fn load_spec(path: &Path) -> Result<ModSpec, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    ModSpec::from_json(&text).map_err(|e| e.to_string())
}

fn gate_result(result: Result<(), GateError>) -> ExitCode {
    match result {
        Ok(()) => {
            print_json(&json!({ "ok": true }));
            ExitCode::SUCCESS
        }
        Err(GateError::Rejected(f)) => {
            print_json(&json!({ "ok": false, "failure": f }));
            ExitCode::from(2)
        }
        Err(e) => failure(e),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .without_time()
        .compact()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = match load_config(cli.config.as_deref(), cli.vanilla) {
        Ok(c) => c,
        Err(e) => return failure(format!("Invalid configuration: {}", e)),
    };

    match cli.command {
        Commands::Templates => {
            let registry = TemplateRegistry::builtin();
            let templates: Vec<_> = registry
                .list()
                .iter()
                .map(|t| {
                    let item = match t.item {
                        ItemRendering::BlockModel(suffix) => format!("block{}", suffix),
                        ItemRendering::Generated => "generated".to_string(),
                    };
                    let models: Vec<&str> = t.models.iter().map(|m| m.suffix).collect();
                    json!({
                        "shape": t.shape,
                        "models": models,
                        "textures": t.textures,
                        "item": item,
                        "entityTexture": t.entity_texture_dir,
                    })
                })
                .collect();
            print_json(&templates);
            ExitCode::SUCCESS
        }

        Commands::Map { spec } => {
            let spec = match load_spec(&spec) {
                Ok(s) => s,
                Err(e) => return failure(e),
            };
            match ModCompiler::new(config).plan(&spec) {
                Ok((_, files)) => {
                    print_json(&json!({ "success": true, "files": files }));
                    ExitCode::SUCCESS
                }
                Err(e) => failure(e),
            }
        }

        Commands::Resolve { template } => {
            let source = match VanillaSource::open(config.vanilla_source.as_deref()) {
                Ok(s) => s,
                Err(e) => return failure(e),
            };
            let deps = resolve(&template, &source).await;
            print_json(&json!({ "template": template, "dependencies": deps }));
            ExitCode::SUCCESS
        }

        Commands::Compile { spec, out, archive, files } => {
            let spec = match load_spec(&spec) {
                Ok(s) => s,
                Err(e) => return failure(e),
            };
            let source = match VanillaSource::open(config.vanilla_source.as_deref()) {
                Ok(s) => s,
                Err(e) => return failure(e),
            };
            let compiler = ModCompiler::new(config);
            let compiled = match compiler.compile(&spec, &source).await {
                Ok(c) => c,
                Err(e @ CompileError::Write(_)) => {
                    print_json(&json!({ "success": false, "error": e.to_string() }));
                    return ExitCode::from(2);
                }
                Err(e) => return failure(e),
            };

            if let Some(dir) = &out {
                if let Err(e) = write_tree(dir, &compiled.files).await {
                    return failure(e);
                }
                info!(dir = %dir.display(), "tree written");
            }

            let mut gate = serde_json::Value::Null;
            if let Some(path) = &archive {
                if let Err(e) = pack_resources(&compiled.files, path) {
                    return failure(e);
                }
                match validate_archive(path, &compiler.gate_config(&compiled.spec)) {
                    Ok(()) => gate = json!({ "ok": true }),
                    Err(GateError::Rejected(f)) => {
                        print_json(&json!({ "success": false, "manifest": compiled.manifest, "gate": { "ok": false, "failure": f } }));
                        return ExitCode::from(2);
                    }
                    Err(e) => return failure(e),
                }
            }

            let exported: Vec<ExportedFile> = if files {
                compiled.files.iter().filter_map(ExportedFile::from_file).collect()
            } else {
                vec![]
            };
            print_json(&json!({
                "success": true,
                "manifest": compiled.manifest,
                "gate": gate,
                "files": exported,
            }));
            ExitCode::SUCCESS
        }

        Commands::Gate { archive, spec, payload } => {
            let gate_config = match (spec, payload) {
                (Some(path), _) => {
                    let spec = match load_spec(&path) {
                        Ok(s) => s,
                        Err(e) => return failure(e),
                    };
                    let compiler = ModCompiler::new(config);
                    match compiler.expand(&spec) {
                        Ok(expanded) => compiler.gate_config(&expanded),
                        Err(e) => return failure(e),
                    }
                }
                (None, Some(payload)) => match serde_json::from_str::<GateConfig>(&payload) {
                    Ok(c) => c,
                    Err(e) => return failure(format!("Invalid payload: {}", e)),
                },
                (None, None) => return failure("gate needs --spec or --payload"),
            };
            gate_result(validate_archive(&archive, &gate_config))
        }
    }
}
