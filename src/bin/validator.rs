//! Game Data Validator CLI
//!
//! Validates game configuration documents against the game grammar.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use game_grammar::{GameCatalog, GameDataValidator, StatRegistry, ValidatorConfig};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "gamedata-validator")]
#[command(about = "Validate game configuration documents")]
struct Cli {
    /// Config file layered over the default locations
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate documents; directories are searched for .json files
    Check {
        /// Documents or directories (defaults to the configured document)
        paths: Vec<PathBuf>,
        /// Also require every statistic class to be registered
        #[arg(long)]
        stats: bool,
    },

    /// Print a compiled grammar tree
    Tree {
        /// Tree label ("game" or "stats")
        #[arg(short, long, default_value = "game")]
        label: String,
    },

    /// List the statistic kinds documents may name
    Kinds,

    /// Print the resolved game catalog of a document
    Catalog {
        path: Option<PathBuf>,
    },

    /// Generate a validation report
    Report {
        paths: Vec<PathBuf>,
        /// Output file (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match ValidatorConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(cli.command, &config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands, config: &ValidatorConfig) -> anyhow::Result<()> {
    let validator = GameDataValidator::with_grammars(&config.game_table()?, &config.stat_spec()?)
        .context("failed to compile grammars")?;
    let registry = StatRegistry::default();

    match command {
        Commands::Check { paths, stats } => {
            let documents = collect_documents(&paths, config)?;
            let mut failures = 0;

            for path in &documents {
                match check_document(&validator, &registry, path, stats) {
                    Ok(()) => println!("✅ {}", path.display()),
                    Err(e) => {
                        failures += 1;
                        println!("❌ {}", path.display());
                        println!("   └─ {:#}", e);
                    }
                }
            }

            println!();
            if failures > 0 {
                bail!("{} of {} document(s) rejected", failures, documents.len());
            }
            println!("✅ {} document(s) valid", documents.len());
            Ok(())
        }

        Commands::Tree { label } => {
            let trees = validator.trees();
            let tree = trees.get(&label).with_context(|| {
                format!(
                    "no grammar tree labelled \"{}\" (known: {})",
                    label,
                    trees.labels().collect::<Vec<_>>().join(", ")
                )
            })?;
            print!("{}", tree);
            Ok(())
        }

        Commands::Kinds => {
            for kind in registry.kinds() {
                println!("{}", kind);
            }
            Ok(())
        }

        Commands::Catalog { path } => {
            let path = path.unwrap_or_else(|| config.document.path.clone());
            let document = read_document(&path)?;
            validator.verify_data(&document)?;
            let catalog = GameCatalog::from_document(&document)?;
            println!("{}", config.output.format.render(&catalog)?);
            Ok(())
        }

        Commands::Report { paths, output } => {
            let documents = collect_documents(&paths, config)?;
            let results: Vec<Value> = documents
                .iter()
                .map(|path| {
                    let result = check_document(&validator, &registry, path, true);
                    serde_json::json!({
                        "path": path.display().to_string(),
                        "valid": result.is_ok(),
                        "error": result.err().map(|e| format!("{:#}", e)),
                    })
                })
                .collect();

            let rejected = results.iter().filter(|r| r["valid"] == false).count();
            let report = serde_json::json!({
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "documents": results.len(),
                "rejected": rejected,
                "results": results,
            });

            let report_json = config.output.format.render(&report)?;
            if let Some(path) = output {
                std::fs::write(&path, &report_json)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("✅ Report written to {:?}", path);
            } else {
                println!("{}", report_json);
            }
            Ok(())
        }
    }
}

fn check_document(
    validator: &GameDataValidator,
    registry: &StatRegistry,
    path: &Path,
    stats: bool,
) -> anyhow::Result<()> {
    let document = read_document(path)?;
    validator.verify_data(&document)?;
    if stats {
        validator.verify_stat_classes(&document, registry)?;
    }
    Ok(())
}

fn read_document(path: &Path) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Expand directories into the `.json` files beneath them, sorted
fn collect_documents(paths: &[PathBuf], config: &ValidatorConfig) -> anyhow::Result<Vec<PathBuf>> {
    if paths.is_empty() {
        return Ok(vec![config.document.path.clone()]);
    }

    let mut documents = Vec::new();
    for path in paths {
        if !path.is_dir() {
            documents.push(path.clone());
            continue;
        }
        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().map(|x| x == "json").unwrap_or(false))
            .map(|e| e.into_path())
            .collect();
        found.sort();
        debug!(dir = %path.display(), documents = found.len(), "collected documents");
        documents.extend(found);
    }

    if documents.is_empty() {
        bail!("no documents found");
    }
    info!(documents = documents.len(), "checking documents");
    Ok(documents)
}
