//! # Accessor Description Inspector
//!
//! Command-line tool that loads accessor description files, validates them and shows
//! the callable surface an instance of each would expose.

use accessor_core::config::RuntimeConfigLoader;
use accessor_core::description::AccessorDescription;
use accessor_core::runtime::{entry_points_for, EntryPointKind};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "accessor-describe")]
#[command(about = "Validate accessor descriptions and show their entry points")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate description files
    Validate {
        /// Description JSON files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show the entry points a description produces
    EntryPoints {
        /// Description JSON file
        file: PathBuf,
    },

    /// Show the effective runtime configuration
    Config {
        /// Runtime configuration file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    let result = match &cli.command {
        Commands::Validate { files } => validate(&cli, files),
        Commands::EntryPoints { file } => show_entry_points(&cli, file),
        Commands::Config { file } => show_config(&cli, file.as_ref()),
    };

    match result {
        Ok(()) => {
            info!("accessor-describe completed successfully");
            process::exit(0);
        }
        Err(e) => {
            error!("accessor-describe failed: {}", e);
            eprintln!("❌ {e}");
            process::exit(1);
        }
    }
}

fn load(file: &PathBuf) -> Result<AccessorDescription, Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(file)
        .map_err(|e| format!("could not read {}: {e}", file.display()))?;
    let description = AccessorDescription::from_json(&json)?;
    description.validate()?;
    Ok(description)
}

fn validate(cli: &Cli, files: &[PathBuf]) -> Result<(), Box<dyn std::error::Error>> {
    let mut failures = 0;
    let mut reports = Vec::new();

    for file in files {
        match load(file) {
            Ok(description) => {
                if cli.format == OutputFormat::Table {
                    println!(
                        "✅ {} ({}): {} ports, {} parameters",
                        file.display(),
                        description.name,
                        description.ports.len(),
                        description.parameters.len()
                    );
                }
                reports.push(serde_json::json!({
                    "file": file.display().to_string(),
                    "name": description.name,
                    "valid": true,
                }));
            }
            Err(e) => {
                failures += 1;
                if cli.format == OutputFormat::Table {
                    println!("❌ {}: {e}", file.display());
                }
                reports.push(serde_json::json!({
                    "file": file.display().to_string(),
                    "valid": false,
                    "error": e.to_string(),
                }));
            }
        }
    }

    if cli.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    if failures > 0 {
        return Err(format!("{failures} of {} descriptions are invalid", files.len()).into());
    }
    Ok(())
}

fn show_entry_points(cli: &Cli, file: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let description = load(file)?;
    let entry_points = entry_points_for(&description);

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entry_points)?),
        OutputFormat::Table => {
            println!("📋 {} (code: {})", description.name, description.code);
            println!();
            println!("{:<24} {:<12}", "PORT", "ENTRY POINT");
            for entry in &entry_points {
                let kind = match entry.kind {
                    EntryPointKind::Read => "read",
                    EntryPointKind::Write => "write",
                    EntryPointKind::Subscribe => "subscribe",
                    EntryPointKind::Init => "init",
                    EntryPointKind::Wrapup => "wrapup",
                };
                println!("{:<24} {:<12}", entry.port, kind);
            }
        }
    }
    Ok(())
}

fn show_config(cli: &Cli, file: Option<&PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let mut loader = RuntimeConfigLoader::new();
    if let Some(file) = file {
        loader = loader.with_file(file);
    }
    let config = loader.load()?;

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Table => {
            println!("🔧 Runtime configuration");
            println!("  environment:               {}", config.environment);
            println!("  dispatch_timeout_ms:       {:?}", config.dispatch_timeout_ms);
            println!("  init_timeout_ms:           {:?}", config.init_timeout_ms);
            println!("  observer_channel_capacity: {}", config.observer_channel_capacity);
            println!("  log_format:                {:?}", config.log_format);
        }
    }
    Ok(())
}
