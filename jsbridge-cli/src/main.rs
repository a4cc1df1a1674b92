// jsbridge-cli: CLI entry point for jsbridge tools (inspect, check-config).

mod inspect;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use jsbridge_runtime::BridgeConfig;

#[derive(Parser)]
#[command(name = "jsbridge", about = "jsbridge CLI: type record and config tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode an encoded type record and print its members.
    Inspect {
        /// File holding the record bytes.
        file: PathBuf,
        /// The file holds hex text (whitespace ignored) instead of raw bytes.
        #[arg(long)]
        hex: bool,
        /// Print the record as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Validate a jsbridge.toml and print the effective configuration.
    CheckConfig {
        /// Path to jsbridge.toml.
        #[arg(default_value = "jsbridge.toml")]
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Inspect { file, hex, json } => inspect::run_inspect(&file, hex, json),
        Commands::CheckConfig { file } => run_check_config(&file),
    };
    if let Err(message) = outcome {
        eprintln!("Error: {message}");
        std::process::exit(1);
    }
}

fn run_check_config(path: &std::path::Path) -> Result<(), String> {
    let config = BridgeConfig::load(path).map_err(|e| e.to_string())?;
    let effective = toml::to_string_pretty(&config).map_err(|e| e.to_string())?;
    println!("{} is valid. Effective configuration:\n", path.display());
    print!("{effective}");
    Ok(())
}
