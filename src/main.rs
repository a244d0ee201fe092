//! BMP conformance harness
//!
//! Runs an external image comparer or converter against a fixture tree and
//! reports one OK/FAILED line per case plus a final summary.

use std::path::PathBuf;

use clap::Parser;
use commands::Commands;
use conformance::common::{logging, HarnessConfig};
use conformance::{cli, commands};

#[derive(Parser)]
#[command(name = "conformance", about = "Conformance harness for BMP comparer and converter tools")]
#[command(version, long_about = None)]
struct Cli {
    /// TOML file overriding the expected messages and exit codes
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable coloured verdict tags
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    logging::init_cli();

    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }

    let result = match HarnessConfig::load(cli.config.as_deref()) {
        Ok(config) => cli::dispatch(cli.command, &config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(summary) => {
            summary.print();
            std::process::exit(summary.exit_code());
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}
