mod commands;
mod config;
mod logging;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use commands::Context;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Laboratory service request toolkit.
#[derive(Parser)]
#[command(name = "labreq", version, about = "Laboratory service request toolkit")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Path to the TOML config file (default: ./labreq.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalog file or http(s) URL, overriding the config
    #[arg(long, global = true)]
    catalog: Option<String>,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the service catalog as categories, services and fields
    Catalog,

    /// Validate a request document; exits 1 when it has errors
    Check {
        /// Path to the request JSON document
        request: PathBuf,
    },

    /// Print the normalized submission payload for a request document
    Payload {
        /// Path to the request JSON document
        request: PathBuf,
    },

    /// Print the selected services grouped by category
    Review {
        /// Path to the request JSON document
        request: PathBuf,
    },

    /// Validate and submit a request document through the configured sink
    Submit {
        /// Path to the request JSON document
        request: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            report_error(&e.to_string(), cli.output, cli.quiet);
            process::exit(1);
        }
    };
    logging::init(&config.logging);
    tracing::debug!(config = ?cli.config, output = ?cli.output, "starting");

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(&format!("failed to create tokio runtime: {}", e), cli.output, cli.quiet);
            process::exit(1);
        }
    };

    let ctx = Context {
        config,
        catalog: cli.catalog,
        output: cli.output,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Catalog => runtime.block_on(commands::catalog::cmd_catalog(&ctx)),
        Commands::Check { request } => runtime.block_on(commands::check::cmd_check(&ctx, &request)),
        Commands::Payload { request } => {
            runtime.block_on(commands::payload::cmd_payload(&ctx, &request))
        }
        Commands::Review { request } => runtime.block_on(commands::review::cmd_review(&ctx, &request)),
        Commands::Submit { request } => runtime.block_on(commands::submit::cmd_submit(&ctx, &request)),
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("error: {}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
