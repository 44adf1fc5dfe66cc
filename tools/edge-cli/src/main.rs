//! Edge CLI - Offline tooling for the edge cache coordinator.
//!
//! Commands:
//! - `edge translate` - Translate cache tags to their compact form
//! - `edge esi` - Encode, decode and build ESI fragment URLs
//! - `edge evaluate` - Run a request scenario and print the emitted headers
//! - `edge config` - Manage configuration

mod commands;
mod config;
mod context;
mod output;
mod scenario;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ConfigArgs, EsiArgs, EvaluateArgs, TranslateArgs};

/// Edge CLI - Inspect surrogate cache decisions
#[derive(Parser)]
#[command(name = "edge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate cache tags to surrogate tags
    Translate(TranslateArgs),

    /// Encode and decode ESI layout handles
    Esi(EsiArgs),

    /// Evaluate a request scenario
    Evaluate(EvaluateArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // Setup output formatting
    let output = output::Output::new(cli.verbose, cli.json);

    // Load config
    let config_path = cli.config.as_deref();
    let ctx = match context::Context::load(config_path, output.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            output.error(&format!("{:#}", e));
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Translate(args) => commands::translate::run(args, &ctx),
        Commands::Esi(args) => commands::esi::run(args, &ctx),
        Commands::Evaluate(args) => commands::evaluate::run(args, &ctx),
        Commands::Config(args) => commands::config::run(args, &ctx),
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "edge=debug" } else { "edge=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
