//! CLI command implementations.

pub mod config;
pub mod esi;
pub mod evaluate;
pub mod translate;

use clap::{Args, Subcommand};

/// Arguments for the translate command.
#[derive(Args)]
pub struct TranslateArgs {
    /// Cache tags to translate.
    #[arg(required = true)]
    pub tags: Vec<String>,

    /// Print the deduplicated tag header value instead of one tag per line.
    #[arg(long)]
    pub join: bool,
}

/// Arguments for the esi command.
#[derive(Args)]
pub struct EsiArgs {
    #[command(subcommand)]
    pub command: EsiCommand,
}

#[derive(Subcommand)]
pub enum EsiCommand {
    /// Encode layout handles into the `h` parameter.
    Encode {
        /// Layout handles, in page order.
        handles: Vec<String>,
    },
    /// Decode an `h` parameter back into layout handles.
    Decode {
        /// Encoded parameter.
        param: String,
    },
    /// Build the fragment URL for a block.
    Url {
        /// Block name.
        #[arg(short, long)]
        block: String,

        /// Base URL (overrides `base_url` from the config).
        #[arg(long)]
        base_url: Option<String>,

        /// Layout handles, in page order.
        handles: Vec<String>,
    },
}

/// Arguments for the evaluate command.
#[derive(Args)]
pub struct EvaluateArgs {
    /// Scenario file (TOML, or JSON by extension).
    pub scenario: String,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Initialize a new config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the config file.
    Validate,
}
