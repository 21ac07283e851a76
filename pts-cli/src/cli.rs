use clap::{Parser, Subcommand};
use pts_telemetry::LogFormat;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pointscale")]
#[command(about = "Estimate scale service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every command. Unset flags fall back to the environment,
/// then the config file, then built-in defaults.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct CommonArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// SQLite URL, e.g. sqlite://pointscale.db; in-memory storage when unset
    #[arg(long)]
    pub database_url: Option<String>,

    /// Log output format: text or json
    #[arg(long)]
    pub log_format: Option<LogFormat>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        #[command(flatten)]
        common: CommonArgs,

        /// Server port
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind address
        #[arg(long)]
        host: Option<String>,

        /// OTLP collector endpoint for span export
        #[arg(long)]
        otlp_endpoint: Option<String>,
    },

    /// Apply pending schema migrations and exit
    Migrate {
        #[command(flatten)]
        common: CommonArgs,
    },
}
