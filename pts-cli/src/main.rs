use anyhow::Result;
use clap::Parser;
use pts_cli::cli::{Cli, Commands};
use pts_cli::config::{Overrides, Settings};
use pts_cli::serve;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { common, port, host, otlp_endpoint } => {
            let overrides = Overrides {
                host,
                port,
                database_url: common.database_url,
                otlp_endpoint,
                log_format: common.log_format,
            };
            let settings = Settings::load(overrides, common.config.as_deref())?;
            serve::init_logging(&settings);
            serve::run_serve(settings).await
        }
        Commands::Migrate { common } => {
            let overrides = Overrides {
                database_url: common.database_url,
                log_format: common.log_format,
                ..Overrides::default()
            };
            let settings = Settings::load(overrides, common.config.as_deref())?;
            serve::init_logging(&settings);
            let url = settings
                .database_url
                .ok_or_else(|| anyhow::anyhow!("a database url is required to migrate"))?;
            let version = serve::run_migrate(&url).await?;
            println!("schema at version {version}");
            Ok(())
        }
    }
}
