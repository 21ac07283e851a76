use crate::config::Settings;
use anyhow::Result;
use pts_estimate::InMemoryEstimateService;
use pts_server::{ServerConfig, create_app};
use pts_telemetry::{init_telemetry, init_with_otlp, shutdown_telemetry};
use std::sync::Arc;

/// Sets up logging for the process; failures are reported and otherwise ignored.
pub fn init_logging(settings: &Settings) {
    let result = match &settings.otlp_endpoint {
        Some(endpoint) => init_with_otlp("pointscale", endpoint, settings.log_format),
        None => init_telemetry("pointscale", settings.log_format),
    };
    if let Err(e) = result {
        eprintln!("Failed to initialize telemetry: {}", e);
    }
}

/// Builds the router configuration over the storage backend the settings select.
pub async fn server_config(settings: &Settings) -> Result<ServerConfig> {
    let config = match &settings.database_url {
        Some(url) => database_backend(url).await?,
        None => {
            tracing::warn!("no database configured, estimates are kept in memory");
            ServerConfig::from_backend(Arc::new(InMemoryEstimateService::new()))
        }
    };
    Ok(config.with_security(settings.security.clone()))
}

#[cfg(feature = "database")]
async fn database_backend(url: &str) -> Result<ServerConfig> {
    let service = pts_estimate::DatabaseEstimateService::new(url).await?;
    service.migrate().await?;
    tracing::info!(schema.version = service.schema_version().await?, "database ready");
    Ok(ServerConfig::from_backend(Arc::new(service)))
}

#[cfg(not(feature = "database"))]
async fn database_backend(_url: &str) -> Result<ServerConfig> {
    anyhow::bail!("pointscale was built without the `database` feature")
}

/// Applies pending migrations and returns the resulting schema version.
#[cfg(feature = "database")]
pub async fn run_migrate(url: &str) -> Result<i64> {
    let service = pts_estimate::DatabaseEstimateService::new(url).await?;
    service.migrate().await?;
    Ok(service.schema_version().await?)
}

#[cfg(not(feature = "database"))]
pub async fn run_migrate(_url: &str) -> Result<i64> {
    anyhow::bail!("pointscale was built without the `database` feature")
}

pub async fn run_serve(settings: Settings) -> Result<()> {
    let app = create_app(server_config(&settings).await?);

    let addr = settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Pointscale server listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("server stopped");
    shutdown_telemetry();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FileConfig, Overrides};

    fn settings(database_url: Option<&str>) -> Settings {
        let overrides =
            Overrides { database_url: database_url.map(String::from), ..Overrides::default() };
        Settings::resolve(overrides, |_| None, FileConfig::default())
    }

    #[tokio::test]
    async fn test_in_memory_backend_without_database_url() {
        assert!(server_config(&settings(None)).await.is_ok());
    }

    #[cfg(feature = "database")]
    #[tokio::test]
    async fn test_migrate_reports_latest_version() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("pts.db").display());
        assert_eq!(run_migrate(&url).await.unwrap(), 4);
        assert_eq!(run_migrate(&url).await.unwrap(), 4);
        assert!(server_config(&settings(Some(&url))).await.is_ok());
    }
}
