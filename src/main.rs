use anyhow::Result;
use tokio::{net::TcpListener, signal};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sensor_registry::{api, config::Config, db::Database, sensors::SensorService};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env (ignore error if file absent; env vars may be set externally)
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    // RUST_LOG wins over the DEBUG-derived default
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let db = Database::open(&config.db_file);
    let service = SensorService::new(db);

    // A broken database is not fatal: the server still starts and every
    // data request fails with 500 until the file becomes usable.
    match service.initialize().await {
        Ok(seeded) => info!(db_file = %config.db_file.display(), seeded, "Database ready"),
        Err(e) => error!(
            db_file = %config.db_file.display(),
            error = ?e,
            "Cannot initialise the sensors database"
        ),
    }

    if config.debug {
        warn!("Debug mode enabled");
    }

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, api::router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
