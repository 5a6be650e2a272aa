use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mediastore_core::{
    create_authenticator, create_notifier, load_config, validate_config, Authenticator,
    CatalogStore, NextcloudClient, PaymentClient, RemoteFileClient, SalesStore,
    SqliteCatalogStore, SqliteSalesStore, StripeClient,
};
use mediastore_server::api::create_router;
use mediastore_server::state::{AppState, Backends};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("MEDIASTORE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    // Fingerprint of the effective config, to tell deployments apart in logs
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        config_hash = &config_hash[..16],
        auth = ?config.auth.method,
        payment_mode = %config.payment.mode,
        database = ?config.database.path,
        "Configuration loaded"
    );

    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    let catalog: Arc<dyn CatalogStore> = Arc::new(
        SqliteCatalogStore::new(&config.database.path).context("Failed to create catalog store")?,
    );
    let sales: Arc<dyn SalesStore> = Arc::new(
        SqliteSalesStore::new(&config.database.path).context("Failed to create sales store")?,
    );
    info!("Stores initialized");

    let remote: Arc<dyn RemoteFileClient> = Arc::new(
        NextcloudClient::new(config.remote.clone()).context("Failed to create file host client")?,
    );
    info!(
        "File host client initialized ({}, root folder {:?})",
        config.remote.url, config.remote.root_folder
    );

    let payments: Arc<dyn PaymentClient> = Arc::new(
        StripeClient::new(config.payment.clone()).context("Failed to create payment client")?,
    );

    let notifier =
        create_notifier(&config.notifications).context("Failed to create notifier")?;
    if config.notifications.smtp.is_none() {
        info!("SMTP not configured, notifications are only logged");
    }

    tokio::fs::create_dir_all(&config.store.thumbnail_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create thumbnail directory {:?}",
                config.store.thumbnail_dir
            )
        })?;

    let state = Arc::new(AppState::new(
        config.clone(),
        authenticator,
        Backends {
            catalog,
            sales,
            remote,
            payments,
            notifier,
        },
    ));

    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
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
