//! PlugHub Server, the runtime plugin host.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use plughub_api::{AppState, build_app};
use plughub_core::config::AppConfig;
use plughub_core::error::AppError;
use plughub_plugin::{
    ComponentRegistry, CompoundPluginRepository, ControllerCatalog, DispatchTable, PluginManager,
    RescanService, RouteRegistrar,
};

#[tokio::main]
async fn main() {
    let env = std::env::var("PLUGHUB_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting PlugHub v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Plugin roots ─────────────────────────────────────
    for dir in &config.plugins.directories {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| AppError::internal(format!("Failed to create dir '{dir}': {e}")))?;
    }
    let repository = CompoundPluginRepository::from_config(&config.plugins)?;
    tracing::info!(
        roots = repository.len(),
        mode = ?config.plugins.mode,
        "Plugin repository ready"
    );

    // ── Step 2: Compiled-in controllers ──────────────────────────
    let catalog = Arc::new(ControllerCatalog::new());
    plugin_weather::register(&catalog)?;

    // ── Step 3: Route registration + lifecycle ───────────────────
    let registrar = RouteRegistrar::new(
        Arc::new(DispatchTable::new()),
        Arc::new(ComponentRegistry::new()),
    );
    let manager = Arc::new(PluginManager::new(Arc::new(repository), catalog, registrar));

    if config.plugins.auto_load {
        let discovered = manager.discover().await?;
        let loaded = manager.load_all().await;
        tracing::info!(
            discovered = discovered.len(),
            loaded = loaded.len(),
            "Plugins auto-loaded"
        );
    }

    // ── Step 4: Background rescan ────────────────────────────────
    let (cancel_tx, cancel_rx) = tokio::sync::watch::channel(false);
    let rescan = match config.plugins.rescan_interval_seconds {
        0 => {
            tracing::info!("Plugin rescan disabled");
            None
        }
        seconds => {
            let service =
                RescanService::new(Arc::clone(&manager), Duration::from_secs(seconds));
            Some(tokio::spawn(async move { service.run(cancel_rx).await }))
        }
    };

    // ── Step 5: Build and start HTTP server ──────────────────────
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let addr = config.server.bind_address();
    let state = AppState::new(Arc::new(config), Arc::clone(&manager));
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!(address = %addr, "PlugHub server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    // ── Step 6: Stop rescanning, detach plugin routes ────────────
    let _ = cancel_tx.send(true);
    if let Some(handle) = rescan {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Plugin rescan task failed");
        }
    }

    match tokio::time::timeout(grace, manager.unload_all()).await {
        Ok(report) if report.is_clean() => tracing::info!("Plugins unloaded cleanly"),
        Ok(report) => tracing::warn!(
            absent = report.absent.len(),
            failed = report.failed.len(),
            "Plugins unloaded with errors"
        ),
        Err(_) => tracing::warn!(grace_seconds = grace.as_secs(), "Plugin unload timed out"),
    }

    tracing::info!("PlugHub server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
