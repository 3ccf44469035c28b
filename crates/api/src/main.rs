use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use satellite_api::config::SatelliteConfig;
use satellite_api::router::build_app_router;
use satellite_api::state::{AppState, Registries};
use satellite_core::remote::{HumanTaskSystem, ResourceDb};
use satellite_rpc::{CoreEndpoint, RpcHumanTaskSystem, RpcResourceDb};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "satellite_api=debug,satellite_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = SatelliteConfig::load().expect("Failed to load satellite configuration");
    tracing::info!(
        core_url = %config.slate_core_url,
        development = config.enable_development,
        "Loaded satellite configuration"
    );

    // --- Collaborator clients ---
    let endpoint = CoreEndpoint::new(&config.slate_core_url);
    let resource_db: Arc<dyn ResourceDb> = Arc::new(RpcResourceDb::new(endpoint.clone()));
    let hts: Arc<dyn HumanTaskSystem> = Arc::new(RpcHumanTaskSystem::new(endpoint));

    // --- Plugin discovery ---
    let catalog = satellite_plugins::builtin_catalog();
    let registries = Registries::new();
    let (resources, tasks) = registries
        .load(&config, &catalog, Arc::clone(&resource_db))
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Plugin discovery failed");
            panic!("Plugin discovery failed: {e}");
        });
    tracing::info!(
        resource_handlers = resources.len(),
        task_handlers = tasks.len(),
        "Plugins loaded"
    );

    // --- App state ---
    let state = AppState::new(&config, resources, tasks, resource_db, hts);
    let app = build_app_router(state);

    // --- Start server ---
    let addr = config.bind_addr();
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
