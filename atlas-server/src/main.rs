use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing::info;

use atlas_core::CountryCatalog;
use atlas_server::{
    config::Config, create_routes, room_store::RoomStore, session::SessionEngine,
    websocket::ConnectionManager,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting Atlas Arena server...");

    let config = Config::new();
    let connection_manager = Arc::new(ConnectionManager::new());

    info!("Loading countries from {}", config.countries_file);
    let catalog = match CountryCatalog::load(&config.countries_file) {
        Ok(catalog) => {
            info!("Loaded {} countries", catalog.len());
            Arc::new(catalog)
        }
        Err(e) => {
            tracing::error!(
                "Failed to load countries from '{}': {}",
                config.countries_file,
                e
            );
            tracing::error!("The server requires a GeoJSON country file to function.");
            tracing::error!(
                "Set COUNTRIES_FILE to a FeatureCollection whose features carry WB_A3 and NAME properties."
            );
            std::process::exit(1);
        }
    };

    let engine = SessionEngine::new(
        RoomStore::new(),
        catalog,
        connection_manager.clone(),
        config.cleanup_policy(),
        config.max_players_per_room,
    );

    let routes = create_routes(connection_manager.clone(), engine);

    // Periodic connection sweep; room lifecycle is event-driven inside the
    // engine and needs no sweeping
    let cleanup_connection_manager = connection_manager.clone();
    let connection_timeout = Duration::from_secs(config.connection_timeout_seconds);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        loop {
            interval.tick().await;
            cleanup_connection_manager
                .cleanup_inactive_connections(connection_timeout)
                .await;
        }
    });

    info!("Server starting on {}:{}", config.host, config.port);

    let addr = (
        config.host.parse::<std::net::IpAddr>().unwrap(),
        config.port,
    );

    let (addr, server) = warp::serve(routes).bind_with_graceful_shutdown(addr, async {
        // Wait for SIGINT (Ctrl+C) or SIGTERM
        #[cfg(unix)]
        {
            let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt()).unwrap();
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate()).unwrap();

            tokio::select! {
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully...");
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            signal::ctrl_c().await.expect("Failed to listen for ctrl+c");
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    });

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;
    info!("Server shutdown complete.");
}
