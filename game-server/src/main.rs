use std::sync::Arc;
use tokio::signal;
use tracing::info;

use game_core::words::WordList;
use game_persistence::StatsStore;
use game_server::{
    config::Config, create_routes, registry::RoomRegistry, websocket::ConnectionManager,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    info!("Starting word rooms server...");

    let config = Config::new();
    let connection_manager = Arc::new(ConnectionManager::new());

    let words_dir = std::env::var("WORDS_DIRECTORY").unwrap_or_else(|_| "./words".to_string());
    info!("Loading words from directory: {}", words_dir);
    let words = match WordList::from_dir(&words_dir) {
        Ok(words) => {
            info!("Loaded {} answer words", words.answer_count());
            Arc::new(words)
        }
        Err(e) => {
            tracing::error!("Failed to load words from directory '{}': {}", words_dir, e);
            tracing::error!(
                "The server needs an answers.txt (and optionally allowed.txt) to run."
            );
            tracing::error!("Set WORDS_DIRECTORY to a directory containing the word lists.");
            std::process::exit(1);
        }
    };

    // Stats are optional; without DATABASE_URL the server runs without them.
    let stats = Arc::new(StatsStore::from_env().await);
    if stats.is_enabled() {
        info!("Stats persistence enabled");
    }

    let registry = Arc::new(RoomRegistry::new(
        connection_manager,
        words,
        stats,
        config.clone(),
    ));
    let routes = create_routes(registry);

    info!("Server starting on {}:{}", config.host, config.port);

    let addr = (
        config
            .host
            .parse::<std::net::IpAddr>()
            .expect("Invalid HOST"),
        config.port,
    );

    let (addr, server) = warp::serve(routes).bind_with_graceful_shutdown(addr, async {
        // Wait for SIGINT (Ctrl+C) or SIGTERM
        #[cfg(unix)]
        {
            let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
                .expect("Failed to install SIGINT handler");
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler");

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
