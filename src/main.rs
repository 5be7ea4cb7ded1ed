use log::{error, info};
use relay::Dispatcher;
use service::{config::Config, logging::Logger, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config);

    let dispatcher = Arc::new(Dispatcher::new());
    let app_state = AppState::new(config.clone(), &dispatcher);

    // A port already in use is fatal at startup: abort with a diagnostic
    // rather than limping along on one transport.
    let api_listener = match TcpListener::bind(config.api_listen_addr()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(
                "Failed to bind API listener on {}: {e}",
                config.api_listen_addr()
            );
            std::process::exit(1);
        }
    };
    let duplex_listener = match TcpListener::bind(config.duplex_listen_addr()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(
                "Failed to bind WebSocket listener on {}: {e}",
                config.duplex_listen_addr()
            );
            std::process::exit(1);
        }
    };

    info!(
        "REST API server listening on http://{}",
        config.api_listen_addr()
    );
    info!(
        "WebSocket server listening on ws://{}",
        config.duplex_listen_addr()
    );

    let api_server = async {
        axum::serve(api_listener, web::define_routes(app_state.clone()))
            .with_graceful_shutdown(shutdown_signal("HTTP server"))
            .await
    };

    let duplex_server = async {
        axum::serve(
            duplex_listener,
            web::define_duplex_routes(app_state.clone())
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal("WebSocket server"))
        .await
    };

    // Long-lived streams never finish on their own, so on shutdown every
    // registered connection is closed to let the listeners drain.
    let connection_closer = async {
        shutdown_signal("connection registry").await;
        dispatcher.close_all();
    };

    // A post-startup failure on one listener is logged here while the
    // other keeps serving; join waits for all three either way.
    let (api_result, duplex_result, ()) = tokio::join!(api_server, duplex_server, connection_closer);
    if let Err(e) = api_result {
        error!("HTTP server error: {e}");
    }
    if let Err(e) = duplex_result {
        error!("WebSocket server error: {e}");
    }

    info!("Shutdown complete");
}

/// Resolves on SIGINT (Ctrl-C) or SIGTERM. Each listener awaits its own
/// copy so a single signal shuts everything down.
async fn shutdown_signal(subsystem: &str) {
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Termination signal received, shutting down {subsystem} gracefully");
}
