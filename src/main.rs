use std::sync::Arc;

use business_chat::{
    app_state::AppState,
    config::AppConfig,
    database::{init::init_db, listener::StoreListener},
    repositories::{
        business_repository::PostgresBusinessDirectory, chat_repository::PostgresMessageStore,
    },
    routes::app_routes::create_router,
    websocket::change_feed::ChangeFeed,
};
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return;
        }
    };

    let db = match init_db(&config.database_url).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Error initializing the database: {}", e);
            return;
        }
    };

    let feed = ChangeFeed::new(config.feed_capacity);
    let store = Arc::new(PostgresMessageStore::new(db.clone()));

    // Kept alive for the lifetime of the server
    let _listener = match StoreListener::start(&config.database_url, feed.clone(), store.clone())
        .await
    {
        Ok(listener) => listener,
        Err(e) => {
            error!("Error starting the realtime listener: {}", e);
            return;
        }
    };

    let state = AppState::new(
        feed,
        store,
        Arc::new(PostgresBusinessDirectory::new(db)),
        &config.jwt_secret,
        config.inbox_window,
    );
    let app = create_router(state);

    info!("Server running on http://{}", config.bind_addr);

    if let Err(e) = axum::Server::bind(&config.bind_addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
    }
}

// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("failed to install signal handler: {}", e);
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

    info!("Signal received, starting graceful shutdown");
}
