//! Dice Trivia Back binary entrypoint wiring REST, SSE and storage layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dice_trivia_back::{
    config::AppConfig,
    dao::document_store::memory::MemoryDocumentStore,
    routes,
    services::deadline_service,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let app_state = AppState::new(config);

    start_store_backend(app_state.clone()).await;

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Install the store backend selected by `STORE_BACKEND` (`memory`, or the
/// default MongoDB supervisor driven by `MONGO_URI`/`MONGO_DB`).
async fn start_store_backend(state: SharedState) {
    let backend = env::var("STORE_BACKEND").unwrap_or_default();
    if backend.eq_ignore_ascii_case("memory") {
        info!("using in-memory document store");
        state
            .install_document_store(Arc::new(MemoryDocumentStore::new()))
            .await;
        deadline_service::rearm_pending(&state).await;
        return;
    }

    spawn_mongo_supervisor(state);
}

#[cfg(feature = "mongo-store")]
fn spawn_mongo_supervisor(state: SharedState) {
    use std::time::Duration;

    use dice_trivia_back::{
        dao::document_store::{DocumentStore, mongodb::{MongoConfig, MongoDocumentStore}},
        dao::storage::StorageError,
        services::storage_supervisor,
    };

    let uri = env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".into());
    let db_name = env::var("MONGO_DB").ok();
    let poll_interval = Duration::from_millis(state.config().watch_poll_interval_ms);

    tokio::spawn(storage_supervisor::run(state, move || {
        let uri = uri.clone();
        let db_name = db_name.clone();
        async move {
            let config = MongoConfig::from_uri(&uri, db_name.as_deref(), poll_interval).await?;
            let store = MongoDocumentStore::connect(config).await?;
            Ok::<Arc<dyn DocumentStore>, StorageError>(Arc::new(store))
        }
    }));
}

#[cfg(not(feature = "mongo-store"))]
fn spawn_mongo_supervisor(state: SharedState) {
    use tracing::warn;

    warn!("built without the mongo-store feature; falling back to the in-memory store");
    tokio::spawn(async move {
        state
            .install_document_store(Arc::new(MemoryDocumentStore::new()))
            .await;
    });
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
