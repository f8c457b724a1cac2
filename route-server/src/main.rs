use route_server::config::AppConfig;
use route_server::store::{InMemoryStore, OriginFile};
use route_server::web::{AppState, create_router};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("route_server=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env();

    // Fixed origins survive restarts; a broken file must not stop the server.
    let store = match InMemoryStore::with_origin_file(OriginFile::new(&config.origin_file)) {
        Ok(store) => store,
        Err(e) => {
            warn!(path = %config.origin_file.display(), error = %e, "ignoring saved origins");
            InMemoryStore::new()
        }
    };

    let state = AppState::new(store, &config);
    let _tasks = state.start();

    let app = create_router(state);

    let addr = config.bind_addr;
    info!(%addr, "route server listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listen address");
    axum::serve(listener, app).await.expect("Server error");
}
