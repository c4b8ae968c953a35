//! formdash telemetry server
//!
//! - `GET /metrics`  : scrape endpoint
//! - `POST /v1/track`: instrumentation ingestion
//! - `GET /healthz`  : liveness

use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};

use formdash_server::{app_state, config, router};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "formdash.yaml".to_string());
    let cfg = config::load_from_file(&path).expect("config load failed");
    let listen: SocketAddr = cfg
        .server
        .listen
        .parse()
        .expect("server.listen must be a valid SocketAddr");

    let state = app_state::AppState::new(cfg).expect("app state init failed");
    let app = router::build_router(state);

    tracing::info!(%listen, config = %path, "formdash-server starting");
    let listener = tokio::net::TcpListener::bind(listen).await.expect("failed to bind");

    axum::serve(listener, app).await.expect("server failed");
}
