//! Documentation of a data-visualization dashboard backend.
//!
//! # General Infrastructure
//! - Meilisearch holds the imported records; every filter dimension is a
//!   filterable attribute
//! - This server proxies the store behind two routes and serves records to
//!   whichever frontend consumes the library side
//! - `POST /api/data/import` bulk-loads the local dataset file, one-shot
//! - `GET /api/data` returns the records matching the query-string filters,
//!   `all` or absent meaning unrestricted
//!
//! # Dashboard Core
//! The interesting logic lives on the library side:
//! - [`aggregate`]: one pass over a record list computes every chart view
//! - [`dashboard`]: filter state, option lists, and the generation counter
//!   that discards stale fetches
//!
//! # Setup
//!
//! Environment:
//! - `RUST_PORT` (default 5000)
//! - `MEILI_URL` (default http://localhost:7700)
//! - `DATASET_PATH` (default jsondata.json)
//! - secret `MEILI_ADMIN_KEY` under `/run/secrets`
//!
//! Run the server, then import once:
//! ```sh
//! curl -X POST http://localhost:5000/api/data/import
//! ```
use std::time::Duration;

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod aggregate;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod records;
pub mod remote;
pub mod routes;
pub mod state;
pub mod store;

use routes::{data_handler, import_handler};
use state::AppState;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await;

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let app = Router::new()
        .route("/api/data", get(data_handler))
        .route("/api/data/import", post(import_handler))
        .layer(cors)
        .with_state(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
