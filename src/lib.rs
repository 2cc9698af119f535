pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod observability;
pub mod provider;
pub mod routes;

use tower_http::{compression::CompressionLayer, trace::TraceLayer};

pub use config::Config;
pub use routes::AppState;

/// The API router wrapped in the HTTP middleware stack.
pub fn create_app(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(CompressionLayer::new().br(true).gzip(true))
        .layer(TraceLayer::new_for_http())
}
