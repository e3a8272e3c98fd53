// src/api.rs
//! Static host for the published artifact.
//!
//! `GET /news.json` serves the file the producer writes, with `no-cache` so every
//! popup fetch revalidates. CORS is wide open because the popup runs on an
//! extension origin.

use std::path::Path;

use axum::{
    http::{header::CACHE_CONTROL, HeaderValue},
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeFile, set_header::SetResponseHeaderLayer};

pub const ARTIFACT_ROUTE: &str = "/news.json";

pub fn router(artifact_path: &Path) -> Router {
    let artifact = Router::new()
        .route_service(ARTIFACT_ROUTE, ServeFile::new(artifact_path))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-cache"),
        ));

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .merge(artifact)
        .layer(CorsLayer::very_permissive())
}
