//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection, reconciliation worker, realtime feed
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use electra_infra::ElectraConfig;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
///
/// Starts the reconciliation worker as a side effect; it lives as long as the router.
pub async fn build_app(config: ElectraConfig) -> anyhow::Result<Router> {
    let services = Arc::new(services::build_services(&config).await?);

    Ok(Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(Extension(services))
        .layer(ServiceBuilder::new()))
}
