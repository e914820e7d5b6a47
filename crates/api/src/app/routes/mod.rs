use axum::{Router, routing::post};

pub mod alerts;
pub mod orders;
pub mod products;
pub mod system;

/// Router for all application endpoints (authentication is out of scope).
pub fn router() -> Router {
    Router::new()
        .route("/reconcile", post(system::reconcile_now))
        .nest("/products", products::router())
        .nest("/orders", orders::router())
        .nest("/alerts", alerts::router())
}
