use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use electra_core::ProductId;
use electra_inventory::ProductStatus;

use crate::app::services::{self, AppServices};
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_product).get(list_products))
        .route("/:id", get(get_product))
        .route("/:id/adjust", post(adjust_stock))
        .route("/:id/status", post(set_status))
}

fn parse_id(id: &str) -> Result<ProductId, axum::response::Response> {
    id.parse::<ProductId>()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let record = match body.into_record() {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let inventory = services.inventory();
    let saved = match services::blocking(move || inventory.upsert_product(record)).await {
        Ok(Ok(p)) => p,
        Ok(Err(e)) => return errors::source_error_to_response(e),
        Err(resp) => return resp,
    };

    (StatusCode::CREATED, Json(dto::product_to_json(&saved))).into_response()
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let inventory = services.inventory();
    let snapshot = match services::blocking(move || inventory.read_snapshot()).await {
        Ok(Ok(s)) => s,
        Ok(Err(e)) => return errors::source_error_to_response(e),
        Err(resp) => return resp,
    };

    let items: Vec<_> = snapshot.iter().map(dto::product_to_json).collect();
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "count": items.len(),
            "products": items,
        })),
    )
        .into_response()
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let inventory = services.inventory();
    match services::blocking(move || inventory.get_product(&id)).await {
        Ok(Ok(Some(p))) => (StatusCode::OK, Json(dto::product_to_json(&p))).into_response(),
        Ok(Ok(None)) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found"),
        Ok(Err(e)) => errors::source_error_to_response(e),
        Err(resp) => resp,
    }
}

pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::AdjustStockRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let inventory = services.inventory();
    match services::blocking(move || inventory.adjust_stock(&id, body.delta)).await {
        Ok(Ok(p)) => (StatusCode::OK, Json(dto::product_to_json(&p))).into_response(),
        Ok(Err(e)) => errors::source_error_to_response(e),
        Err(resp) => resp,
    }
}

pub async fn set_status(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::SetStatusRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let status: ProductStatus = match body.status.parse() {
        Ok(s) => s,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let inventory = services.inventory();
    match services::blocking(move || inventory.set_status(&id, status)).await {
        Ok(Ok(p)) => (StatusCode::OK, Json(dto::product_to_json(&p))).into_response(),
        Ok(Err(e)) => errors::source_error_to_response(e),
        Err(resp) => resp,
    }
}
