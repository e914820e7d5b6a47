use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};

use electra_infra::fulfill_order;

use crate::app::services::{self, AppServices};
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/fulfill", post(fulfill))
}

/// Price a paid cart and take its quantities out of stock.
///
/// Responds 200 when every line was fulfilled, 207 when some lines failed.
pub async fn fulfill(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::FulfillOrderRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let cart = match body.into_cart() {
        Ok(c) => c,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let inventory = services.inventory();
    let delivery_fee = services.delivery_fee();
    let report = match services::blocking(move || fulfill_order(&*inventory, &cart, delivery_fee)).await {
        Ok(Ok(r)) => r,
        Ok(Err(e)) => return errors::domain_error_to_response(e),
        Err(resp) => return resp,
    };

    let status = if report.fully_fulfilled() {
        StatusCode::OK
    } else {
        StatusCode::MULTI_STATUS
    };
    (status, Json(report)).into_response()
}
