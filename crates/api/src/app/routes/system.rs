use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::errors;
use crate::app::services::{self, AppServices};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Run one reconciliation pass over the current snapshot and return its report.
pub async fn reconcile_now(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let reconciler = services.reconciler();
    let report = match services::blocking(move || reconciler.reconcile_current()).await {
        Ok(Ok(r)) => r,
        Ok(Err(e)) => return errors::source_error_to_response(e),
        Err(resp) => return resp,
    };

    (StatusCode::OK, Json(report)).into_response()
}
