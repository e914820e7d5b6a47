use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use electra_core::AlertId;
use electra_infra::unread_alerts;

use crate::app::services::{self, AppServices};
use crate::app::{dto, errors};

const DEFAULT_LIST_LIMIT: usize = 50;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_alerts))
        .route("/unread", get(get_unread))
        .route("/stream", get(stream))
        .route("/:id/read", post(mark_read))
}

/// Unread alerts for the admin dashboard. Never fails: a store error shows as an empty list.
pub async fn get_unread(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let alerts = services.alerts();
    let unread = services::blocking(move || unread_alerts(&*alerts))
        .await
        .unwrap_or_default();

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "count": unread.len(),
            "alerts": unread,
        })),
    )
        .into_response()
}

pub async fn list_alerts(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::ListAlertsQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => return errors::query_rejection_to_response(rejection),
    };
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let alerts = services.alerts();
    match services::blocking(move || alerts.list_recent(limit)).await {
        Ok(Ok(list)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "count": list.len(),
                "alerts": list,
            })),
        )
            .into_response(),
        Ok(Err(e)) => errors::alert_error_to_response(e),
        Err(resp) => resp,
    }
}

pub async fn mark_read(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: AlertId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid alert id"),
    };

    let alerts = services.alerts();
    match services::blocking(move || alerts.mark_read(id)).await {
        Ok(Ok(alert)) => (StatusCode::OK, Json(alert)).into_response(),
        Ok(Err(e)) => errors::alert_error_to_response(e),
        Err(resp) => resp,
    }
}

pub async fn stream(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Sse<impl tokio_stream::Stream<Item = Result<axum::response::sse::Event, std::convert::Infallible>>> {
    services::alert_sse_stream(services)
}
