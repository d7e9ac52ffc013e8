use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::{responses::JsonResponse, state::AppState};

#[derive(Debug, Default, Deserialize)]
pub struct FaqQuery {
    pub app_id: Option<Uuid>,
}

pub async fn list_faqs(State(state): State<AppState>, Query(query): Query<FaqQuery>) -> Response {
    match state.faqs.list_faqs(query.app_id).await {
        Ok(faqs) => Json(json!({ "success": true, "faqs": faqs })).into_response(),
        Err(err) => {
            error!(?err, "failed to list faqs");
            JsonResponse::server_error("Failed to load FAQs").into_response()
        }
    }
}

/// Returns one FAQ and counts the read as a view.
pub async fn view_faq(State(state): State<AppState>, Path(faq_id): Path<Uuid>) -> Response {
    match state.faqs.increment_faq_views(faq_id).await {
        Ok(Some(faq)) => Json(json!({ "success": true, "faq": faq })).into_response(),
        Ok(None) => JsonResponse::not_found("FAQ not found").into_response(),
        Err(err) => {
            error!(?err, %faq_id, "failed to load faq");
            JsonResponse::server_error("Failed to load FAQ").into_response()
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/faqs", get(list_faqs))
        .route("/faqs/{faq_id}", get(view_faq))
}
