//! App registry, knowledge-base editing and first-run seeding.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    models::faq::NewFaq,
    responses::JsonResponse,
    routes::{auth::session::AuthSession, knowledge_base::FaqQuery},
    services::catalog::{self, validate_app_changes, validate_faq, ValidationError},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct AppPayload {
    pub name: String,
    pub description: Option<String>,
    pub site_url: Option<String>,
    /// Only read on create; generated when absent.
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FaqPayload {
    pub app_id: Uuid,
    pub question: String,
    pub answer: String,
    pub category: String,
}

fn invalid(err: ValidationError) -> Response {
    JsonResponse::bad_request(&err.to_string()).into_response()
}

fn store_failure(err: sqlx::Error, context: &'static str, message: &str) -> Response {
    error!(?err, "{context}");
    JsonResponse::server_error(message).into_response()
}

pub async fn list_apps(State(state): State<AppState>) -> Response {
    match state.apps.list_apps().await {
        Ok(apps) => Json(json!({ "success": true, "apps": apps })).into_response(),
        Err(err) => store_failure(err, "failed to list apps", "Failed to load apps"),
    }
}

pub async fn create_app(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Json(payload): Json<AppPayload>,
) -> Response {
    let changes = match validate_app_changes(&payload.name, payload.description, payload.site_url)
    {
        Ok(changes) => changes,
        Err(err) => return invalid(err),
    };

    let new_app = catalog::new_app(changes, payload.api_key, &session.email);
    match state.apps.create_app(new_app).await {
        Ok(app) => {
            info!(app_id = %app.id, name = %app.name, created_by = %session.email, "app registered");
            (StatusCode::CREATED, Json(json!({ "success": true, "app": app }))).into_response()
        }
        Err(err) => store_failure(err, "failed to create app", "Failed to create app"),
    }
}

pub async fn update_app(
    State(state): State<AppState>,
    Path(app_id): Path<Uuid>,
    Json(payload): Json<AppPayload>,
) -> Response {
    let changes = match validate_app_changes(&payload.name, payload.description, payload.site_url)
    {
        Ok(changes) => changes,
        Err(err) => return invalid(err),
    };

    match state.apps.update_app(app_id, changes).await {
        Ok(Some(app)) => Json(json!({ "success": true, "app": app })).into_response(),
        Ok(None) => JsonResponse::not_found("App not found").into_response(),
        Err(err) => store_failure(err, "failed to update app", "Failed to update app"),
    }
}

/// Tickets and FAQs that point at the app are kept.
pub async fn delete_app(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(app_id): Path<Uuid>,
) -> Response {
    match state.apps.delete_app(app_id).await {
        Ok(true) => {
            info!(%app_id, deleted_by = %session.email, "app deleted");
            JsonResponse::success("App deleted").into_response()
        }
        Ok(false) => JsonResponse::not_found("App not found").into_response(),
        Err(err) => store_failure(err, "failed to delete app", "Failed to delete app"),
    }
}

pub async fn list_faqs(State(state): State<AppState>, Query(query): Query<FaqQuery>) -> Response {
    match state.faqs.list_faqs(query.app_id).await {
        Ok(faqs) => Json(json!({ "success": true, "faqs": faqs })).into_response(),
        Err(err) => store_failure(err, "failed to list faqs", "Failed to load FAQs"),
    }
}

async fn checked_faq(state: &AppState, payload: FaqPayload) -> Result<NewFaq, Response> {
    let faq = validate_faq(
        payload.app_id,
        &payload.question,
        &payload.answer,
        &payload.category,
    )
    .map_err(invalid)?;

    match state.apps.find_app(faq.app_id).await {
        Ok(Some(_)) => Ok(faq),
        Ok(None) => Err(JsonResponse::bad_request("App not found").into_response()),
        Err(err) => Err(store_failure(err, "failed to check faq app", "Failed to save FAQ")),
    }
}

pub async fn create_faq(State(state): State<AppState>, Json(payload): Json<FaqPayload>) -> Response {
    let faq = match checked_faq(&state, payload).await {
        Ok(faq) => faq,
        Err(response) => return response,
    };

    match state.faqs.create_faq(faq).await {
        Ok(faq) => (StatusCode::CREATED, Json(json!({ "success": true, "faq": faq }))).into_response(),
        Err(err) => store_failure(err, "failed to create faq", "Failed to save FAQ"),
    }
}

pub async fn update_faq(
    State(state): State<AppState>,
    Path(faq_id): Path<Uuid>,
    Json(payload): Json<FaqPayload>,
) -> Response {
    let faq = match checked_faq(&state, payload).await {
        Ok(faq) => faq,
        Err(response) => return response,
    };

    match state.faqs.update_faq(faq_id, faq).await {
        Ok(Some(faq)) => Json(json!({ "success": true, "faq": faq })).into_response(),
        Ok(None) => JsonResponse::not_found("FAQ not found").into_response(),
        Err(err) => store_failure(err, "failed to update faq", "Failed to save FAQ"),
    }
}

pub async fn delete_faq(State(state): State<AppState>, Path(faq_id): Path<Uuid>) -> Response {
    match state.faqs.delete_faq(faq_id).await {
        Ok(true) => JsonResponse::success("FAQ deleted").into_response(),
        Ok(false) => JsonResponse::not_found("FAQ not found").into_response(),
        Err(err) => store_failure(err, "failed to delete faq", "Failed to delete FAQ"),
    }
}

/// Adds the sample apps and FAQs. Every call adds a fresh set.
pub async fn seed(State(state): State<AppState>, AuthSession(session): AuthSession) -> Response {
    match catalog::seed_sample_data(state.apps.as_ref(), state.faqs.as_ref(), &session.email).await
    {
        Ok(report) => {
            info!(
                apps = report.app_ids.len(),
                faqs = report.faq_ids.len(),
                seeded_by = %session.email,
                "sample data seeded"
            );
            (StatusCode::CREATED, Json(json!({ "success": true, "seeded": report })))
                .into_response()
        }
        Err(err) => store_failure(err, "failed to seed sample data", "Failed to seed sample data"),
    }
}
