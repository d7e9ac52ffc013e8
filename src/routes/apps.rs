use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::{
    models::app::App, responses::JsonResponse, routes::auth::session::AuthSession,
    state::AppState,
};

/// What the ticket form needs to know about an app. API keys stay admin-only.
#[derive(Debug, Serialize)]
pub struct AppSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub site_url: Option<String>,
}

impl From<App> for AppSummary {
    fn from(app: App) -> Self {
        AppSummary {
            id: app.id,
            name: app.name,
            description: app.description,
            site_url: app.site_url,
        }
    }
}

pub async fn list_apps(State(state): State<AppState>, AuthSession(_): AuthSession) -> Response {
    match state.apps.list_apps().await {
        Ok(apps) => {
            let apps: Vec<AppSummary> = apps.into_iter().map(AppSummary::from).collect();
            Json(json!({ "success": true, "apps": apps })).into_response()
        }
        Err(err) => {
            error!(?err, "failed to list apps");
            JsonResponse::server_error("Failed to load apps").into_response()
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_apps))
}
