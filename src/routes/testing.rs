use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    models::ticket::{InternalFieldChanges, TicketFilter, TicketType},
    routes::{
        auth::session::{tester_gate, AuthSession},
        tickets::ticket_error_response,
    },
    services::tickets::{self, BugReportInput},
    state::AppState,
};

pub async fn report_bug(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Json(payload): Json<BugReportInput>,
) -> Response {
    match tickets::submit_bug_report(state.tickets.as_ref(), state.apps.as_ref(), &session, payload)
        .await
    {
        Ok(ticket) => (
            StatusCode::CREATED,
            Json(json!({ "success": true, "ticket": ticket })),
        )
            .into_response(),
        Err(err) => ticket_error_response(err, "failed to submit bug report"),
    }
}

/// The caller's own internal tickets.
pub async fn list_my_bugs(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Response {
    let filter = TicketFilter::for_creator(session.user_id, TicketType::Internal);
    match state.tickets.list_tickets(&filter).await {
        Ok(bugs) => Json(json!({ "success": true, "tickets": bugs })).into_response(),
        Err(err) => ticket_error_response(err.into(), "failed to list bug reports"),
    }
}

pub async fn update_bug(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(ticket_id): Path<Uuid>,
    Json(changes): Json<InternalFieldChanges>,
) -> Response {
    match tickets::update_bug_details(state.tickets.as_ref(), &session, ticket_id, changes).await {
        Ok(ticket) => Json(json!({ "success": true, "ticket": ticket })).into_response(),
        Err(err) => ticket_error_response(err, "failed to update bug details"),
    }
}

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/bugs", get(list_my_bugs).post(report_bug))
        .route("/bugs/{ticket_id}", put(update_bug))
        .route_layer(from_fn_with_state(state, tester_gate))
}
