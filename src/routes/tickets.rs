use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::{
    access::visible_comments,
    models::{
        app::UNKNOWN_APP_NAME,
        ticket::{TicketFilter, TicketType},
    },
    responses::JsonResponse,
    routes::auth::session::AuthSession,
    services::tickets::{self, CustomerTicketInput, TicketError},
    state::AppState,
};

/// Maps a ticket workflow failure onto the shared JSON error body.
pub fn ticket_error_response(err: TicketError, context: &'static str) -> Response {
    match err {
        TicketError::Validation(err) => JsonResponse::bad_request(&err.to_string()).into_response(),
        TicketError::UnknownApp | TicketError::NotInternal => {
            JsonResponse::bad_request(&err.to_string()).into_response()
        }
        TicketError::NotFound => JsonResponse::not_found("Ticket not found").into_response(),
        TicketError::Store(err) => {
            error!(?err, "{context}");
            JsonResponse::server_error("Something went wrong. Please try again.").into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentPayload {
    pub text: String,
    #[serde(default)]
    pub is_internal: bool,
}

pub async fn create_ticket(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Json(payload): Json<CustomerTicketInput>,
) -> Response {
    match tickets::submit_customer_ticket(
        state.tickets.as_ref(),
        state.apps.as_ref(),
        &session,
        payload,
    )
    .await
    {
        Ok(ticket) => (
            StatusCode::CREATED,
            Json(json!({ "success": true, "ticket": ticket })),
        )
            .into_response(),
        Err(err) => ticket_error_response(err, "failed to submit ticket"),
    }
}

pub async fn list_my_tickets(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Response {
    let filter = TicketFilter::for_creator(session.user_id, TicketType::Customer);
    match state.tickets.list_tickets(&filter).await {
        Ok(tickets) => Json(json!({ "success": true, "tickets": tickets })).into_response(),
        Err(err) => ticket_error_response(err.into(), "failed to list customer tickets"),
    }
}

pub async fn get_ticket(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(ticket_id): Path<Uuid>,
) -> Response {
    let ticket =
        match tickets::load_ticket_for_session(state.tickets.as_ref(), &session, ticket_id).await {
            Ok(ticket) => ticket,
            Err(err) => return ticket_error_response(err, "failed to load ticket"),
        };

    let app_name = match state.apps.find_app(ticket.app_id).await {
        Ok(app) => app.map_or_else(|| UNKNOWN_APP_NAME.to_string(), |app| app.name),
        Err(err) => return ticket_error_response(err.into(), "failed to load ticket app"),
    };

    // Visibility is settled above; internal rows are filtered in the query.
    let comments = match state
        .tickets
        .list_comments(ticket_id, session.is_tester())
        .await
    {
        Ok(comments) => visible_comments(&session, comments),
        Err(err) => return ticket_error_response(err.into(), "failed to load ticket comments"),
    };

    Json(json!({
        "success": true,
        "ticket": ticket,
        "app_name": app_name,
        "comments": comments,
    }))
    .into_response()
}

pub async fn list_comments(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(ticket_id): Path<Uuid>,
) -> Response {
    match tickets::list_comments(state.tickets.as_ref(), &session, ticket_id).await {
        Ok(comments) => Json(json!({ "success": true, "comments": comments })).into_response(),
        Err(err) => ticket_error_response(err, "failed to list comments"),
    }
}

pub async fn add_comment(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(ticket_id): Path<Uuid>,
    Json(payload): Json<CommentPayload>,
) -> Response {
    match tickets::add_comment(
        state.tickets.as_ref(),
        &session,
        ticket_id,
        &payload.text,
        payload.is_internal,
    )
    .await
    {
        Ok(comment) => (
            StatusCode::CREATED,
            Json(json!({ "success": true, "comment": comment })),
        )
            .into_response(),
        Err(err) => ticket_error_response(err, "failed to add comment"),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_my_tickets).post(create_ticket))
        .route("/{ticket_id}", get(get_ticket))
        .route("/{ticket_id}/comments", get(list_comments).post(add_comment))
}
