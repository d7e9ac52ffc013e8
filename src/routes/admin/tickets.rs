use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    models::{
        app::app_name_or_unknown,
        ticket::{Ticket, TicketFilter, TicketStatus},
    },
    responses::JsonResponse,
    routes::{auth::session::AuthSession, tickets::ticket_error_response},
    services::tickets::{self, BulkStatusRequest},
    state::AppState,
};

/// A ticket row in the triage table.
#[derive(Debug, Serialize)]
pub struct AdminTicketRow {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub app_name: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusPayload {
    pub status: TicketStatus,
}

pub async fn list_tickets(
    State(state): State<AppState>,
    Query(filter): Query<TicketFilter>,
) -> Response {
    let apps = match state.apps.list_apps().await {
        Ok(apps) => apps,
        Err(err) => return ticket_error_response(err.into(), "failed to load apps for triage"),
    };
    let rows: Vec<AdminTicketRow> = match state.tickets.list_tickets(&filter).await {
        Ok(found) => found
            .into_iter()
            .map(|ticket| AdminTicketRow {
                app_name: app_name_or_unknown(&apps, ticket.app_id),
                ticket,
            })
            .collect(),
        Err(err) => return ticket_error_response(err.into(), "failed to list tickets"),
    };

    Json(json!({ "success": true, "tickets": rows })).into_response()
}

pub async fn update_status(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(ticket_id): Path<Uuid>,
    Json(payload): Json<StatusPayload>,
) -> Response {
    match tickets::update_status(state.tickets.as_ref(), &session, ticket_id, payload.status).await
    {
        Ok(ticket) => Json(json!({ "success": true, "ticket": ticket })).into_response(),
        Err(err) => ticket_error_response(err, "failed to update ticket status"),
    }
}

pub async fn delete_ticket(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(ticket_id): Path<Uuid>,
) -> Response {
    match state.tickets.delete_ticket(ticket_id).await {
        Ok(true) => {
            info!(%ticket_id, deleted_by = %session.email, "ticket deleted");
            JsonResponse::success("Ticket deleted").into_response()
        }
        Ok(false) => JsonResponse::not_found("Ticket not found").into_response(),
        Err(err) => {
            error!(?err, %ticket_id, "failed to delete ticket");
            JsonResponse::server_error("Failed to delete ticket").into_response()
        }
    }
}

/// Responds 200 when every ticket carries the operation, 207 otherwise. The
/// body always holds the per-ticket report so the client can retry.
pub async fn bulk_status(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Json(payload): Json<BulkStatusRequest>,
) -> Response {
    match tickets::bulk_update_status(state.tickets.clone(), &session, payload).await {
        Ok(report) => {
            let success = report.succeeded();
            let status = if success {
                StatusCode::OK
            } else {
                StatusCode::MULTI_STATUS
            };
            (status, Json(json!({ "success": success, "report": report }))).into_response()
        }
        Err(err) => ticket_error_response(err, "bulk status update failed"),
    }
}
