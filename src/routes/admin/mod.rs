pub mod catalog;
pub mod tickets;

use axum::{
    extract::{Path, Query, State},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    models::{
        audit_log::AuditLogFilter,
        ticket::TicketFilter,
        user::{User, UserRole},
    },
    responses::JsonResponse,
    routes::auth::session::{admin_gate, AuthSession},
    services::analytics,
    state::AppState,
};

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct RoleCounts {
    pub customer: usize,
    pub tester: usize,
    pub admin: usize,
}

fn role_counts(users: &[User]) -> RoleCounts {
    users.iter().fold(RoleCounts::default(), |mut counts, user| {
        match user.role {
            UserRole::Customer => counts.customer += 1,
            UserRole::Tester => counts.tester += 1,
            UserRole::Admin => counts.admin += 1,
        }
        counts
    })
}

#[derive(Debug, Deserialize)]
pub struct RolePayload {
    pub role: UserRole,
}

async fn list_users(State(state): State<AppState>) -> Response {
    match state.users.list_users().await {
        Ok(users) => {
            let counts = role_counts(&users);
            Json(json!({ "success": true, "users": users, "counts": counts })).into_response()
        }
        Err(err) => {
            error!(?err, "failed to list users");
            JsonResponse::server_error("Failed to load users").into_response()
        }
    }
}

async fn update_user_role(
    State(state): State<AppState>,
    AuthSession(admin): AuthSession,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<RolePayload>,
) -> Response {
    let user = match state.users.find_user_by_id(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return JsonResponse::not_found("User not found").into_response(),
        Err(err) => {
            error!(?err, %user_id, "failed to load user for role change");
            return JsonResponse::server_error("Failed to update role").into_response();
        }
    };

    if state.config.is_bootstrap_admin(&user.email) {
        return JsonResponse::conflict("The bootstrap admin's role cannot be changed")
            .into_response();
    }

    match state.users.update_user_role(user_id, payload.role).await {
        Ok(Some(updated)) => {
            info!(
                %user_id,
                from = %user.role,
                to = %updated.role,
                changed_by = %admin.email,
                "user role changed"
            );
            Json(json!({ "success": true, "user": updated })).into_response()
        }
        Ok(None) => JsonResponse::not_found("User not found").into_response(),
        Err(err) => {
            error!(?err, %user_id, "failed to update user role");
            JsonResponse::server_error("Failed to update role").into_response()
        }
    }
}

async fn get_analytics(State(state): State<AppState>) -> Response {
    let apps = match state.apps.list_apps().await {
        Ok(apps) => apps,
        Err(err) => {
            error!(?err, "failed to load apps for analytics");
            return JsonResponse::server_error("Failed to load analytics").into_response();
        }
    };
    let tickets = match state.tickets.list_tickets(&TicketFilter::default()).await {
        Ok(tickets) => tickets,
        Err(err) => {
            error!(?err, "failed to load tickets for analytics");
            return JsonResponse::server_error("Failed to load analytics").into_response();
        }
    };

    let summary = analytics::summarize(&apps, &tickets);
    Json(json!({ "success": true, "analytics": summary })).into_response()
}

async fn list_audit_logs(
    State(state): State<AppState>,
    Query(filter): Query<AuditLogFilter>,
) -> Response {
    match state.tickets.list_audit_logs(&filter).await {
        Ok(entries) => Json(json!({ "success": true, "entries": entries })).into_response(),
        Err(err) => {
            error!(?err, "failed to list audit logs");
            JsonResponse::server_error("Failed to load audit log").into_response()
        }
    }
}

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{user_id}/role", put(update_user_role))
        .route("/analytics", get(get_analytics))
        .route("/audit", get(list_audit_logs))
        .route("/tickets", get(tickets::list_tickets))
        .route("/tickets/bulk-status", post(tickets::bulk_status))
        .route("/tickets/{ticket_id}", delete(tickets::delete_ticket))
        .route("/tickets/{ticket_id}/status", put(tickets::update_status))
        .route("/apps", get(catalog::list_apps).post(catalog::create_app))
        .route(
            "/apps/{app_id}",
            put(catalog::update_app).delete(catalog::delete_app),
        )
        .route("/faqs", get(catalog::list_faqs).post(catalog::create_faq))
        .route(
            "/faqs/{faq_id}",
            put(catalog::update_faq).delete(catalog::delete_faq),
        )
        .route("/setup/seed", post(catalog::seed))
        .route_layer(from_fn_with_state(state, admin_gate))
}
