pub mod access;
pub mod config;
pub mod db;
pub mod models;
pub mod responses;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{
    responses::JsonResponse,
    routes::auth::session::tester_gate,
    services::blob_store::UploadCategory,
    utils::csrf::validate_csrf,
};

pub use state::AppState;

/// A simple root route.
async fn root() -> Response {
    JsonResponse::success("Support desk API").into_response()
}

/// The full HTTP surface without rate limiting or CORS.
pub fn app(state: AppState) -> Router {
    app_with(state, |auth| auth)
}

/// Builds the router, letting the caller wrap the `/api/auth` group (the
/// binary adds its stricter rate limiter there).
pub fn app_with<F>(state: AppState, wrap_auth: F) -> Router
where
    F: FnOnce(Router<AppState>) -> Router<AppState>,
{
    let upload_dir = state.config.upload_dir.clone();

    let api = Router::new()
        .nest("/auth", wrap_auth(routes::auth::router()))
        .nest("/apps", routes::apps::router())
        .nest("/tickets", routes::tickets::router())
        .nest("/testing", routes::testing::router(state.clone()))
        .nest("/knowledge-base", routes::knowledge_base::router())
        .nest("/uploads", routes::uploads::router())
        .nest("/admin", routes::admin::router(state.clone()))
        .layer(from_fn(validate_csrf));

    // Tester log files are private; ticket attachments stay public.
    let logs = UploadCategory::Logs.as_str();
    let tickets = UploadCategory::Tickets.as_str();
    let uploads = Router::new()
        .nest_service(&format!("/{logs}"), ServeDir::new(upload_dir.join(logs)))
        .layer(from_fn_with_state(state.clone(), tester_gate))
        .nest_service(&format!("/{tickets}"), ServeDir::new(upload_dir.join(tickets)));

    Router::new()
        .route("/", get(root))
        .nest("/api", api)
        .nest("/uploads", uploads)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
