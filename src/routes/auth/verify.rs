use axum::{
    extract::{Json, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::{responses::JsonResponse, state::AppState};

#[derive(Deserialize, Serialize)]
pub struct VerifyEmailPayload {
    pub token: String,
}

pub async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailPayload>,
) -> Response {
    match state.identity.verify_email(payload.token.trim()).await {
        Ok(true) => JsonResponse::success("Email verified successfully").into_response(),
        Ok(false) => {
            warn!("rejected unknown or expired verification token");
            JsonResponse::bad_request("Invalid, expired, or already used token").into_response()
        }
        Err(err) => {
            error!(?err, "failed to verify email");
            JsonResponse::server_error("Something went wrong").into_response()
        }
    }
}
