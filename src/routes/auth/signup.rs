use axum::{
    extract::{Json, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{responses::JsonResponse, services::identity::SignInError, state::AppState};

#[derive(Debug, Deserialize, Serialize)]
pub struct SignupPayload {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

/// Registers email/password credentials and mails a verification link. No
/// user or session exists until the address is verified and signed in.
pub async fn handle_signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupPayload>,
) -> Response {
    let registration = match state
        .identity
        .register(
            &payload.email,
            &payload.password,
            payload.display_name.as_deref(),
        )
        .await
    {
        Ok(registration) => registration,
        Err(SignInError::EmailTaken) => {
            return JsonResponse::conflict("An account with this email already exists")
                .into_response()
        }
        Err(err @ (SignInError::InvalidEmail | SignInError::WeakPassword(_))) => {
            return JsonResponse::bad_request(&err.to_string()).into_response()
        }
        Err(err) => {
            error!(?err, "failed to register credentials");
            return JsonResponse::server_error("Sign-up failed").into_response();
        }
    };

    let identity = &registration.identity;
    if let Err(err) = state
        .mailer
        .send_verification_email(&identity.email, &registration.verification_token)
        .await
    {
        error!(%err, uid = %identity.uid, "failed to send verification email");
        if let Err(err) = state.identity.discard_registration(&identity.uid).await {
            error!(?err, uid = %identity.uid, "failed to discard unverified registration");
        }
        return JsonResponse::server_error("Failed to send verification email").into_response();
    }

    info!(uid = %identity.uid, "new account registered, awaiting verification");
    JsonResponse::success("Account created. Check your email to verify your account.")
        .into_response()
}
