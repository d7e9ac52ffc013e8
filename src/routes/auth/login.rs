use crate::routes::auth::claims::Claims;
use crate::{
    access::Session,
    models::user::User,
    responses::JsonResponse,
    services::identity::{resolve_user, SignInError},
    state::AppState,
    utils::jwt::create_jwt,
};

use axum::{
    extract::{Json, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::Duration as TimeDuration;
use tracing::{error, info, warn};

use super::session::{AuthSession, AUTH_COOKIE};

#[derive(Deserialize, Serialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember: bool,
}

fn session_lifetime(remember: bool) -> Duration {
    if remember {
        Duration::days(30)
    } else {
        Duration::days(7)
    }
}

/// Signs a session for `user` and returns it as an `auth_token` cookie
/// alongside the user profile.
pub(super) fn issue_session(app_state: &AppState, user: &User, remember: bool) -> Response {
    let expires_in = session_lifetime(remember);
    let session = Session::from(user);
    let claims = Claims::for_session(&session, expires_in.num_seconds());

    let token = match create_jwt(claims, app_state) {
        Ok(token) => token,
        Err(err) => {
            error!(?err, user_id = %user.id, "failed to sign session token");
            return JsonResponse::server_error("Sign-in failed").into_response();
        }
    };

    let cookie = Cookie::build((AUTH_COOKIE, token))
        .http_only(true)
        .secure(app_state.config.auth_cookie_secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(TimeDuration::seconds(expires_in.num_seconds()))
        .build();

    let Ok(value) = HeaderValue::from_str(&cookie.to_string()) else {
        return JsonResponse::server_error("Sign-in failed").into_response();
    };
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, value);

    (
        StatusCode::OK,
        headers,
        Json(json!({
            "success": true,
            "user": user,
        })),
    )
        .into_response()
}

pub async fn handle_login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Response {
    let identity = match app_state
        .identity
        .sign_in(&payload.email, &payload.password)
        .await
    {
        Ok(identity) => identity,
        Err(SignInError::InvalidCredentials) => {
            warn!("rejected sign-in with invalid credentials");
            return JsonResponse::unauthorized("Invalid credentials").into_response();
        }
        Err(err @ SignInError::EmailNotVerified) => {
            return JsonResponse::forbidden_with_code(&err.to_string(), "EMAIL_NOT_VERIFIED")
                .into_response();
        }
        Err(err) => {
            error!(?err, "identity provider failed during sign-in");
            return JsonResponse::server_error("Sign-in failed").into_response();
        }
    };

    let user = match resolve_user(
        app_state.users.as_ref(),
        &identity,
        app_state.config.admin_email.as_deref(),
    )
    .await
    {
        Ok(user) => user,
        Err(err) => {
            error!(?err, uid = %identity.uid, "failed to resolve user during sign-in");
            return JsonResponse::server_error("Sign-in failed").into_response();
        }
    };

    info!(user_id = %user.id, role = %user.role, "user signed in");
    issue_session(&app_state, &user, payload.remember)
}

pub async fn handle_me(
    State(app_state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Response {
    match app_state.users.find_user_by_id(session.user_id).await {
        Ok(Some(user)) => Json(json!({
            "success": true,
            "user": user,
            "session": session,
        }))
        .into_response(),
        Ok(None) => JsonResponse::unauthorized("User not found").into_response(),
        Err(err) => {
            error!(?err, user_id = %session.user_id, "failed to load current user");
            JsonResponse::server_error("Database error").into_response()
        }
    }
}
