use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration as TimeDuration;

use super::session::AUTH_COOKIE;
use crate::{responses::JsonResponse, state::AppState};

pub async fn handle_logout(State(state): State<AppState>) -> Response {
    let expired_cookie = Cookie::build((AUTH_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(state.config.auth_cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::seconds(0));

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&expired_cookie.to_string()) {
        headers.insert(SET_COOKIE, value);
    }

    (StatusCode::OK, headers, JsonResponse::success("Logged out")).into_response()
}
