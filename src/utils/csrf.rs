use axum::{
    body::Body,
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::{self, prelude::BASE64_URL_SAFE_NO_PAD, Engine};
use rand_core::RngCore;
use tracing::warn;

use crate::{responses::JsonResponse, state::AppState};

pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Double-submit check: unsafe methods must echo the `csrf_token` cookie in
/// the `x-csrf-token` header.
pub async fn validate_csrf(req: Request<Body>, next: Next) -> Response {
    if !matches!(
        req.method(),
        &Method::POST | &Method::PUT | &Method::DELETE | &Method::PATCH
    ) {
        return next.run(req).await;
    }

    let token_header = req
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok());

    let cookie_header = req
        .headers()
        .get_all("cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ");

    let matched = match (token_header, extract_csrf_from_cookie(&cookie_header)) {
        (Some(csrf_token), Some(cookie_token)) => {
            !csrf_token.is_empty() && csrf_token == cookie_token
        }
        _ => false,
    };
    if matched {
        return next.run(req).await;
    }

    warn!(method = %req.method(), path = %req.uri().path(), "rejected request without matching CSRF token");
    JsonResponse::forbidden_with_code("Invalid CSRF token", "CSRF_MISMATCH").into_response()
}

fn extract_csrf_from_cookie(cookie_str: &str) -> Option<String> {
    for cookie in cookie_str.split(';') {
        if let Ok(parsed) = Cookie::parse_encoded(cookie.trim()) {
            if parsed.name() == CSRF_COOKIE {
                return Some(parsed.value().to_string());
            }
        }
    }
    None
}

pub fn generate_csrf_token() -> String {
    let mut bytes = [0u8; 32]; // 256-bit token
    rand_core::OsRng.fill_bytes(&mut bytes);
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

pub async fn get_csrf_token(State(state): State<AppState>) -> Response {
    let token = generate_csrf_token();

    let cookie = Cookie::build((CSRF_COOKIE, token.clone()))
        .path("/")
        .same_site(SameSite::Strict)
        .http_only(true)
        .secure(state.config.auth_cookie_secure)
        .build();

    let Ok(value) = HeaderValue::from_str(&cookie.to_string()) else {
        return JsonResponse::server_error("Failed to issue CSRF token").into_response();
    };
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, value);

    // The body carries the token so the client can echo it in the header.
    (StatusCode::OK, headers, token).into_response()
}
