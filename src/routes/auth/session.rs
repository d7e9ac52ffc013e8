use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    access::{evaluate, GuardDecision, GuardLevel, Session},
    responses::JsonResponse,
    state::AppState,
    utils::jwt::{decode_jwt, JwtKeyProvider},
};

pub const AUTH_COOKIE: &str = "auth_token";
pub const SIGN_IN_REQUIRED: &str = "Please sign in";
pub const ACCESS_DENIED: &str = "Access Denied";

/// Session carried by the request's `auth_token` cookie, if it is valid.
pub fn session_from_headers<P: JwtKeyProvider>(headers: &HeaderMap, keys: &P) -> Option<Session> {
    let jar = CookieJar::from_headers(headers);
    let token = jar.get(AUTH_COOKIE)?;
    let data = decode_jwt(token.value(), keys).ok()?;
    data.claims.session()
}

#[derive(Debug, PartialEq)]
pub struct AuthSession(pub Session);

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        session_from_headers(&parts.headers, state)
            .map(AuthSession)
            .ok_or_else(|| JsonResponse::unauthorized(SIGN_IN_REQUIRED).into_response())
    }
}

fn gate_response(decision: GuardDecision) -> Option<Response> {
    match decision {
        GuardDecision::Allow => None,
        GuardDecision::RedirectHome => {
            Some(JsonResponse::unauthorized(SIGN_IN_REQUIRED).into_response())
        }
        GuardDecision::AccessDenied => Some(JsonResponse::forbidden(ACCESS_DENIED).into_response()),
    }
}

async fn gate(level: GuardLevel, state: &AppState, req: Request<Body>, next: Next) -> Response {
    let session = session_from_headers(req.headers(), state);
    if let Some(rejection) = gate_response(evaluate(level, session.as_ref())) {
        return rejection;
    }
    next.run(req).await
}

pub async fn tester_gate(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    gate(GuardLevel::Tester, &state, req, next).await
}

pub async fn admin_gate(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    gate(GuardLevel::Admin, &state, req, next).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        extract::FromRequestParts,
        http::{header, Method, Request},
    };
    use axum_extra::extract::cookie::Cookie;
    use uuid::Uuid;

    use super::*;
    use crate::{
        db::mock_db::MockDb,
        models::user::UserRole,
        routes::auth::claims::Claims,
        state::test_state,
        utils::jwt::create_jwt,
    };

    fn session() -> Session {
        Session {
            user_id: Uuid::new_v4(),
            email: "test@example.com".into(),
            display_name: "Test User".into(),
            role: UserRole::Tester,
        }
    }

    #[tokio::test]
    async fn test_valid_token_extracted() {
        let state = test_state::state(Arc::new(MockDb::default()));
        let expected = session();
        let jwt = create_jwt(Claims::for_session(&expected, 3600), &state).unwrap();
        let cookie = Cookie::new(AUTH_COOKIE, jwt);

        let request = Request::builder()
            .method(Method::GET)
            .uri("/")
            .header(header::COOKIE, cookie.to_string())
            .body(())
            .unwrap();

        let mut parts = request.into_parts().0;
        let AuthSession(session) = AuthSession::from_request_parts(&mut parts, &state)
            .await
            .expect("session should be extracted");
        assert_eq!(session, expected);
    }

    #[tokio::test]
    async fn test_missing_cookie_returns_unauthorized() {
        let state = test_state::state(Arc::new(MockDb::default()));
        let request = Request::builder().uri("/").body(()).unwrap();

        let mut parts = request.into_parts().0;
        let rejection = AuthSession::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(rejection.status(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_expired_token_is_ignored() {
        let state = test_state::state(Arc::new(MockDb::default()));
        let jwt = create_jwt(Claims::for_session(&session(), -60), &state).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            header::HeaderValue::from_str(&Cookie::new(AUTH_COOKIE, jwt).to_string()).unwrap(),
        );
        assert!(session_from_headers(&headers, &state).is_none());
    }

    #[test]
    fn gate_maps_decisions_to_statuses() {
        assert!(gate_response(GuardDecision::Allow).is_none());
        assert_eq!(
            gate_response(GuardDecision::RedirectHome).unwrap().status(),
            axum::http::StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            gate_response(GuardDecision::AccessDenied).unwrap().status(),
            axum::http::StatusCode::FORBIDDEN
        );
    }
}
