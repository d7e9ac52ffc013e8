use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;
use tracing::{error, warn};

use crate::{
    responses::JsonResponse,
    routes::auth::session::{AuthSession, ACCESS_DENIED},
    services::blob_store::{BlobStoreError, UploadCategory, MAX_UPLOAD_BYTES},
    state::AppState,
};

const UPLOAD_FIELD: &str = "file";
// Multipart framing around the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub async fn upload_file(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(category): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let category: UploadCategory = match category.parse() {
        Ok(category) => category,
        Err(_) => return JsonResponse::not_found("Unknown upload category").into_response(),
    };
    if category == UploadCategory::Logs && !session.is_tester() {
        return JsonResponse::forbidden(ACCESS_DENIED).into_response();
    }

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                warn!(?err, user_id = %session.user_id, "malformed upload body");
                return JsonResponse::bad_request("Invalid upload").into_response();
            }
        };
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(?err, user_id = %session.user_id, "failed to read upload");
                return JsonResponse::bad_request("Invalid upload").into_response();
            }
        };

        return match state
            .blob_store
            .upload(category, session.user_id, &filename, &bytes)
            .await
        {
            Ok(url) => (StatusCode::CREATED, Json(json!({ "success": true, "url": url })))
                .into_response(),
            Err(err @ (BlobStoreError::Empty | BlobStoreError::TooLarge(_))) => {
                JsonResponse::bad_request(&err.to_string()).into_response()
            }
            Err(err) => {
                error!(?err, %category, user_id = %session.user_id, "upload failed");
                JsonResponse::server_error("Upload failed").into_response()
            }
        };
    }

    JsonResponse::bad_request("file is required").into_response()
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{category}", post(upload_file))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::{
        access::Session,
        db::mock_db::MockDb,
        models::user::UserRole,
        services::{blob_store::LocalBlobStore, tickets::test_support::session},
        state::{test_state, AppState},
    };

    const BOUNDARY: &str = "supportdesk-test-boundary";

    fn multipart_body(field: &str, filename: &str, content: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n{content}\r\n--{BOUNDARY}--\r\n"
        )
    }

    fn upload_request(state: &AppState, who: &Session, category: &str, body: String) -> Request<Body> {
        let (csrf_name, csrf_value) = test_state::csrf_header();
        Request::post(format!("/api/uploads/{category}"))
            .header(header::COOKIE, test_state::cookie_header(state, who))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header(csrf_name, csrf_value)
            .body(Body::from(body))
            .unwrap()
    }

    fn state_in(dir: &TempDir) -> AppState {
        let mut state = test_state::state(Arc::new(MockDb::default()));
        state.blob_store = Arc::new(LocalBlobStore::new(dir.path(), "http://localhost:3000/uploads"));
        state
    }

    #[tokio::test]
    async fn customer_uploads_ticket_screenshot() {
        let dir = TempDir::new().unwrap();
        let state = state_in(&dir);
        let customer = session(UserRole::Customer);

        let res = crate::app(state.clone())
            .oneshot(upload_request(
                &state,
                &customer,
                "tickets",
                multipart_body("file", "screen shot.png", "fake-png"),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        let url = json["url"].as_str().unwrap();
        assert!(url.starts_with(&format!(
            "http://localhost:3000/uploads/tickets/{}/",
            customer.user_id
        )));
        assert!(url.ends_with("_screen_shot.png"));
    }

    #[tokio::test]
    async fn log_uploads_need_tester_role() {
        let dir = TempDir::new().unwrap();
        let state = state_in(&dir);

        let res = crate::app(state.clone())
            .oneshot(upload_request(
                &state,
                &session(UserRole::Customer),
                "logs",
                multipart_body("file", "app.log", "boom"),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = crate::app(state.clone())
            .oneshot(upload_request(
                &state,
                &session(UserRole::Tester),
                "logs",
                multipart_body("file", "app.log", "boom"),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn missing_file_field_is_rejected() {
        let dir = TempDir::new().unwrap();
        let state = state_in(&dir);

        let res = crate::app(state.clone())
            .oneshot(upload_request(
                &state,
                &session(UserRole::Customer),
                "tickets",
                multipart_body("attachment", "a.png", "x"),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
