pub mod claims;
pub mod login;
pub mod logout;
pub mod session;
pub mod signup;
pub mod verify;

use axum::{
    routing::{get, post},
    Router,
};

pub use login::handle_login;
pub use login::handle_me;
pub use logout::handle_logout;
pub use signup::handle_signup;
pub use verify::verify_email;

use crate::{state::AppState, utils::csrf::get_csrf_token};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(handle_signup))
        .route("/login", post(handle_login))
        .route("/logout", post(handle_logout))
        .route("/verify", post(verify_email))
        .route("/me", get(handle_me))
        .route("/csrf-token", get(get_csrf_token))
}
