use std::sync::Arc;

use crate::config::Config;
use crate::db::{
    app_repository::AppRepository, faq_repository::FaqRepository,
    ticket_repository::TicketRepository, user_repository::UserRepository,
};
use crate::services::{blob_store::BlobStore, identity::IdentityProvider, mailer::Mailer};
use crate::utils::jwt::{JwtKeyProvider, JwtKeys};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub apps: Arc<dyn AppRepository>,
    pub tickets: Arc<dyn TicketRepository>,
    pub faqs: Arc<dyn FaqRepository>,
    pub identity: Arc<dyn IdentityProvider>,
    pub mailer: Arc<dyn Mailer>,
    pub blob_store: Arc<dyn BlobStore>,
    pub config: Arc<Config>,
    pub jwt_keys: Arc<JwtKeys>,
}

impl JwtKeyProvider for AppState {
    fn jwt_keys(&self) -> &JwtKeys {
        &self.jwt_keys
    }

    fn jwt_issuer(&self) -> &str {
        &self.config.jwt_issuer
    }

    fn jwt_audience(&self) -> &str {
        &self.config.jwt_audience
    }
}

#[cfg(test)]
pub mod test_state {
    use std::sync::Arc;

    use axum_extra::extract::cookie::Cookie;

    use super::AppState;
    use crate::{
        access::Session,
        config::Config,
        db::mock_db::MockDb,
        routes::auth::claims::Claims,
        services::{
            blob_store::LocalBlobStore, identity::mock::MockIdentityProvider,
            mailer::mock::MockMailer,
        },
        utils::{
            csrf::{CSRF_COOKIE, CSRF_HEADER},
            jwt::{create_jwt, JwtKeys},
        },
    };

    pub const TEST_JWT_SECRET: &str = "0123456789abcdef0123456789abcdef";
    pub const TEST_CSRF_TOKEN: &str = "test-csrf-token";

    pub fn state_with(db: Arc<MockDb>, identity: MockIdentityProvider) -> AppState {
        state_with_mailer(db, identity, Arc::new(MockMailer::default()))
    }

    pub fn state_with_mailer(
        db: Arc<MockDb>,
        identity: MockIdentityProvider,
        mailer: Arc<MockMailer>,
    ) -> AppState {
        let config = Config::test_config();
        AppState {
            users: db.clone(),
            apps: db.clone(),
            tickets: db.clone(),
            faqs: db,
            identity: Arc::new(identity),
            mailer,
            blob_store: Arc::new(LocalBlobStore::new(
                config.upload_dir.clone(),
                &config.upload_public_base_url,
            )),
            config: Arc::new(config),
            jwt_keys: Arc::new(
                JwtKeys::from_secret(TEST_JWT_SECRET).expect("test secret should be accepted"),
            ),
        }
    }

    pub fn state(db: Arc<MockDb>) -> AppState {
        state_with(db, MockIdentityProvider::default())
    }

    /// `Cookie` header value carrying a session for `session` and a CSRF token.
    pub fn cookie_header(state: &AppState, session: &Session) -> String {
        let token = create_jwt(Claims::for_session(session, 3600), state).unwrap();
        format!(
            "{}; {}",
            Cookie::new("auth_token", token),
            Cookie::new(CSRF_COOKIE, TEST_CSRF_TOKEN)
        )
    }

    pub fn csrf_header() -> (&'static str, &'static str) {
        (CSRF_HEADER, TEST_CSRF_TOKEN)
    }
}
