//! Maps identity-provider sign-ins onto internal users.

use async_trait::async_trait;
use rand::{distr::Alphanumeric, Rng};
use sqlx::PgPool;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use crate::{
    db::user_repository::UserRepository,
    models::user::{normalize_email, NewUser, User, UserRole},
    utils::password::{hash_password, verify_password, MIN_PASSWORD_LENGTH},
};

/// How long a verification link stays valid.
pub const VERIFICATION_TOKEN_TTL: Duration = Duration::hours(24);

/// What an identity provider hands back after a successful sign-in.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalIdentity {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    /// The provider has proven the caller controls `email`.
    pub email_verified: bool,
}

/// A fresh, unverified identity plus the token that confirms its address.
#[derive(Debug, Clone)]
pub struct Registration {
    pub identity: ExternalIdentity,
    pub verification_token: String,
}

#[derive(Debug, Error)]
pub enum SignInError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Please verify your email before signing in")]
    EmailNotVerified,
    #[error("An account with this email already exists")]
    EmailTaken,
    #[error("A valid email address is required")]
    InvalidEmail,
    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),
    #[error("identity store error: {0}")]
    Store(#[from] sqlx::Error),
    #[error("password hashing error: {0}")]
    Hash(password_hash::Error),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Stores unverified credentials. Sign-in is refused until
    /// `verify_email` consumes the returned token.
    async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Registration, SignInError>;

    /// Marks the owning credentials verified. `false` for an unknown,
    /// expired or already used token.
    async fn verify_email(&self, token: &str) -> Result<bool, SignInError>;

    /// Removes a registration whose verification mail could not be sent.
    async fn discard_registration(&self, uid: &str) -> Result<(), SignInError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<ExternalIdentity, SignInError>;
}

fn validate_registration(email: &str, password: &str) -> Result<String, SignInError> {
    let email = normalize_email(email);
    let Some((local, domain)) = email.split_once('@') else {
        return Err(SignInError::InvalidEmail);
    };
    if local.is_empty() || domain.is_empty() {
        return Err(SignInError::InvalidEmail);
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(SignInError::WeakPassword(MIN_PASSWORD_LENGTH));
    }
    Ok(email)
}

pub fn generate_verification_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: Uuid,
    email: String,
    password_hash: String,
    display_name: Option<String>,
    is_verified: bool,
}

/// Email/password identities kept in the `credentials` table.
pub struct PostgresCredentialProvider {
    pub pool: PgPool,
}

#[async_trait]
impl IdentityProvider for PostgresCredentialProvider {
    async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Registration, SignInError> {
        let email = validate_registration(email, password)?;
        let password_hash = hash_password(password).map_err(SignInError::Hash)?;
        let display_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        let now = OffsetDateTime::now_utc();

        let mut tx = self.pool.begin().await?;

        let id: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO credentials (id, email, password_hash, display_name, is_verified, created_at)
            VALUES ($1, $2, $3, $4, false, $5)
            ON CONFLICT (email) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(&password_hash)
        .bind(&display_name)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;
        let id = id.ok_or(SignInError::EmailTaken)?;

        let token = generate_verification_token();
        sqlx::query(
            "INSERT INTO email_verification_tokens (token, credential_id, expires_at, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&token)
        .bind(id)
        .bind(now + VERIFICATION_TOKEN_TTL)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Registration {
            identity: ExternalIdentity {
                uid: id.to_string(),
                email,
                display_name,
                photo_url: None,
                email_verified: false,
            },
            verification_token: token,
        })
    }

    async fn verify_email(&self, token: &str) -> Result<bool, SignInError> {
        let now = OffsetDateTime::now_utc();
        let mut tx = self.pool.begin().await?;

        let credential_id: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE email_verification_tokens
            SET used_at = $1
            WHERE token = $2
              AND expires_at > $1
              AND used_at IS NULL
            RETURNING credential_id
            "#,
        )
        .bind(now)
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(credential_id) = credential_id else {
            return Ok(false);
        };

        sqlx::query("UPDATE credentials SET is_verified = true WHERE id = $1")
            .bind(credential_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn discard_registration(&self, uid: &str) -> Result<(), SignInError> {
        let Ok(id) = Uuid::parse_str(uid) else {
            return Ok(());
        };
        sqlx::query("DELETE FROM credentials WHERE id = $1 AND is_verified = false")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<ExternalIdentity, SignInError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            "SELECT id, email, password_hash, display_name, is_verified FROM credentials WHERE email = $1",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?
        .ok_or(SignInError::InvalidCredentials)?;

        if !verify_password(password, &row.password_hash).map_err(SignInError::Hash)? {
            return Err(SignInError::InvalidCredentials);
        }
        if !row.is_verified {
            return Err(SignInError::EmailNotVerified);
        }

        Ok(ExternalIdentity {
            uid: row.id.to_string(),
            email: row.email,
            display_name: row.display_name,
            photo_url: None,
            email_verified: true,
        })
    }
}

/// Role a brand-new user starts with. Existing users keep whatever role is
/// stored for them. The bootstrap address only counts once it is verified.
pub fn initial_role(identity: &ExternalIdentity, admin_email: Option<&str>) -> UserRole {
    match admin_email {
        Some(admin)
            if identity.email_verified
                && normalize_email(admin) == normalize_email(&identity.email) =>
        {
            UserRole::Admin
        }
        _ => UserRole::Customer,
    }
}

/// Returns the stored user for `identity`, creating it on first sign-in.
pub async fn resolve_user(
    users: &dyn UserRepository,
    identity: &ExternalIdentity,
    admin_email: Option<&str>,
) -> Result<User, sqlx::Error> {
    if let Some(user) = users.find_user_by_external_id(&identity.uid).await? {
        return Ok(user);
    }

    let email = normalize_email(&identity.email);
    let role = initial_role(identity, admin_email);
    let display_name = identity
        .display_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| email.clone());

    let user = users
        .create_user(NewUser {
            external_id: identity.uid.clone(),
            email,
            display_name,
            photo_url: identity.photo_url.clone(),
            role,
        })
        .await?;

    info!(user_id = %user.id, role = %user.role, "created user on first sign-in");
    Ok(user)
}
