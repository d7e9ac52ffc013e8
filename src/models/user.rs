use core::fmt;

use serde::{Deserialize, Serialize};
use sqlx::{prelude::Type, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "user_role")] // Matches the Postgres enum name
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Customer,
    Tester,
    Admin,
}

impl UserRole {
    /// Testers and admins both see internal tickets and comments.
    pub fn is_tester(self) -> bool {
        matches!(self, UserRole::Tester | UserRole::Admin)
    }

    pub fn is_admin(self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserRole::Customer => "customer",
            UserRole::Tester => "tester",
            UserRole::Admin => "admin",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, FromRow, Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    /// Stable id issued by the identity provider.
    #[serde(skip_serializing)]
    pub external_id: String,
    pub email: String,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub role: UserRole,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub external_id: String,
    pub email: String,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub role: UserRole,
}

/// Trims and lowercases an email so comparisons and uniqueness checks agree.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
