use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Comment {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    pub user_name: String,
    pub text: String,
    /// Visible to testers and admins only.
    pub is_internal: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub ticket_id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    pub user_name: String,
    pub text: String,
    pub is_internal: bool,
}
