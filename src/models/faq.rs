use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Faq {
    pub id: Uuid,
    pub app_id: Uuid,
    pub question: String,
    pub answer: String,
    pub category: String,
    pub views: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFaq {
    pub app_id: Uuid,
    pub question: String,
    pub answer: String,
    pub category: String,
}
