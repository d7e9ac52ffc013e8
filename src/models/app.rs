use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Display name used when a ticket or FAQ points at an app that no longer exists.
pub const UNKNOWN_APP_NAME: &str = "Unknown";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct App {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub site_url: Option<String>,
    pub api_key: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub created_by: String,
}

#[derive(Debug, Clone)]
pub struct NewApp {
    pub name: String,
    pub description: Option<String>,
    pub site_url: Option<String>,
    pub api_key: String,
    pub created_by: String,
}

/// Mutable app fields. The id and api key never change after creation.
#[derive(Debug, Clone)]
pub struct AppChanges {
    pub name: String,
    pub description: Option<String>,
    pub site_url: Option<String>,
}

/// Resolves an app name from a preloaded list, falling back to [`UNKNOWN_APP_NAME`].
pub fn app_name_or_unknown(apps: &[App], app_id: Uuid) -> String {
    apps.iter()
        .find(|app| app.id == app_id)
        .map(|app| app.name.clone())
        .unwrap_or_else(|| UNKNOWN_APP_NAME.to_string())
}
