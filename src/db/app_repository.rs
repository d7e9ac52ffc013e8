use async_trait::async_trait;
use uuid::Uuid;

use crate::models::app::{App, AppChanges, NewApp};

#[async_trait]
pub trait AppRepository: Send + Sync {
    async fn create_app(&self, app: NewApp) -> Result<App, sqlx::Error>;
    /// All apps ordered by name.
    async fn list_apps(&self) -> Result<Vec<App>, sqlx::Error>;
    async fn find_app(&self, app_id: Uuid) -> Result<Option<App>, sqlx::Error>;
    async fn update_app(&self, app_id: Uuid, changes: AppChanges)
        -> Result<Option<App>, sqlx::Error>;
    /// Physically removes the app. Tickets and FAQs that reference it are left alone.
    async fn delete_app(&self, app_id: Uuid) -> Result<bool, sqlx::Error>;
}
