use async_trait::async_trait;
use uuid::Uuid;

use crate::models::user::{NewUser, User, UserRole};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user_by_external_id(&self, external_id: &str)
        -> Result<Option<User>, sqlx::Error>;
    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error>;
    /// Inserts the user, or returns the existing row when the external id is already known.
    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error>;
    async fn list_users(&self) -> Result<Vec<User>, sqlx::Error>;
    async fn update_user_role(
        &self,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<Option<User>, sqlx::Error>;
}
