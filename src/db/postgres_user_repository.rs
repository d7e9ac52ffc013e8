use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    db::user_repository::UserRepository,
    models::user::{NewUser, User, UserRole},
};

const USER_COLUMNS: &str = "id, external_id, email, display_name, photo_url, role, created_at";

pub struct PostgresUserRepository {
    pub pool: PgPool,
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_user_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE external_id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error> {
        // A concurrent first sign-in for the same identity returns the row that won.
        let sql = format!(
            r#"
            INSERT INTO users (id, external_id, email, display_name, photo_url, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (external_id) DO UPDATE SET external_id = EXCLUDED.external_id
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.external_id)
            .bind(&user.email)
            .bind(&user.display_name)
            .bind(&user.photo_url)
            .bind(user.role)
            .bind(OffsetDateTime::now_utc())
            .fetch_one(&self.pool)
            .await
    }

    async fn list_users(&self) -> Result<Vec<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC");
        sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await
    }

    async fn update_user_role(
        &self,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("UPDATE users SET role = $2 WHERE id = $1 RETURNING {USER_COLUMNS}");
        sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .bind(role)
            .fetch_optional(&self.pool)
            .await
    }
}
