use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    db::app_repository::AppRepository,
    models::app::{App, AppChanges, NewApp},
};

const APP_COLUMNS: &str = "id, name, description, site_url, api_key, created_at, created_by";

pub struct PostgresAppRepository {
    pub pool: PgPool,
}

#[async_trait]
impl AppRepository for PostgresAppRepository {
    async fn create_app(&self, app: NewApp) -> Result<App, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO apps (id, name, description, site_url, api_key, created_at, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {APP_COLUMNS}
            "#
        );
        sqlx::query_as::<_, App>(&sql)
            .bind(Uuid::new_v4())
            .bind(&app.name)
            .bind(&app.description)
            .bind(&app.site_url)
            .bind(&app.api_key)
            .bind(OffsetDateTime::now_utc())
            .bind(&app.created_by)
            .fetch_one(&self.pool)
            .await
    }

    async fn list_apps(&self) -> Result<Vec<App>, sqlx::Error> {
        let sql = format!("SELECT {APP_COLUMNS} FROM apps ORDER BY name ASC");
        sqlx::query_as::<_, App>(&sql).fetch_all(&self.pool).await
    }

    async fn find_app(&self, app_id: Uuid) -> Result<Option<App>, sqlx::Error> {
        let sql = format!("SELECT {APP_COLUMNS} FROM apps WHERE id = $1");
        sqlx::query_as::<_, App>(&sql)
            .bind(app_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn update_app(
        &self,
        app_id: Uuid,
        changes: AppChanges,
    ) -> Result<Option<App>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE apps
            SET name = $2, description = $3, site_url = $4
            WHERE id = $1
            RETURNING {APP_COLUMNS}
            "#
        );
        sqlx::query_as::<_, App>(&sql)
            .bind(app_id)
            .bind(&changes.name)
            .bind(&changes.description)
            .bind(&changes.site_url)
            .fetch_optional(&self.pool)
            .await
    }

    async fn delete_app(&self, app_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM apps WHERE id = $1")
            .bind(app_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
