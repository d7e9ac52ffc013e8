use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    db::faq_repository::FaqRepository,
    models::faq::{Faq, NewFaq},
};

const FAQ_COLUMNS: &str = "id, app_id, question, answer, category, views, created_at, updated_at";

pub struct PostgresFaqRepository {
    pub pool: PgPool,
}

#[async_trait]
impl FaqRepository for PostgresFaqRepository {
    async fn create_faq(&self, faq: NewFaq) -> Result<Faq, sqlx::Error> {
        let now = OffsetDateTime::now_utc();
        let sql = format!(
            r#"
            INSERT INTO faqs (id, app_id, question, answer, category, views, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 0, $6, $6)
            RETURNING {FAQ_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Faq>(&sql)
            .bind(Uuid::new_v4())
            .bind(faq.app_id)
            .bind(&faq.question)
            .bind(&faq.answer)
            .bind(&faq.category)
            .bind(now)
            .fetch_one(&self.pool)
            .await
    }

    async fn list_faqs(&self, app_id: Option<Uuid>) -> Result<Vec<Faq>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {FAQ_COLUMNS}
            FROM faqs
            WHERE ($1::uuid IS NULL OR app_id = $1)
            ORDER BY created_at DESC
            "#
        );
        sqlx::query_as::<_, Faq>(&sql)
            .bind(app_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn find_faq(&self, faq_id: Uuid) -> Result<Option<Faq>, sqlx::Error> {
        let sql = format!("SELECT {FAQ_COLUMNS} FROM faqs WHERE id = $1");
        sqlx::query_as::<_, Faq>(&sql)
            .bind(faq_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn update_faq(&self, faq_id: Uuid, faq: NewFaq) -> Result<Option<Faq>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE faqs
            SET app_id = $2, question = $3, answer = $4, category = $5, updated_at = $6
            WHERE id = $1
            RETURNING {FAQ_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Faq>(&sql)
            .bind(faq_id)
            .bind(faq.app_id)
            .bind(&faq.question)
            .bind(&faq.answer)
            .bind(&faq.category)
            .bind(OffsetDateTime::now_utc())
            .fetch_optional(&self.pool)
            .await
    }

    async fn delete_faq(&self, faq_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM faqs WHERE id = $1")
            .bind(faq_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn increment_faq_views(&self, faq_id: Uuid) -> Result<Option<Faq>, sqlx::Error> {
        let sql = format!("UPDATE faqs SET views = views + 1 WHERE id = $1 RETURNING {FAQ_COLUMNS}");
        sqlx::query_as::<_, Faq>(&sql)
            .bind(faq_id)
            .fetch_optional(&self.pool)
            .await
    }
}
