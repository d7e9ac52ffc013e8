use async_trait::async_trait;
use uuid::Uuid;

use crate::models::faq::{Faq, NewFaq};

#[async_trait]
pub trait FaqRepository: Send + Sync {
    async fn create_faq(&self, faq: NewFaq) -> Result<Faq, sqlx::Error>;
    async fn list_faqs(&self, app_id: Option<Uuid>) -> Result<Vec<Faq>, sqlx::Error>;
    async fn find_faq(&self, faq_id: Uuid) -> Result<Option<Faq>, sqlx::Error>;
    async fn update_faq(&self, faq_id: Uuid, faq: NewFaq) -> Result<Option<Faq>, sqlx::Error>;
    async fn delete_faq(&self, faq_id: Uuid) -> Result<bool, sqlx::Error>;
    /// Bumps the view counter in place and returns the updated FAQ.
    async fn increment_faq_views(&self, faq_id: Uuid) -> Result<Option<Faq>, sqlx::Error>;
}
