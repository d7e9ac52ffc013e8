pub mod app_repository;
pub mod faq_repository;
#[cfg(test)]
pub mod mock_db;
pub mod postgres_app_repository;
pub mod postgres_faq_repository;
pub mod postgres_ticket_repository;
pub mod postgres_user_repository;
pub mod ticket_repository;
pub mod user_repository;
