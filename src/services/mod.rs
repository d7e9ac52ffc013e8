pub mod analytics;
pub mod blob_store;
pub mod catalog;
pub mod identity;
pub mod mailer;
pub mod tickets;
