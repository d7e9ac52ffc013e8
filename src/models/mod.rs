pub mod app;
pub mod audit_log;
pub mod comment;
pub mod faq;
pub mod ticket;
pub mod user;
