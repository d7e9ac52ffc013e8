pub mod admin;
pub mod apps;
pub mod auth;
pub mod knowledge_base;
pub mod testing;
pub mod tickets;
pub mod uploads;
