use core::fmt;

use serde::{Deserialize, Serialize};
use sqlx::{prelude::Type, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "ticket_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketType {
    Customer,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "ticket_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    Pending,
    InProgress,
    Resolved,
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TicketStatus::Open => "open",
            TicketStatus::Pending => "pending",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "ticket_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketCategory {
    Billing,
    Bug,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "ticket_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Blocker,
    High,
    Medium,
    Low,
}

impl fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TicketPriority::Blocker => "blocker",
            TicketPriority::High => "high",
            TicketPriority::Medium => "medium",
            TicketPriority::Low => "low",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "ticket_environment", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketEnvironment {
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Ticket {
    pub id: Uuid,
    pub ticket_type: TicketType,
    pub app_id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    pub user_name: String,
    pub title: String,
    pub description: String,
    pub category: TicketCategory,
    pub priority: Option<TicketPriority>,
    pub status: TicketStatus,
    pub follow_up: bool,
    pub media_urls: Vec<String>,
    pub os: Option<String>,
    pub browser: Option<String>,
    pub app_version: Option<String>,
    pub environment: Option<TicketEnvironment>,
    pub log_file_url: Option<String>,
    pub fixed_in_build: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub resolved_at: Option<OffsetDateTime>,
}

impl Ticket {
    /// Moves the ticket to `status` and returns the previous status.
    ///
    /// Any status may follow any other. `resolved_at` is stamped the first time
    /// the ticket becomes resolved and is never cleared or overwritten.
    pub fn apply_status(&mut self, status: TicketStatus, now: OffsetDateTime) -> TicketStatus {
        let previous = self.status;
        self.status = status;
        self.updated_at = now;
        if status == TicketStatus::Resolved && self.resolved_at.is_none() {
            self.resolved_at = Some(now.max(self.created_at));
        }
        previous
    }

    pub fn apply_internal_changes(&mut self, changes: &InternalFieldChanges, now: OffsetDateTime) {
        if let Some(priority) = changes.priority {
            self.priority = Some(priority);
        }
        if let Some(environment) = changes.environment {
            self.environment = Some(environment);
        }
        if let Some(os) = &changes.os {
            self.os = Some(os.clone());
        }
        if let Some(browser) = &changes.browser {
            self.browser = Some(browser.clone());
        }
        if let Some(app_version) = &changes.app_version {
            self.app_version = Some(app_version.clone());
        }
        if let Some(build) = &changes.fixed_in_build {
            self.fixed_in_build = Some(build.clone());
        }
        self.updated_at = now;
    }
}

/// Everything the store needs to insert a ticket. Status always starts at `open`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTicket {
    pub ticket_type: TicketType,
    pub app_id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    pub user_name: String,
    pub title: String,
    pub description: String,
    pub category: TicketCategory,
    pub priority: Option<TicketPriority>,
    pub follow_up: bool,
    pub media_urls: Vec<String>,
    pub os: Option<String>,
    pub browser: Option<String>,
    pub app_version: Option<String>,
    pub environment: Option<TicketEnvironment>,
    pub log_file_url: Option<String>,
}

impl NewTicket {
    pub fn into_ticket(self, id: Uuid, now: OffsetDateTime) -> Ticket {
        Ticket {
            id,
            ticket_type: self.ticket_type,
            app_id: self.app_id,
            user_id: self.user_id,
            user_email: self.user_email,
            user_name: self.user_name,
            title: self.title,
            description: self.description,
            category: self.category,
            priority: self.priority,
            status: TicketStatus::Open,
            follow_up: self.follow_up,
            media_urls: self.media_urls,
            os: self.os,
            browser: self.browser,
            app_version: self.app_version,
            environment: self.environment,
            log_file_url: self.log_file_url,
            fixed_in_build: None,
            created_at: now,
            updated_at: now,
            resolved_at: None,
        }
    }
}

/// Tester-editable fields of an internal ticket. `None` leaves a field as is.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InternalFieldChanges {
    pub priority: Option<TicketPriority>,
    pub environment: Option<TicketEnvironment>,
    pub os: Option<String>,
    pub browser: Option<String>,
    pub app_version: Option<String>,
    pub fixed_in_build: Option<String>,
}

impl InternalFieldChanges {
    pub fn is_empty(&self) -> bool {
        *self == InternalFieldChanges::default()
    }

    /// Short human readable summary stored as the audit entry's new value.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(priority) = self.priority {
            parts.push(format!("priority={priority}"));
        }
        if let Some(environment) = self.environment {
            let env = match environment {
                TicketEnvironment::Staging => "staging",
                TicketEnvironment::Production => "production",
            };
            parts.push(format!("environment={env}"));
        }
        if let Some(os) = &self.os {
            parts.push(format!("os={os}"));
        }
        if let Some(browser) = &self.browser {
            parts.push(format!("browser={browser}"));
        }
        if let Some(version) = &self.app_version {
            parts.push(format!("app_version={version}"));
        }
        if let Some(build) = &self.fixed_in_build {
            parts.push(format!("fixed_in_build={build}"));
        }
        parts.join(", ")
    }
}

/// Equality filters for ticket listings. Results are always newest first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketFilter {
    pub app_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub ticket_type: Option<TicketType>,
    pub status: Option<TicketStatus>,
    pub search: Option<String>,
}

impl TicketFilter {
    pub fn for_app(app_id: Uuid) -> Self {
        Self {
            app_id: Some(app_id),
            ..Default::default()
        }
    }

    pub fn for_creator(user_id: Uuid, ticket_type: TicketType) -> Self {
        Self {
            user_id: Some(user_id),
            ticket_type: Some(ticket_type),
            ..Default::default()
        }
    }

    /// In-memory counterpart of the SQL filter, used by the test doubles.
    pub fn matches(&self, ticket: &Ticket) -> bool {
        if self.app_id.is_some_and(|id| id != ticket.app_id) {
            return false;
        }
        if self.user_id.is_some_and(|id| id != ticket.user_id) {
            return false;
        }
        if self.ticket_type.is_some_and(|t| t != ticket.ticket_type) {
            return false;
        }
        if self.status.is_some_and(|s| s != ticket.status) {
            return false;
        }
        match self.search_term() {
            Some(term) => {
                let term = term.to_lowercase();
                ticket.id.to_string().contains(&term)
                    || ticket.user_email.to_lowercase().contains(&term)
                    || ticket.title.to_lowercase().contains(&term)
                    || ticket.description.to_lowercase().contains(&term)
            }
            None => true,
        }
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }
}
