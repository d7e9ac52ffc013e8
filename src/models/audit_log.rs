use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

pub const ACTION_CREATED_TICKET: &str = "Created ticket";
pub const ACTION_CREATED_BUG_REPORT: &str = "Created bug report";
pub const ACTION_STATUS_CHANGED: &str = "Status changed";
pub const ACTION_BULK_STATUS_UPDATE: &str = "Bulk status update";
pub const ACTION_UPDATED_BUG_DETAILS: &str = "Updated bug details";

/// Append-only record of a ticket mutation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct AuditLog {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    pub action: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub operation_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Who performed a mutation, copied onto every audit entry it produces.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditActor {
    pub user_id: Uuid,
    pub user_email: String,
}

#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub actor: AuditActor,
    pub action: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub operation_id: Option<Uuid>,
}

impl NewAuditLog {
    pub fn new(actor: AuditActor, action: &str) -> Self {
        Self {
            actor,
            action: action.to_string(),
            old_value: None,
            new_value: None,
            operation_id: None,
        }
    }

    pub fn with_values(mut self, old_value: Option<String>, new_value: Option<String>) -> Self {
        self.old_value = old_value;
        self.new_value = new_value;
        self
    }

    pub fn with_operation(mut self, operation_id: Option<Uuid>) -> Self {
        self.operation_id = operation_id;
        self
    }

    pub fn into_entry(self, id: Uuid, ticket_id: Uuid, now: OffsetDateTime) -> AuditLog {
        AuditLog {
            id,
            ticket_id,
            user_id: self.actor.user_id,
            user_email: self.actor.user_email,
            action: self.action,
            old_value: self.old_value,
            new_value: self.new_value,
            operation_id: self.operation_id,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditLogFilter {
    pub ticket_id: Option<Uuid>,
    pub limit: Option<i64>,
}

impl AuditLogFilter {
    pub const DEFAULT_LIMIT: i64 = 100;
    pub const MAX_LIMIT: i64 = 500;

    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }
}
