use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    audit_log::{AuditLog, AuditLogFilter, NewAuditLog},
    comment::{Comment, NewComment},
    ticket::{InternalFieldChanges, NewTicket, Ticket, TicketFilter, TicketStatus},
};

/// A status change together with the audit entry that must accompany it.
///
/// The repository fills in the audit entry's old/new values from the row it
/// actually updated.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub ticket_id: Uuid,
    pub status: TicketStatus,
    pub audit: NewAuditLog,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdateOutcome {
    Updated {
        ticket: Ticket,
        previous: TicketStatus,
    },
    /// The ticket already carries an audit entry for this operation id.
    AlreadyApplied(Ticket),
    NotFound,
}

/// Store for tickets and the records that hang off them.
///
/// Every ticket mutation and its audit entry are written atomically.
#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn create_ticket(&self, ticket: NewTicket, audit: NewAuditLog)
        -> Result<Ticket, sqlx::Error>;
    /// Tickets matching `filter`, newest first.
    async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, sqlx::Error>;
    async fn find_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, sqlx::Error>;
    async fn update_ticket_status(
        &self,
        update: StatusUpdate,
    ) -> Result<StatusUpdateOutcome, sqlx::Error>;
    async fn update_internal_fields(
        &self,
        ticket_id: Uuid,
        changes: &InternalFieldChanges,
        audit: NewAuditLog,
    ) -> Result<Option<Ticket>, sqlx::Error>;
    async fn delete_ticket(&self, ticket_id: Uuid) -> Result<bool, sqlx::Error>;

    async fn create_comment(&self, comment: NewComment) -> Result<Comment, sqlx::Error>;
    /// Comments on a ticket, newest first. Internal comments are only returned
    /// when `include_internal` is set.
    async fn list_comments(
        &self,
        ticket_id: Uuid,
        include_internal: bool,
    ) -> Result<Vec<Comment>, sqlx::Error>;

    async fn list_audit_logs(&self, filter: &AuditLogFilter) -> Result<Vec<AuditLog>, sqlx::Error>;
}
