//! Ticket workflows: submission, triage, bug details and comments.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    access::{can_view_ticket, visible_comments, Session},
    db::{
        app_repository::AppRepository,
        ticket_repository::{StatusUpdate, StatusUpdateOutcome, TicketRepository},
    },
    models::{
        audit_log::{
            AuditActor, NewAuditLog, ACTION_BULK_STATUS_UPDATE, ACTION_CREATED_BUG_REPORT,
            ACTION_CREATED_TICKET, ACTION_STATUS_CHANGED, ACTION_UPDATED_BUG_DETAILS,
        },
        comment::{Comment, NewComment},
        ticket::{
            InternalFieldChanges, NewTicket, Ticket, TicketCategory, TicketEnvironment,
            TicketPriority, TicketStatus, TicketType,
        },
    },
    services::catalog::{required_text, ValidationError},
};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_TEXT_LEN: usize = 4000;
pub const MAX_FIELD_LEN: usize = 200;
pub const MAX_MEDIA_URLS: usize = 10;
pub const MAX_BULK_TICKETS: usize = 500;

#[derive(Debug, Error)]
pub enum TicketError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("App not found")]
    UnknownApp,
    #[error("Ticket not found")]
    NotFound,
    #[error("Only internal tickets carry bug details")]
    NotInternal,
    #[error("ticket store error: {0}")]
    Store(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerTicketInput {
    pub app_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: TicketCategory,
    #[serde(default)]
    pub follow_up: bool,
    #[serde(default)]
    pub media_urls: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BugReportInput {
    pub app_id: Uuid,
    pub title: String,
    pub description: String,
    pub priority: TicketPriority,
    pub environment: Option<TicketEnvironment>,
    pub os: Option<String>,
    pub browser: Option<String>,
    pub app_version: Option<String>,
    pub log_file_url: Option<String>,
    #[serde(default)]
    pub media_urls: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkStatusRequest {
    pub ticket_ids: Vec<Uuid>,
    pub status: TicketStatus,
    /// Reusing an operation id retries only the tickets that did not get it yet.
    pub operation_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BulkStatusReport {
    pub operation_id: Uuid,
    pub updated: Vec<Uuid>,
    pub already_applied: Vec<Uuid>,
    pub not_found: Vec<Uuid>,
    pub failed: Vec<Uuid>,
}

impl BulkStatusReport {
    /// Every requested ticket now carries the operation.
    pub fn succeeded(&self) -> bool {
        self.not_found.is_empty() && self.failed.is_empty()
    }
}

fn actor(session: &Session) -> AuditActor {
    AuditActor {
        user_id: session.user_id,
        user_email: session.email.clone(),
    }
}

fn bounded_text(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
    let value = required_text(field, value)?;
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(value)
}

fn optional_field(
    field: &'static str,
    value: Option<String>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong { field, max }),
        other => Ok(other),
    }
}

fn media_urls(urls: Vec<String>) -> Result<Vec<String>, ValidationError> {
    let urls: Vec<String> = urls
        .into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect();
    if urls.len() > MAX_MEDIA_URLS {
        return Err(ValidationError::TooLong {
            field: "Attachments",
            max: MAX_MEDIA_URLS,
        });
    }
    Ok(urls)
}

async fn ensure_app_exists(apps: &dyn AppRepository, app_id: Uuid) -> Result<(), TicketError> {
    match apps.find_app(app_id).await? {
        Some(_) => Ok(()),
        None => Err(TicketError::UnknownApp),
    }
}

pub async fn submit_customer_ticket(
    tickets: &dyn TicketRepository,
    apps: &dyn AppRepository,
    session: &Session,
    input: CustomerTicketInput,
) -> Result<Ticket, TicketError> {
    let title = bounded_text("Title", &input.title, MAX_TITLE_LEN)?;
    let description = bounded_text("Description", &input.description, MAX_TEXT_LEN)?;
    let media_urls = media_urls(input.media_urls)?;
    ensure_app_exists(apps, input.app_id).await?;

    let new_ticket = NewTicket {
        ticket_type: TicketType::Customer,
        app_id: input.app_id,
        user_id: session.user_id,
        user_email: session.email.clone(),
        user_name: session.display_name.clone(),
        title,
        description,
        category: input.category,
        priority: None,
        follow_up: input.follow_up,
        media_urls,
        os: None,
        browser: None,
        app_version: None,
        environment: None,
        log_file_url: None,
    };

    let ticket = tickets
        .create_ticket(new_ticket, NewAuditLog::new(actor(session), ACTION_CREATED_TICKET))
        .await?;
    info!(ticket_id = %ticket.id, app_id = %ticket.app_id, user_id = %session.user_id, "customer ticket submitted");
    Ok(ticket)
}

pub async fn submit_bug_report(
    tickets: &dyn TicketRepository,
    apps: &dyn AppRepository,
    session: &Session,
    input: BugReportInput,
) -> Result<Ticket, TicketError> {
    let title = bounded_text("Title", &input.title, MAX_TITLE_LEN)?;
    let description = bounded_text("Description", &input.description, MAX_TEXT_LEN)?;
    let media_urls = media_urls(input.media_urls)?;
    let os = optional_field("OS", input.os, MAX_FIELD_LEN)?;
    let browser = optional_field("Browser", input.browser, MAX_FIELD_LEN)?;
    let app_version = optional_field("App version", input.app_version, MAX_FIELD_LEN)?;
    let log_file_url = optional_field("Log file", input.log_file_url, MAX_TEXT_LEN)?;
    ensure_app_exists(apps, input.app_id).await?;

    let new_ticket = NewTicket {
        ticket_type: TicketType::Internal,
        app_id: input.app_id,
        user_id: session.user_id,
        user_email: session.email.clone(),
        user_name: session.display_name.clone(),
        title,
        description,
        category: TicketCategory::Bug,
        priority: Some(input.priority),
        follow_up: false,
        media_urls,
        os,
        browser,
        app_version,
        environment: input.environment,
        log_file_url,
    };

    let ticket = tickets
        .create_ticket(
            new_ticket,
            NewAuditLog::new(actor(session), ACTION_CREATED_BUG_REPORT),
        )
        .await?;

    if input.priority == TicketPriority::Blocker {
        warn!(
            ticket_id = %ticket.id,
            app_id = %ticket.app_id,
            reporter = %session.email,
            title = %ticket.title,
            "blocker bug reported"
        );
    } else {
        info!(ticket_id = %ticket.id, priority = %input.priority, "bug report submitted");
    }
    Ok(ticket)
}

/// Loads a ticket the session may see. Tickets the caller may not view are
/// reported exactly like missing ones.
pub async fn load_ticket_for_session(
    tickets: &dyn TicketRepository,
    session: &Session,
    ticket_id: Uuid,
) -> Result<Ticket, TicketError> {
    match tickets.find_ticket(ticket_id).await? {
        Some(ticket) if can_view_ticket(session, &ticket) => Ok(ticket),
        _ => Err(TicketError::NotFound),
    }
}

pub async fn update_status(
    tickets: &dyn TicketRepository,
    session: &Session,
    ticket_id: Uuid,
    status: TicketStatus,
) -> Result<Ticket, TicketError> {
    let update = StatusUpdate {
        ticket_id,
        status,
        audit: NewAuditLog::new(actor(session), ACTION_STATUS_CHANGED),
    };
    match tickets.update_ticket_status(update).await? {
        StatusUpdateOutcome::Updated { ticket, previous } => {
            info!(%ticket_id, from = %previous, to = %status, "ticket status changed");
            Ok(ticket)
        }
        StatusUpdateOutcome::AlreadyApplied(ticket) => Ok(ticket),
        StatusUpdateOutcome::NotFound => Err(TicketError::NotFound),
    }
}

/// Applies one status to many tickets, each in its own transaction.
///
/// There is no rollback across tickets: a partial failure leaves the
/// succeeded tickets updated, and resubmitting with the report's
/// `operation_id` finishes the rest without touching them again.
pub async fn bulk_update_status(
    tickets: Arc<dyn TicketRepository>,
    session: &Session,
    request: BulkStatusRequest,
) -> Result<BulkStatusReport, TicketError> {
    let mut seen = HashSet::new();
    let ticket_ids: Vec<Uuid> = request
        .ticket_ids
        .into_iter()
        .filter(|id| seen.insert(*id))
        .collect();
    if ticket_ids.is_empty() {
        return Err(ValidationError::Required("Ticket selection").into());
    }
    if ticket_ids.len() > MAX_BULK_TICKETS {
        return Err(ValidationError::TooLong {
            field: "Ticket selection",
            max: MAX_BULK_TICKETS,
        }
        .into());
    }

    let operation_id = request.operation_id.unwrap_or_else(Uuid::new_v4);
    let mut set = JoinSet::new();
    for ticket_id in ticket_ids.iter().copied() {
        let repo = Arc::clone(&tickets);
        let update = StatusUpdate {
            ticket_id,
            status: request.status,
            audit: NewAuditLog::new(actor(session), ACTION_BULK_STATUS_UPDATE)
                .with_operation(Some(operation_id)),
        };
        set.spawn(async move { (ticket_id, repo.update_ticket_status(update).await) });
    }

    let mut report = BulkStatusReport {
        operation_id,
        ..Default::default()
    };
    let mut reported = HashSet::new();
    while let Some(joined) = set.join_next().await {
        let (ticket_id, result) = match joined {
            Ok(pair) => pair,
            Err(err) => {
                error!(?err, %operation_id, "bulk status task aborted");
                continue;
            }
        };
        reported.insert(ticket_id);
        match result {
            Ok(StatusUpdateOutcome::Updated { .. }) => report.updated.push(ticket_id),
            Ok(StatusUpdateOutcome::AlreadyApplied(_)) => report.already_applied.push(ticket_id),
            Ok(StatusUpdateOutcome::NotFound) => report.not_found.push(ticket_id),
            Err(err) => {
                error!(?err, %ticket_id, %operation_id, "bulk status update failed");
                report.failed.push(ticket_id);
            }
        }
    }
    // Tasks that panicked never reported their id.
    report
        .failed
        .extend(ticket_ids.iter().filter(|id| !reported.contains(*id)));

    // Keep the report in request order.
    let position = |id: &Uuid| ticket_ids.iter().position(|t| t == id);
    for list in [
        &mut report.updated,
        &mut report.already_applied,
        &mut report.not_found,
        &mut report.failed,
    ] {
        list.sort_by_key(position);
    }

    info!(
        %operation_id,
        status = %request.status,
        updated = report.updated.len(),
        already_applied = report.already_applied.len(),
        not_found = report.not_found.len(),
        failed = report.failed.len(),
        "bulk status update finished"
    );
    Ok(report)
}

pub async fn update_bug_details(
    tickets: &dyn TicketRepository,
    session: &Session,
    ticket_id: Uuid,
    changes: InternalFieldChanges,
) -> Result<Ticket, TicketError> {
    let changes = InternalFieldChanges {
        priority: changes.priority,
        environment: changes.environment,
        os: optional_field("OS", changes.os, MAX_FIELD_LEN)?,
        browser: optional_field("Browser", changes.browser, MAX_FIELD_LEN)?,
        app_version: optional_field("App version", changes.app_version, MAX_FIELD_LEN)?,
        fixed_in_build: optional_field("Fixed in build", changes.fixed_in_build, MAX_FIELD_LEN)?,
    };
    if changes.is_empty() {
        return Err(ValidationError::Required("At least one field").into());
    }

    let ticket = load_ticket_for_session(tickets, session, ticket_id).await?;
    if ticket.ticket_type != TicketType::Internal {
        return Err(TicketError::NotInternal);
    }

    let audit = NewAuditLog::new(actor(session), ACTION_UPDATED_BUG_DETAILS)
        .with_values(None, Some(changes.summary()));
    tickets
        .update_internal_fields(ticket_id, &changes, audit)
        .await?
        .ok_or(TicketError::NotFound)
}

/// Adds a comment. Only testers and admins can mark a comment internal; for
/// anyone else the flag is ignored.
pub async fn add_comment(
    tickets: &dyn TicketRepository,
    session: &Session,
    ticket_id: Uuid,
    text: &str,
    is_internal: bool,
) -> Result<Comment, TicketError> {
    let text = bounded_text("Comment", text, MAX_TEXT_LEN)?;
    load_ticket_for_session(tickets, session, ticket_id).await?;

    let comment = tickets
        .create_comment(NewComment {
            ticket_id,
            user_id: session.user_id,
            user_email: session.email.clone(),
            user_name: session.display_name.clone(),
            text,
            is_internal: is_internal && session.is_tester(),
        })
        .await?;
    Ok(comment)
}

/// Comments visible to the session, newest first.
pub async fn list_comments(
    tickets: &dyn TicketRepository,
    session: &Session,
    ticket_id: Uuid,
) -> Result<Vec<Comment>, TicketError> {
    load_ticket_for_session(tickets, session, ticket_id).await?;
    let comments = tickets
        .list_comments(ticket_id, session.is_tester())
        .await?;
    Ok(visible_comments(session, comments))
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::db::mock_db::MockDb;
    use crate::models::{audit_log::AuditLogFilter, ticket::TicketFilter, user::UserRole};
    use time::OffsetDateTime;

    #[tokio::test]
    async fn submitted_ticket_is_open_and_listed_under_its_app() {
        let db = MockDb::default();
        let product = app("My Awesome App");
        let other = app("Cool Project");
        db.insert_app(product.clone());
        db.insert_app(other.clone());
        let customer = session(UserRole::Customer);

        let ticket = submit_customer_ticket(&db, &db, &customer, customer_input(product.id))
            .await
            .unwrap();
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.ticket_type, TicketType::Customer);
        assert!(ticket.created_at <= OffsetDateTime::now_utc());

        let in_app = db.list_tickets(&TicketFilter::for_app(product.id)).await.unwrap();
        assert!(in_app.iter().any(|t| t.id == ticket.id));
        let elsewhere = db.list_tickets(&TicketFilter::for_app(other.id)).await.unwrap();
        assert!(elsewhere.is_empty());

        let audit = db.audit_entries_for(ticket.id);
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, ACTION_CREATED_TICKET);
    }

    #[tokio::test]
    async fn submission_requires_existing_app_and_text() {
        let db = MockDb::default();
        let customer = session(UserRole::Customer);

        let missing_app = submit_customer_ticket(&db, &db, &customer, customer_input(Uuid::new_v4())).await;
        assert!(matches!(missing_app, Err(TicketError::UnknownApp)));

        let product = app("My Awesome App");
        db.insert_app(product.clone());
        let mut blank = customer_input(product.id);
        blank.title = "   ".into();
        let result = submit_customer_ticket(&db, &db, &customer, blank).await;
        assert!(matches!(
            result,
            Err(TicketError::Validation(ValidationError::Required("Title")))
        ));

        let mut long = customer_input(product.id);
        long.description = "x".repeat(MAX_TEXT_LEN + 1);
        let result = submit_customer_ticket(&db, &db, &customer, long).await;
        assert!(matches!(
            result,
            Err(TicketError::Validation(ValidationError::TooLong { .. }))
        ));
        assert!(db.tickets.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bug_reports_are_internal_bugs() {
        let db = MockDb::default();
        let product = app("My Awesome App");
        db.insert_app(product.clone());
        let tester = session(UserRole::Tester);

        let ticket = submit_bug_report(
            &db,
            &db,
            &tester,
            BugReportInput {
                app_id: product.id,
                title: "Crash on launch".into(),
                description: "App exits immediately on Android 14.".into(),
                priority: TicketPriority::Blocker,
                environment: Some(TicketEnvironment::Staging),
                os: Some(" Android 14 ".into()),
                browser: None,
                app_version: Some("2.3.1".into()),
                log_file_url: None,
                media_urls: vec![],
            },
        )
        .await
        .unwrap();

        assert_eq!(ticket.ticket_type, TicketType::Internal);
        assert_eq!(ticket.category, TicketCategory::Bug);
        assert_eq!(ticket.priority, Some(TicketPriority::Blocker));
        assert_eq!(ticket.os.as_deref(), Some("Android 14"));
        assert_eq!(db.audit_entries_for(ticket.id)[0].action, ACTION_CREATED_BUG_REPORT);
    }

    #[tokio::test]
    async fn resolving_sets_resolved_at_and_audits() {
        let db = MockDb::default();
        let product = app("My Awesome App");
        db.insert_app(product.clone());
        let customer = session(UserRole::Customer);
        let admin = session(UserRole::Admin);
        let ticket = submit_customer_ticket(&db, &db, &customer, customer_input(product.id))
            .await
            .unwrap();

        let pending = update_status(&db, &admin, ticket.id, TicketStatus::Pending)
            .await
            .unwrap();
        assert!(pending.resolved_at.is_none());

        let resolved = update_status(&db, &admin, ticket.id, TicketStatus::Resolved)
            .await
            .unwrap();
        let resolved_at = resolved.resolved_at.expect("resolved_at should be set");
        assert!(resolved_at >= resolved.created_at);

        let entries = db.audit_entries_for(ticket.id);
        let last = entries.last().unwrap();
        assert_eq!(last.action, ACTION_STATUS_CHANGED);
        assert_eq!(last.old_value.as_deref(), Some("pending"));
        assert_eq!(last.new_value.as_deref(), Some("resolved"));
        assert_eq!(last.user_email, admin.email);

        let missing = update_status(&db, &admin, Uuid::new_v4(), TicketStatus::Open).await;
        assert!(matches!(missing, Err(TicketError::NotFound)));
    }

    #[tokio::test]
    async fn bulk_update_reports_partial_failure() {
        let db = Arc::new(MockDb::default());
        let product = app("My Awesome App");
        db.insert_app(product.clone());
        let customer = session(UserRole::Customer);
        let admin = session(UserRole::Admin);

        let mut ids = Vec::new();
        for _ in 0..3 {
            let t = submit_customer_ticket(db.as_ref(), db.as_ref(), &customer, customer_input(product.id))
                .await
                .unwrap();
            ids.push(t.id);
        }
        db.fail_status_update_for(ids[1]);

        let repo: Arc<dyn TicketRepository> = db.clone();
        let report = bulk_update_status(
            repo,
            &admin,
            BulkStatusRequest {
                ticket_ids: ids.clone(),
                status: TicketStatus::Resolved,
                operation_id: None,
            },
        )
        .await
        .unwrap();

        assert!(!report.succeeded());
        assert_eq!(report.updated, vec![ids[0], ids[2]]);
        assert_eq!(report.failed, vec![ids[1]]);

        for id in [ids[0], ids[2]] {
            let t = db.find_ticket(id).await.unwrap().unwrap();
            assert_eq!(t.status, TicketStatus::Resolved);
            let bulk_entries: Vec<_> = db
                .audit_entries_for(id)
                .into_iter()
                .filter(|e| e.action == ACTION_BULK_STATUS_UPDATE)
                .collect();
            assert_eq!(bulk_entries.len(), 1);
            assert_eq!(bulk_entries[0].operation_id, Some(report.operation_id));
        }

        let untouched = db.find_ticket(ids[1]).await.unwrap().unwrap();
        assert_eq!(untouched.status, TicketStatus::Open);
        assert!(untouched.resolved_at.is_none());
        assert!(db
            .audit_entries_for(ids[1])
            .iter()
            .all(|e| e.action != ACTION_BULK_STATUS_UPDATE));
    }

    #[tokio::test]
    async fn bulk_retry_with_same_operation_is_idempotent() {
        let db = Arc::new(MockDb::default());
        let product = app("My Awesome App");
        db.insert_app(product.clone());
        let customer = session(UserRole::Customer);
        let admin = session(UserRole::Admin);

        let a = submit_customer_ticket(db.as_ref(), db.as_ref(), &customer, customer_input(product.id))
            .await
            .unwrap();
        let b = submit_customer_ticket(db.as_ref(), db.as_ref(), &customer, customer_input(product.id))
            .await
            .unwrap();
        db.fail_status_update_for(b.id);

        let request = BulkStatusRequest {
            ticket_ids: vec![a.id, b.id, a.id],
            status: TicketStatus::InProgress,
            operation_id: Some(Uuid::new_v4()),
        };
        let first = bulk_update_status(db.clone(), &admin, request.clone()).await.unwrap();
        assert_eq!(first.updated, vec![a.id]);
        assert_eq!(first.failed, vec![b.id]);

        db.fail_status_updates_for.lock().unwrap().clear();
        let retry = bulk_update_status(db.clone(), &admin, request).await.unwrap();
        assert!(retry.succeeded());
        assert_eq!(retry.already_applied, vec![a.id]);
        assert_eq!(retry.updated, vec![b.id]);

        let logs = db
            .list_audit_logs(&AuditLogFilter {
                ticket_id: Some(a.id),
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(
            logs.iter()
                .filter(|e| e.action == ACTION_BULK_STATUS_UPDATE)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn bulk_update_counts_missing_tickets_as_failures() {
        let db = Arc::new(MockDb::default());
        let admin = session(UserRole::Admin);
        let ghost = Uuid::new_v4();
        let report = bulk_update_status(
            db,
            &admin,
            BulkStatusRequest {
                ticket_ids: vec![ghost],
                status: TicketStatus::Resolved,
                operation_id: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(report.not_found, vec![ghost]);
        assert!(!report.succeeded());

        let empty = bulk_update_status(
            Arc::new(MockDb::default()),
            &admin,
            BulkStatusRequest {
                ticket_ids: vec![],
                status: TicketStatus::Resolved,
                operation_id: None,
            },
        )
        .await;
        assert!(matches!(empty, Err(TicketError::Validation(_))));
    }

    #[tokio::test]
    async fn customers_cannot_post_internal_comments_or_read_them() {
        let db = MockDb::default();
        let product = app("My Awesome App");
        db.insert_app(product.clone());
        let customer = session(UserRole::Customer);
        let tester = session(UserRole::Tester);
        let ticket = submit_customer_ticket(&db, &db, &customer, customer_input(product.id))
            .await
            .unwrap();

        let sneaky = add_comment(&db, &customer, ticket.id, "let me in", true)
            .await
            .unwrap();
        assert!(!sneaky.is_internal);
        let note = add_comment(&db, &tester, ticket.id, "repro on staging", true)
            .await
            .unwrap();
        assert!(note.is_internal);

        let for_customer = list_comments(&db, &customer, ticket.id).await.unwrap();
        assert_eq!(for_customer.len(), 1);
        assert!(for_customer.iter().all(|c| !c.is_internal));

        let for_tester = list_comments(&db, &tester, ticket.id).await.unwrap();
        assert_eq!(for_tester.len(), 2);
        assert_eq!(for_tester[0].id, note.id);
    }

    #[tokio::test]
    async fn other_customers_tickets_look_missing() {
        let db = MockDb::default();
        let product = app("My Awesome App");
        db.insert_app(product.clone());
        let owner = session(UserRole::Customer);
        let stranger = session(UserRole::Customer);
        let ticket = submit_customer_ticket(&db, &db, &owner, customer_input(product.id))
            .await
            .unwrap();

        assert!(load_ticket_for_session(&db, &owner, ticket.id).await.is_ok());
        assert!(matches!(
            load_ticket_for_session(&db, &stranger, ticket.id).await,
            Err(TicketError::NotFound)
        ));
        assert!(matches!(
            add_comment(&db, &stranger, ticket.id, "hi", false).await,
            Err(TicketError::NotFound)
        ));
    }

    #[tokio::test]
    async fn bug_details_update_only_internal_tickets() {
        let db = MockDb::default();
        let product = app("My Awesome App");
        db.insert_app(product.clone());
        let customer = session(UserRole::Customer);
        let tester = session(UserRole::Tester);
        let customer_ticket = submit_customer_ticket(&db, &db, &customer, customer_input(product.id))
            .await
            .unwrap();

        let changes = InternalFieldChanges {
            fixed_in_build: Some("1.4.2".into()),
            ..Default::default()
        };
        assert!(matches!(
            update_bug_details(&db, &tester, customer_ticket.id, changes.clone()).await,
            Err(TicketError::NotInternal)
        ));
        assert!(matches!(
            update_bug_details(&db, &tester, customer_ticket.id, InternalFieldChanges::default()).await,
            Err(TicketError::Validation(_))
        ));

        let bug = submit_bug_report(
            &db,
            &db,
            &tester,
            BugReportInput {
                app_id: product.id,
                title: "Slow search".into(),
                description: "Search takes 10s".into(),
                priority: TicketPriority::Medium,
                environment: None,
                os: None,
                browser: None,
                app_version: None,
                log_file_url: None,
                media_urls: vec![],
            },
        )
        .await
        .unwrap();
        let updated = update_bug_details(&db, &tester, bug.id, changes).await.unwrap();
        assert_eq!(updated.fixed_in_build.as_deref(), Some("1.4.2"));
        let last = db.audit_entries_for(bug.id).pop().unwrap();
        assert_eq!(last.action, ACTION_UPDATED_BUG_DETAILS);
        assert_eq!(last.new_value.as_deref(), Some("fixed_in_build=1.4.2"));
    }

    #[tokio::test]
    async fn store_failures_surface_as_store_errors() {
        let db = MockDb::failing();
        let customer = session(UserRole::Customer);
        let result = submit_customer_ticket(&db, &db, &customer, customer_input(Uuid::new_v4())).await;
        assert!(matches!(result, Err(TicketError::Store(_))));
    }
}
