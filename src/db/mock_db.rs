use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::{
    app_repository::AppRepository,
    faq_repository::FaqRepository,
    ticket_repository::{StatusUpdate, StatusUpdateOutcome, TicketRepository},
    user_repository::UserRepository,
};
use crate::models::{
    app::{App, AppChanges, NewApp},
    audit_log::{AuditLog, AuditLogFilter, NewAuditLog},
    comment::{Comment, NewComment},
    faq::{Faq, NewFaq},
    ticket::{InternalFieldChanges, NewTicket, Ticket, TicketFilter},
    user::{NewUser, User, UserRole},
};

/// In-memory stand-in for every repository trait.
///
/// Lists come back newest first; rows sharing a timestamp keep reverse
/// insertion order, which is what a `created_at DESC` query over monotonic
/// inserts returns.
#[derive(Default)]
pub struct MockDb {
    pub should_fail: bool,
    /// Status updates for these tickets fail as if the store were unavailable.
    pub fail_status_updates_for: Mutex<HashSet<Uuid>>,
    pub find_ticket_calls: AtomicUsize,
    pub users: Mutex<Vec<User>>,
    pub apps: Mutex<Vec<App>>,
    pub tickets: Mutex<Vec<Ticket>>,
    pub comments: Mutex<Vec<Comment>>,
    pub audit_logs: Mutex<Vec<AuditLog>>,
    pub faqs: Mutex<Vec<Faq>>,
}

fn mock_failure() -> sqlx::Error {
    sqlx::Error::Protocol("Mock DB failure".into())
}

fn newest_first<T: Clone>(rows: &[T], created_at: impl Fn(&T) -> OffsetDateTime) -> Vec<T> {
    let mut out: Vec<T> = rows.iter().rev().cloned().collect();
    out.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
    out
}

impl MockDb {
    fn check(&self) -> Result<(), sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        Ok(())
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub fn fail_status_update_for(&self, ticket_id: Uuid) {
        self.fail_status_updates_for
            .lock()
            .unwrap()
            .insert(ticket_id);
    }

    pub fn insert_app(&self, app: App) {
        self.apps.lock().unwrap().push(app);
    }

    pub fn insert_user(&self, user: User) {
        self.users.lock().unwrap().push(user);
    }

    pub fn audit_entries_for(&self, ticket_id: Uuid) -> Vec<AuditLog> {
        self.audit_logs
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.ticket_id == ticket_id)
            .cloned()
            .collect()
    }

    fn push_audit(&self, ticket_id: Uuid, audit: NewAuditLog, now: OffsetDateTime) {
        self.audit_logs
            .lock()
            .unwrap()
            .push(audit.into_entry(Uuid::new_v4(), ticket_id, now));
    }
}

#[async_trait]
impl UserRepository for MockDb {
    async fn find_user_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        self.check()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.external_id == external_id)
            .cloned())
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        self.check()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.id == user_id)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        if let Some(existing) = users.iter().find(|u| u.external_id == user.external_id) {
            return Ok(existing.clone());
        }
        let created = User {
            id: Uuid::new_v4(),
            external_id: user.external_id,
            email: user.email,
            display_name: user.display_name,
            photo_url: user.photo_url,
            role: user.role,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn list_users(&self) -> Result<Vec<User>, sqlx::Error> {
        self.check()?;
        Ok(newest_first(&self.users.lock().unwrap(), |u| u.created_at))
    }

    async fn update_user_role(
        &self,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<Option<User>, sqlx::Error> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        Ok(users.iter_mut().find(|u| u.id == user_id).map(|user| {
            user.role = role;
            user.clone()
        }))
    }
}

#[async_trait]
impl AppRepository for MockDb {
    async fn create_app(&self, app: NewApp) -> Result<App, sqlx::Error> {
        self.check()?;
        let created = App {
            id: Uuid::new_v4(),
            name: app.name,
            description: app.description,
            site_url: app.site_url,
            api_key: app.api_key,
            created_at: OffsetDateTime::now_utc(),
            created_by: app.created_by,
        };
        self.apps.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn list_apps(&self) -> Result<Vec<App>, sqlx::Error> {
        self.check()?;
        let mut apps = self.apps.lock().unwrap().clone();
        apps.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(apps)
    }

    async fn find_app(&self, app_id: Uuid) -> Result<Option<App>, sqlx::Error> {
        self.check()?;
        Ok(self
            .apps
            .lock()
            .unwrap()
            .iter()
            .find(|app| app.id == app_id)
            .cloned())
    }

    async fn update_app(
        &self,
        app_id: Uuid,
        changes: AppChanges,
    ) -> Result<Option<App>, sqlx::Error> {
        self.check()?;
        let mut apps = self.apps.lock().unwrap();
        Ok(apps.iter_mut().find(|app| app.id == app_id).map(|app| {
            app.name = changes.name;
            app.description = changes.description;
            app.site_url = changes.site_url;
            app.clone()
        }))
    }

    async fn delete_app(&self, app_id: Uuid) -> Result<bool, sqlx::Error> {
        self.check()?;
        let mut apps = self.apps.lock().unwrap();
        let before = apps.len();
        apps.retain(|app| app.id != app_id);
        Ok(apps.len() < before)
    }
}

#[async_trait]
impl TicketRepository for MockDb {
    async fn create_ticket(
        &self,
        ticket: NewTicket,
        audit: NewAuditLog,
    ) -> Result<Ticket, sqlx::Error> {
        self.check()?;
        let now = OffsetDateTime::now_utc();
        let ticket = ticket.into_ticket(Uuid::new_v4(), now);
        self.tickets.lock().unwrap().push(ticket.clone());
        self.push_audit(ticket.id, audit, now);
        Ok(ticket)
    }

    async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, sqlx::Error> {
        self.check()?;
        let tickets = self.tickets.lock().unwrap();
        let matching: Vec<Ticket> = tickets
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        Ok(newest_first(&matching, |t| t.created_at))
    }

    async fn find_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, sqlx::Error> {
        self.find_ticket_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self
            .tickets
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == ticket_id)
            .cloned())
    }

    async fn update_ticket_status(
        &self,
        update: StatusUpdate,
    ) -> Result<StatusUpdateOutcome, sqlx::Error> {
        self.check()?;
        if self
            .fail_status_updates_for
            .lock()
            .unwrap()
            .contains(&update.ticket_id)
        {
            return Err(mock_failure());
        }

        let already_applied = update.audit.operation_id.is_some_and(|op| {
            self.audit_logs
                .lock()
                .unwrap()
                .iter()
                .any(|e| e.ticket_id == update.ticket_id && e.operation_id == Some(op))
        });

        let now = OffsetDateTime::now_utc();
        let (ticket, previous) = {
            let mut tickets = self.tickets.lock().unwrap();
            let Some(ticket) = tickets.iter_mut().find(|t| t.id == update.ticket_id) else {
                return Ok(StatusUpdateOutcome::NotFound);
            };
            if already_applied {
                return Ok(StatusUpdateOutcome::AlreadyApplied(ticket.clone()));
            }
            let previous = ticket.apply_status(update.status, now);
            (ticket.clone(), previous)
        };

        let audit = update
            .audit
            .with_values(Some(previous.to_string()), Some(update.status.to_string()));
        self.push_audit(ticket.id, audit, now);
        Ok(StatusUpdateOutcome::Updated { ticket, previous })
    }

    async fn update_internal_fields(
        &self,
        ticket_id: Uuid,
        changes: &InternalFieldChanges,
        audit: NewAuditLog,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        self.check()?;
        let now = OffsetDateTime::now_utc();
        let updated = {
            let mut tickets = self.tickets.lock().unwrap();
            tickets.iter_mut().find(|t| t.id == ticket_id).map(|ticket| {
                ticket.apply_internal_changes(changes, now);
                ticket.clone()
            })
        };
        if updated.is_some() {
            self.push_audit(ticket_id, audit, now);
        }
        Ok(updated)
    }

    async fn delete_ticket(&self, ticket_id: Uuid) -> Result<bool, sqlx::Error> {
        self.check()?;
        let mut tickets = self.tickets.lock().unwrap();
        let before = tickets.len();
        tickets.retain(|t| t.id != ticket_id);
        let removed = tickets.len() < before;
        if removed {
            self.comments
                .lock()
                .unwrap()
                .retain(|c| c.ticket_id != ticket_id);
        }
        Ok(removed)
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment, sqlx::Error> {
        self.check()?;
        let created = Comment {
            id: Uuid::new_v4(),
            ticket_id: comment.ticket_id,
            user_id: comment.user_id,
            user_email: comment.user_email,
            user_name: comment.user_name,
            text: comment.text,
            is_internal: comment.is_internal,
            created_at: OffsetDateTime::now_utc(),
        };
        self.comments.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn list_comments(
        &self,
        ticket_id: Uuid,
        include_internal: bool,
    ) -> Result<Vec<Comment>, sqlx::Error> {
        self.check()?;
        let comments: Vec<Comment> = self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.ticket_id == ticket_id && (include_internal || !c.is_internal))
            .cloned()
            .collect();
        Ok(newest_first(&comments, |c| c.created_at))
    }

    async fn list_audit_logs(&self, filter: &AuditLogFilter) -> Result<Vec<AuditLog>, sqlx::Error> {
        self.check()?;
        let entries: Vec<AuditLog> = self
            .audit_logs
            .lock()
            .unwrap()
            .iter()
            .filter(|e| filter.ticket_id.map_or(true, |id| id == e.ticket_id))
            .cloned()
            .collect();
        let mut entries = newest_first(&entries, |e| e.created_at);
        entries.truncate(filter.effective_limit() as usize);
        Ok(entries)
    }
}

#[async_trait]
impl FaqRepository for MockDb {
    async fn create_faq(&self, faq: NewFaq) -> Result<Faq, sqlx::Error> {
        self.check()?;
        let now = OffsetDateTime::now_utc();
        let created = Faq {
            id: Uuid::new_v4(),
            app_id: faq.app_id,
            question: faq.question,
            answer: faq.answer,
            category: faq.category,
            views: 0,
            created_at: now,
            updated_at: now,
        };
        self.faqs.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn list_faqs(&self, app_id: Option<Uuid>) -> Result<Vec<Faq>, sqlx::Error> {
        self.check()?;
        let faqs: Vec<Faq> = self
            .faqs
            .lock()
            .unwrap()
            .iter()
            .filter(|f| app_id.map_or(true, |id| id == f.app_id))
            .cloned()
            .collect();
        Ok(newest_first(&faqs, |f| f.created_at))
    }

    async fn find_faq(&self, faq_id: Uuid) -> Result<Option<Faq>, sqlx::Error> {
        self.check()?;
        Ok(self
            .faqs
            .lock()
            .unwrap()
            .iter()
            .find(|f| f.id == faq_id)
            .cloned())
    }

    async fn update_faq(&self, faq_id: Uuid, faq: NewFaq) -> Result<Option<Faq>, sqlx::Error> {
        self.check()?;
        let mut faqs = self.faqs.lock().unwrap();
        Ok(faqs.iter_mut().find(|f| f.id == faq_id).map(|existing| {
            existing.app_id = faq.app_id;
            existing.question = faq.question;
            existing.answer = faq.answer;
            existing.category = faq.category;
            existing.updated_at = OffsetDateTime::now_utc();
            existing.clone()
        }))
    }

    async fn delete_faq(&self, faq_id: Uuid) -> Result<bool, sqlx::Error> {
        self.check()?;
        let mut faqs = self.faqs.lock().unwrap();
        let before = faqs.len();
        faqs.retain(|f| f.id != faq_id);
        Ok(faqs.len() < before)
    }

    async fn increment_faq_views(&self, faq_id: Uuid) -> Result<Option<Faq>, sqlx::Error> {
        self.check()?;
        let mut faqs = self.faqs.lock().unwrap();
        Ok(faqs.iter_mut().find(|f| f.id == faq_id).map(|faq| {
            faq.views += 1;
            faq.clone()
        }))
    }
}
