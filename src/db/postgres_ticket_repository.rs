use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    db::ticket_repository::{StatusUpdate, StatusUpdateOutcome, TicketRepository},
    models::{
        audit_log::{AuditLog, AuditLogFilter, NewAuditLog},
        comment::{Comment, NewComment},
        ticket::{InternalFieldChanges, NewTicket, Ticket, TicketFilter},
    },
};

const TICKET_SELECT: &str = r#"
    SELECT id, ticket_type, app_id, user_id, user_email, user_name, title, description,
           category, priority, status, follow_up, media_urls, os, browser, app_version,
           environment, log_file_url, fixed_in_build, created_at, updated_at, resolved_at
    FROM tickets
"#;

const COMMENT_COLUMNS: &str =
    "id, ticket_id, user_id, user_email, user_name, text, is_internal, created_at";

const AUDIT_COLUMNS: &str =
    "id, ticket_id, user_id, user_email, action, old_value, new_value, operation_id, created_at";

pub struct PostgresTicketRepository {
    pub pool: PgPool,
}

async fn insert_audit_log(
    tx: &mut Transaction<'_, Postgres>,
    ticket_id: Uuid,
    audit: NewAuditLog,
    now: OffsetDateTime,
) -> Result<(), sqlx::Error> {
    let entry = audit.into_entry(Uuid::new_v4(), ticket_id, now);
    sqlx::query(
        r#"
        INSERT INTO audit_logs
            (id, ticket_id, user_id, user_email, action, old_value, new_value, operation_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(entry.id)
    .bind(entry.ticket_id)
    .bind(entry.user_id)
    .bind(&entry.user_email)
    .bind(&entry.action)
    .bind(&entry.old_value)
    .bind(&entry.new_value)
    .bind(entry.operation_id)
    .bind(entry.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn lock_ticket(
    tx: &mut Transaction<'_, Postgres>,
    ticket_id: Uuid,
) -> Result<Option<Ticket>, sqlx::Error> {
    let sql = format!("{TICKET_SELECT} WHERE id = $1 FOR UPDATE");
    sqlx::query_as::<_, Ticket>(&sql)
        .bind(ticket_id)
        .fetch_optional(&mut **tx)
        .await
}

#[async_trait]
impl TicketRepository for PostgresTicketRepository {
    async fn create_ticket(
        &self,
        ticket: NewTicket,
        audit: NewAuditLog,
    ) -> Result<Ticket, sqlx::Error> {
        let now = OffsetDateTime::now_utc();
        let ticket = ticket.into_ticket(Uuid::new_v4(), now);

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO tickets (
                id, ticket_type, app_id, user_id, user_email, user_name, title, description,
                category, priority, status, follow_up, media_urls, os, browser, app_version,
                environment, log_file_url, fixed_in_build, created_at, updated_at, resolved_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20, $21, $22)
            "#,
        )
        .bind(ticket.id)
        .bind(ticket.ticket_type)
        .bind(ticket.app_id)
        .bind(ticket.user_id)
        .bind(&ticket.user_email)
        .bind(&ticket.user_name)
        .bind(&ticket.title)
        .bind(&ticket.description)
        .bind(ticket.category)
        .bind(ticket.priority)
        .bind(ticket.status)
        .bind(ticket.follow_up)
        .bind(&ticket.media_urls)
        .bind(&ticket.os)
        .bind(&ticket.browser)
        .bind(&ticket.app_version)
        .bind(ticket.environment)
        .bind(&ticket.log_file_url)
        .bind(&ticket.fixed_in_build)
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .bind(ticket.resolved_at)
        .execute(&mut *tx)
        .await?;

        insert_audit_log(&mut tx, ticket.id, audit, now).await?;
        tx.commit().await?;

        Ok(ticket)
    }

    async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new(TICKET_SELECT);
        builder.push(" WHERE TRUE");

        if let Some(app_id) = filter.app_id {
            builder.push(" AND app_id = ").push_bind(app_id);
        }
        if let Some(user_id) = filter.user_id {
            builder.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(ticket_type) = filter.ticket_type {
            builder.push(" AND ticket_type = ").push_bind(ticket_type);
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(term) = filter.search_term() {
            let pattern = format!("%{}%", term);
            builder
                .push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR user_email ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR id::text ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        builder.push(" ORDER BY created_at DESC");

        builder
            .build_query_as::<Ticket>()
            .fetch_all(&self.pool)
            .await
    }

    async fn find_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, sqlx::Error> {
        let sql = format!("{TICKET_SELECT} WHERE id = $1");
        sqlx::query_as::<_, Ticket>(&sql)
            .bind(ticket_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn update_ticket_status(
        &self,
        update: StatusUpdate,
    ) -> Result<StatusUpdateOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let Some(mut ticket) = lock_ticket(&mut tx, update.ticket_id).await? else {
            return Ok(StatusUpdateOutcome::NotFound);
        };

        if let Some(operation_id) = update.audit.operation_id {
            let applied: Option<Uuid> = sqlx::query_scalar(
                "SELECT id FROM audit_logs WHERE ticket_id = $1 AND operation_id = $2 LIMIT 1",
            )
            .bind(update.ticket_id)
            .bind(operation_id)
            .fetch_optional(&mut *tx)
            .await?;

            if applied.is_some() {
                tx.commit().await?;
                return Ok(StatusUpdateOutcome::AlreadyApplied(ticket));
            }
        }

        let now = OffsetDateTime::now_utc();
        let previous = ticket.apply_status(update.status, now);

        sqlx::query(
            "UPDATE tickets SET status = $2, updated_at = $3, resolved_at = $4 WHERE id = $1",
        )
        .bind(ticket.id)
        .bind(ticket.status)
        .bind(ticket.updated_at)
        .bind(ticket.resolved_at)
        .execute(&mut *tx)
        .await?;

        let audit = update.audit.with_values(
            Some(previous.to_string()),
            Some(update.status.to_string()),
        );
        insert_audit_log(&mut tx, ticket.id, audit, now).await?;
        tx.commit().await?;

        Ok(StatusUpdateOutcome::Updated { ticket, previous })
    }

    async fn update_internal_fields(
        &self,
        ticket_id: Uuid,
        changes: &InternalFieldChanges,
        audit: NewAuditLog,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let Some(mut ticket) = lock_ticket(&mut tx, ticket_id).await? else {
            return Ok(None);
        };

        let now = OffsetDateTime::now_utc();
        ticket.apply_internal_changes(changes, now);

        sqlx::query(
            r#"
            UPDATE tickets
            SET priority = $2, environment = $3, os = $4, browser = $5, app_version = $6,
                fixed_in_build = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(ticket.id)
        .bind(ticket.priority)
        .bind(ticket.environment)
        .bind(&ticket.os)
        .bind(&ticket.browser)
        .bind(&ticket.app_version)
        .bind(&ticket.fixed_in_build)
        .bind(ticket.updated_at)
        .execute(&mut *tx)
        .await?;

        insert_audit_log(&mut tx, ticket.id, audit, now).await?;
        tx.commit().await?;

        Ok(Some(ticket))
    }

    async fn delete_ticket(&self, ticket_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(ticket_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO comments (id, ticket_id, user_id, user_email, user_name, text, is_internal, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {COMMENT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Comment>(&sql)
            .bind(Uuid::new_v4())
            .bind(comment.ticket_id)
            .bind(comment.user_id)
            .bind(&comment.user_email)
            .bind(&comment.user_name)
            .bind(&comment.text)
            .bind(comment.is_internal)
            .bind(OffsetDateTime::now_utc())
            .fetch_one(&self.pool)
            .await
    }

    async fn list_comments(
        &self,
        ticket_id: Uuid,
        include_internal: bool,
    ) -> Result<Vec<Comment>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM comments
            WHERE ticket_id = $1 AND ($2 OR is_internal = false)
            ORDER BY created_at DESC
            "#
        );
        sqlx::query_as::<_, Comment>(&sql)
            .bind(ticket_id)
            .bind(include_internal)
            .fetch_all(&self.pool)
            .await
    }

    async fn list_audit_logs(&self, filter: &AuditLogFilter) -> Result<Vec<AuditLog>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {AUDIT_COLUMNS}
            FROM audit_logs
            WHERE ($1::uuid IS NULL OR ticket_id = $1)
            ORDER BY created_at DESC
            LIMIT $2
            "#
        );
        sqlx::query_as::<_, AuditLog>(&sql)
            .bind(filter.ticket_id)
            .bind(filter.effective_limit())
            .fetch_all(&self.pool)
            .await
    }
}
