use serde::Serialize;
use uuid::Uuid;

use crate::models::{
    app::App,
    ticket::{Ticket, TicketCategory, TicketPriority, TicketStatus, TicketType},
};

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TicketTotals {
    pub total: usize,
    pub customer: usize,
    pub internal: usize,
    pub open: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub resolved: usize,
    pub bugs: usize,
    /// Bugs with blocker or high priority.
    pub critical_bugs: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AppStats {
    pub app_id: Uuid,
    pub app_name: String,
    pub total_tickets: usize,
    pub open_tickets: usize,
    pub resolved_tickets: usize,
    pub customer_tickets: usize,
    pub bug_count: usize,
    /// Mean hours from creation to resolution over resolved tickets; 0 when none.
    pub avg_resolution_hours: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnalyticsSummary {
    pub totals: TicketTotals,
    pub apps: Vec<AppStats>,
}

fn totals(tickets: &[Ticket]) -> TicketTotals {
    let mut totals = TicketTotals {
        total: tickets.len(),
        ..Default::default()
    };
    for ticket in tickets {
        match ticket.ticket_type {
            TicketType::Customer => totals.customer += 1,
            TicketType::Internal => totals.internal += 1,
        }
        match ticket.status {
            TicketStatus::Open => totals.open += 1,
            TicketStatus::Pending => totals.pending += 1,
            TicketStatus::InProgress => totals.in_progress += 1,
            TicketStatus::Resolved => totals.resolved += 1,
        }
        if ticket.category == TicketCategory::Bug {
            totals.bugs += 1;
            if matches!(
                ticket.priority,
                Some(TicketPriority::Blocker | TicketPriority::High)
            ) {
                totals.critical_bugs += 1;
            }
        }
    }
    totals
}

fn resolution_hours(ticket: &Ticket) -> Option<f64> {
    if ticket.status != TicketStatus::Resolved {
        return None;
    }
    let resolved_at = ticket.resolved_at?;
    Some((resolved_at - ticket.created_at).as_seconds_f64() / 3600.0)
}

fn app_stats(app: &App, tickets: &[Ticket]) -> AppStats {
    let app_tickets: Vec<&Ticket> = tickets.iter().filter(|t| t.app_id == app.id).collect();
    let hours: Vec<f64> = app_tickets.iter().filter_map(|t| resolution_hours(t)).collect();
    let avg_resolution_hours = if hours.is_empty() {
        0.0
    } else {
        hours.iter().sum::<f64>() / hours.len() as f64
    };

    AppStats {
        app_id: app.id,
        app_name: app.name.clone(),
        total_tickets: app_tickets.len(),
        open_tickets: app_tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Open)
            .count(),
        resolved_tickets: app_tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Resolved)
            .count(),
        customer_tickets: app_tickets
            .iter()
            .filter(|t| t.ticket_type == TicketType::Customer)
            .count(),
        bug_count: app_tickets
            .iter()
            .filter(|t| t.category == TicketCategory::Bug)
            .count(),
        avg_resolution_hours,
    }
}

/// Overall counts plus per-app stats, busiest app first. Tickets whose app
/// was deleted count toward the totals only.
pub fn summarize(apps: &[App], tickets: &[Ticket]) -> AnalyticsSummary {
    let mut per_app: Vec<AppStats> = apps.iter().map(|app| app_stats(app, tickets)).collect();
    per_app.sort_by(|a, b| b.total_tickets.cmp(&a.total_tickets));
    AnalyticsSummary {
        totals: totals(tickets),
        apps: per_app,
    }
}
