//! Role checks shared by the HTTP gates and the ticket services.

use serde::Serialize;
use uuid::Uuid;

use crate::models::{
    comment::Comment,
    ticket::Ticket,
    user::{User, UserRole},
};

/// The signed-in principal. The role is fixed when the session is issued and
/// is the only input to authorization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn is_tester(&self) -> bool {
        self.role.is_tester()
    }
}

impl From<&User> for Session {
    fn from(user: &User) -> Self {
        Session {
            user_id: user.id,
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardLevel {
    Authenticated,
    Tester,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// No session; the caller must sign in first.
    RedirectHome,
    /// Signed in but the role is insufficient.
    AccessDenied,
}

pub fn evaluate(level: GuardLevel, session: Option<&Session>) -> GuardDecision {
    let Some(session) = session else {
        return GuardDecision::RedirectHome;
    };
    let allowed = match level {
        GuardLevel::Authenticated => true,
        GuardLevel::Tester => session.is_tester(),
        GuardLevel::Admin => session.is_admin(),
    };
    if allowed {
        GuardDecision::Allow
    } else {
        GuardDecision::AccessDenied
    }
}

/// Creators see their own tickets; testers and admins see every ticket.
pub fn can_view_ticket(session: &Session, ticket: &Ticket) -> bool {
    session.is_tester() || ticket.user_id == session.user_id
}

/// Drops internal comments unless the viewer is a tester or admin.
pub fn visible_comments(session: &Session, comments: Vec<Comment>) -> Vec<Comment> {
    if session.is_tester() {
        return comments;
    }
    comments.into_iter().filter(|c| !c.is_internal).collect()
}
