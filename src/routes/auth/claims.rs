use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{access::Session, models::user::UserRole};

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Claims {
    pub id: String, // internal user UUID
    pub email: String,
    pub name: String,
    /// Resolved once at sign-in; every access check reads this.
    pub role: UserRole,
    pub exp: usize, // expiration (as UNIX timestamp)
    pub iss: String,
    pub aud: String,
}

impl Claims {
    pub fn for_session(session: &Session, ttl_seconds: i64) -> Self {
        Claims {
            id: session.user_id.to_string(),
            email: session.email.clone(),
            name: session.display_name.clone(),
            role: session.role,
            exp: (Utc::now() + chrono::Duration::seconds(ttl_seconds)).timestamp() as usize,
            iss: String::new(),
            aud: String::new(),
        }
    }

    pub fn session(&self) -> Option<Session> {
        let user_id = Uuid::parse_str(&self.id).ok()?;
        Some(Session {
            user_id,
            email: self.email.clone(),
            display_name: self.name.clone(),
            role: self.role,
        })
    }
}
