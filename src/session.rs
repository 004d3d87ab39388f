//! Session provider: who is signed in.
//!
//! Authentication itself happens elsewhere. The pipeline only asks for the
//! current user (to key stored records) and can sign out.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl User {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            avatar_url: None,
        }
    }
}

pub trait SessionProvider: Send + Sync {
    fn current_user(&self) -> Option<User>;
    fn sign_out(&self);
}

/// In-memory session, signed in from construction until `sign_out`.
#[derive(Debug, Default)]
pub struct StaticSession {
    user: Mutex<Option<User>>,
}

impl StaticSession {
    pub fn signed_in(user: User) -> Self {
        Self {
            user: Mutex::new(Some(user)),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }
}

impl SessionProvider for StaticSession {
    fn current_user(&self) -> Option<User> {
        self.user
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn sign_out(&self) {
        let previous = self
            .user
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(user) = previous {
            info!(email = %user.email, "signed out");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_out_clears_user() {
        let session = StaticSession::signed_in(User::new("ada@example.com", "Ada Lovelace"));
        assert_eq!(session.current_user().unwrap().name, "Ada Lovelace");
        session.sign_out();
        assert!(session.current_user().is_none());
        // Idempotent
        session.sign_out();
        assert!(StaticSession::signed_out().current_user().is_none());
    }

    #[test]
    fn user_json_omits_missing_avatar() {
        let json = serde_json::to_string(&User::new("a@b.c", "A")).unwrap();
        assert_eq!(json, r#"{"email":"a@b.c","name":"A"}"#);
    }
}
