use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::UserId;

/// A learner, mirrored from the identity provider on first contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Identity fields supplied by the caller when a user may not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub id: UserId,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl NewUser {
    /// The email to store when the identity provider did not supply one.
    #[must_use]
    pub fn email_or_default(&self) -> String {
        self.email
            .clone()
            .unwrap_or_else(|| format!("{}@practice.local", self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_email_gets_a_placeholder() {
        let new_user = NewUser {
            id: UserId::new("user_42"),
            email: None,
            name: None,
        };
        assert_eq!(new_user.email_or_default(), "user_42@practice.local");
    }
}
