use crate::domain_model::format_userid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct UserId(pub uuid::Uuid);

impl UserId {
    pub fn new() -> Self {
        UserId(uuid::Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(UserId)
    }
}

/// A user row. Usernames are only unique within an authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub username: String,
    pub authority: String,
    pub email: Option<String>,
    pub is_activated: bool,
    pub sidebar_tutorial_dismissed: bool,
    pub registered_date: DateTime<Utc>,
}

impl User {
    /// A fresh, activated user with no email.
    pub fn new(username: impl Into<String>, authority: impl Into<String>) -> Self {
        User {
            user_id: UserId::new(),
            username: username.into(),
            authority: authority.into(),
            email: None,
            is_activated: true,
            sidebar_tutorial_dismissed: false,
            registered_date: Utc::now(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.is_activated = false;
        self
    }

    pub fn userid(&self) -> String {
        format_userid(&self.username, &self.authority)
    }

    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::new(&self.username, &self.authority)
    }
}

/// `(username, authority)`: the lookup and cache key for a user.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct IdentityKey {
    pub username: String,
    pub authority: String,
}

impl IdentityKey {
    pub fn new(username: impl Into<String>, authority: impl Into<String>) -> Self {
        IdentityKey {
            username: username.into(),
            authority: authority.into(),
        }
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_userid(&self.username, &self.authority))
    }
}
