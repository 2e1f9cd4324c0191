//! User model for gator.

use chrono::{DateTime, Utc};

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// User name (unique, case-sensitive).
    pub name: String,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// User name.
    pub name: String,
}

impl NewUser {
    /// Create a new user request.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Check the name is usable: non-empty, no surrounding or inner whitespace.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("user name must not be empty".to_string());
        }
        if self.name.chars().any(char::is_whitespace) {
            return Err(format!("user name {:?} must not contain whitespace", self.name));
        }
        Ok(())
    }
}
