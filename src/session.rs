//! Persisted session state.
//!
//! A single JSON record holding the store address and the name of the
//! current user. It is read at startup and rewritten whenever the current
//! user changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Result;

/// Database URL used when no session file exists yet.
pub const DEFAULT_DB_URL: &str = "sqlite://gator.db";

/// On-disk session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Store connection address.
    pub db_url: String,
    /// Name of the current user, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_user_name: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DB_URL.to_string(),
            current_user_name: None,
        }
    }
}

/// Session state bound to the file it was loaded from.
#[derive(Debug, Clone)]
pub struct Session {
    path: PathBuf,
    state: SessionState,
}

impl Session {
    /// Load the session from `path`. A missing file yields the default state;
    /// nothing is written until the current user changes.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            debug!("No session file at {:?}, using defaults", path);
            SessionState::default()
        };
        Ok(Self { path, state })
    }

    /// Create a session with explicit state (not yet written).
    pub fn new(path: impl Into<PathBuf>, state: SessionState) -> Self {
        Self {
            path: path.into(),
            state,
        }
    }

    /// Store connection address.
    pub fn db_url(&self) -> &str {
        &self.state.db_url
    }

    /// Name of the current user.
    pub fn current_user_name(&self) -> Option<&str> {
        self.state
            .current_user_name
            .as_deref()
            .filter(|name| !name.is_empty())
    }

    /// Set the current user and persist the session.
    pub fn set_user(&mut self, name: impl Into<String>) -> Result<()> {
        self.state.current_user_name = Some(name.into());
        self.save()
    }

    /// Write the session to its file.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&self.state)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}
