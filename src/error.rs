//! Error types for gator.

use thiserror::Error;

/// Common error type for gator.
#[derive(Error, Debug)]
pub enum GatorError {
    /// Database error.
    ///
    /// Any store failure that is neither a constraint conflict nor a
    /// connectivity problem.
    #[error("database error: {0}")]
    Database(String),

    /// The store cannot be reached. No command or fetch can make progress.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// Uniqueness constraint violated (duplicate follow, duplicate post URL, ...).
    #[error("conflict: {0}")]
    Conflict(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Session file could not be (de)serialized.
    #[error("session error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// No command registered under the given name.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// The session carries no current user name.
    #[error("no current user; run `register <name>` or `login <name>` first")]
    NoCurrentUser,

    /// The session's current user name does not exist in the store.
    #[error("user {0:?} not found")]
    UserNotFound(String),

    /// There are no feeds to select from.
    #[error("no feeds to fetch")]
    NoFeeds,

    /// Network or parse failure while fetching a feed.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl GatorError {
    /// Whether this error means the store is gone for good.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GatorError::DatabaseConnection(_))
    }
}

// Conversion from sqlx errors
impl From<sqlx::Error> for GatorError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                GatorError::Conflict(db_err.message().to_string())
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => GatorError::DatabaseConnection(e.to_string()),
            _ => GatorError::Database(e.to_string()),
        }
    }
}

/// Result type alias for gator operations.
pub type Result<T> = std::result::Result<T, GatorError>;
