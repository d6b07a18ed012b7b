//! Event store errors

use thiserror::Error;

/// Errors that can occur when reading or writing change events
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite open/prepare/execute error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A connection or cache lock was poisoned by a panicking holder
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    /// A stored row could not be mapped back into a change event
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
