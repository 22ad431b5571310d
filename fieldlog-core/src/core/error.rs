//! Error types for the Fieldlog core library.

use thiserror::Error;

/// All errors that can occur within the Fieldlog core library.
#[derive(Debug, Error)]
pub enum FieldlogError {
    /// A SQLite operation failed outside a durable write.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The durable medium could not be opened, or the file is not a Fieldlog store.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A durable write failed mid-operation. The transaction was rolled back,
    /// so the on-disk state is whatever it was before the call.
    #[error("Write failed: {0}")]
    WriteFailed(#[source] rusqlite::Error),

    /// A report ID was requested that does not exist in the store.
    #[error("Report not found: {0}")]
    ReportNotFound(i64),

    /// A report ID collided with an existing row. Ids are assigned from a
    /// persisted monotonic counter, so this indicates a corrupted counter.
    #[error("Duplicate report id: {0}")]
    DuplicateId(i64),

    /// An attachment reached `put` without passing the codec's checks.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// An I/O operation on the filesystem failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias that pins the error type to [`FieldlogError`].
pub type Result<T> = std::result::Result<T, FieldlogError>;

impl FieldlogError {
    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Database(e) => format!("Failed to read store: {e}"),
            Self::StoreUnavailable(_) => "Could not open report store".to_string(),
            Self::WriteFailed(_) => "Failed to save; your reports are unchanged".to_string(),
            Self::ReportNotFound(_) => "Report no longer exists".to_string(),
            Self::DuplicateId(_) => "Report store is inconsistent; please reopen it".to_string(),
            Self::ValidationFailed(msg) => msg.clone(),
            Self::Io(e) => format!("File error: {e}"),
        }
    }
}
