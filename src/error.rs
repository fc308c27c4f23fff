use thiserror::Error;

/// R2 Uploader core errors
#[derive(Debug, Error)]
pub enum UploaderError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Schema version problems (unknown or newer database)
    #[error("Schema error: {0}")]
    Schema(String),

    /// Configuration and settings errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Path resolution and clipboard ingestion errors
    #[error("Ingestion error: {0}")]
    Ingestion(String),

    /// Upload dispatch errors
    #[error("Upload error: {0}")]
    Upload(String),

    /// Validation errors (duplicate ids, dangling references, size limits)
    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Mutex poison error
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

pub type Result<T, E = UploaderError> = std::result::Result<T, E>;

/// Convert UploaderError to String for command boundaries
/// The UI layer only receives String errors
impl From<UploaderError> for String {
    fn from(err: UploaderError) -> String {
        err.to_string()
    }
}

impl From<tokio::task::JoinError> for UploaderError {
    fn from(err: tokio::task::JoinError) -> Self {
        UploaderError::Other(format!("Background task failed: {}", err))
    }
}

impl<T> From<std::sync::PoisonError<T>> for UploaderError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        UploaderError::LockPoisoned(err.to_string())
    }
}

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    fn context(self, msg: &str) -> Result<T>;
}

impl<T, E: Into<UploaderError>> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| {
            let err: UploaderError = e.into();
            match err {
                UploaderError::Other(s) => UploaderError::Other(format!("{}: {}", msg, s)),
                UploaderError::Schema(s) => UploaderError::Schema(format!("{}: {}", msg, s)),
                UploaderError::Config(s) => UploaderError::Config(format!("{}: {}", msg, s)),
                UploaderError::Ingestion(s) => {
                    UploaderError::Ingestion(format!("{}: {}", msg, s))
                }
                UploaderError::Upload(s) => UploaderError::Upload(format!("{}: {}", msg, s)),
                UploaderError::Validation(s) => {
                    UploaderError::Validation(format!("{}: {}", msg, s))
                }
                UploaderError::NotFound(s) => UploaderError::NotFound(format!("{}: {}", msg, s)),
                UploaderError::LockPoisoned(s) => {
                    UploaderError::LockPoisoned(format!("{}: {}", msg, s))
                }
                other @ (UploaderError::Database(_)
                | UploaderError::Io(_)
                | UploaderError::Json(_)) => other,
            }
        })
    }
}
