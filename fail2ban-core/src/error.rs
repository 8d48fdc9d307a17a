use thiserror::Error;

/// Top level error for every fallible engine operation.
///
/// Security decisions are never encoded here: a banned identity is a successful
/// [`Decision`](crate::Decision), while an `Error` means the engine could not decide.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Credential verifier error: {0}")]
    Verifier(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    NonPositive { field: &'static str },

    #[error("{field} has an invalid value: {value}")]
    Invalid { field: &'static str, value: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),
}

impl Error {
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

/// Extension trait for Result types to simplify database error mapping
///
/// Storage backends log the underlying driver error and surface a
/// [`StorageError::Database`] carrying only the operation context.
///
/// # Example
///
/// ```rust,ignore
/// use fail2ban_core::error::DatabaseResultExt;
///
/// query.execute(&pool).await.map_db_err("Failed to record attempt")?;
/// ```
pub trait DatabaseResultExt<T> {
    fn map_db_err(self, context: &str) -> Result<T, Error>;
}

impl<T, E: std::fmt::Display> DatabaseResultExt<T> for Result<T, E> {
    fn map_db_err(self, context: &str) -> Result<T, Error> {
        self.map_err(|e| {
            tracing::error!(error = %e, "{context}");
            Error::Storage(StorageError::Database(context.to_string()))
        })
    }
}
