//! Error types for myorm

use thiserror::Error;

/// Result type alias for myorm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for database operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Missing or invalid settings at construction time
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Dial, authentication or schema selection failed, or the pool could not be rebuilt
    #[error("Connection error: {0}")]
    Connection(String),

    /// Pool error
    #[error("Pool error: {0}")]
    Pool(String),

    /// Programmer error: the builder was used in a way that can never succeed.
    ///
    /// Returned before any SQL is sent to the server.
    #[error("Usage error: {0}")]
    Usage(String),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A raw column value could not be coerced into the declared field type
    #[error("Conversion error on field '{field}' (raw value {raw:?}): {message}")]
    Conversion {
        field: String,
        raw: String,
        message: String,
    },

    /// A declared field has no matching column in the result row
    #[error("Mapping error: field '{field}' has no column '{column}' in the row")]
    Mapping { field: String, column: String },

    /// Unique constraint violation (MySQL error 1062)
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation (MySQL errors 1451/1452)
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] mysql_async::Error),

    /// A query hook refused to let the statement run
    #[error("Query aborted by hook: {0}")]
    Aborted(String),

    /// Statement exceeded the configured query timeout
    #[error("Query timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl OrmError {
    /// Create a usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a conversion error for a raw value
    pub fn conversion(
        field: impl Into<String>,
        raw: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Conversion {
            field: field.into(),
            raw: raw.into(),
            message: message.into(),
        }
    }

    /// Create a mapping error for a field whose column is absent
    pub fn mapping(field: impl Into<String>, column: impl Into<String>) -> Self {
        Self::Mapping {
            field: field.into(),
            column: column.into(),
        }
    }

    /// Re-label a conversion error with the field it was raised for.
    ///
    /// The type coercer does not know which record field it is working on, so
    /// it reports the target kind; the field mapper replaces it here.
    pub(crate) fn for_field(self, name: &str) -> Self {
        match self {
            Self::Conversion { raw, message, .. } => Self::Conversion {
                field: name.to_string(),
                raw,
                message,
            },
            other => other,
        }
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a usage (programmer) error
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }

    /// Check if this is a connection or pool error
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Pool(_))
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Parse a mysql_async error into a more specific OrmError
    pub fn from_db_error(err: mysql_async::Error) -> Self {
        match &err {
            mysql_async::Error::Server(server) => match server.code {
                1062 => Self::UniqueViolation(server.message.clone()),
                1451 | 1452 => Self::ForeignKeyViolation(server.message.clone()),
                _ => Self::Query(err),
            },
            mysql_async::Error::Io(_) => Self::Connection(err.to_string()),
            _ => Self::Query(err),
        }
    }
}

impl<E: std::fmt::Display> From<deadpool::managed::PoolError<E>> for OrmError {
    fn from(err: deadpool::managed::PoolError<E>) -> Self {
        Self::Pool(err.to_string())
    }
}
