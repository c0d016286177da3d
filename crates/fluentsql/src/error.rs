//! Error types for fluentsql

use thiserror::Error;

/// Result type alias for fluentsql operations
pub type SqlResult<T> = Result<T, SqlError>;

/// Error types for building and running statements
#[derive(Debug, Error)]
pub enum SqlError {
    /// Malformed or incomplete DSN, unknown config option
    #[error("Config error: {0}")]
    Config(String),

    /// Driver connect failure, switch to an unknown connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// Invalid builder call (wrong argument shape, join on an unsupported statement, ...)
    #[error("Builder error: {0}")]
    Builder(String),

    /// The driver rejected a query or statement
    #[error("Execution error: {0}")]
    Execution(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Config file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SqlError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a builder error
    pub fn builder(message: impl Into<String>) -> Self {
        Self::Builder(message.into())
    }

    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Message text without the kind prefix
    pub fn message(&self) -> String {
        match self {
            Self::Config(m) | Self::Connection(m) | Self::Builder(m) | Self::Execution(m) => {
                m.clone()
            }
            Self::Decode { column, message } => format!("{column}: {message}"),
            Self::Io(e) => e.to_string(),
        }
    }

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is a connection error
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Check if this is a builder error
    pub fn is_builder(&self) -> bool {
        matches!(self, Self::Builder(_))
    }

    /// Check if this is an execution error
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }
}

#[cfg(feature = "postgres")]
impl SqlError {
    /// Map a tokio_postgres error raised while running SQL.
    ///
    /// Server-side errors keep only the server message and SQLSTATE; transport
    /// errors keep the full display text.
    pub fn from_pg_error(err: tokio_postgres::Error) -> Self {
        match err.as_db_error() {
            Some(db_err) => Self::Execution(format!(
                "{} (SQLSTATE {})",
                db_err.message(),
                db_err.code().code()
            )),
            None => Self::Execution(err.to_string()),
        }
    }
}

#[cfg(feature = "mysql")]
impl From<sqlx::Error> for SqlError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => Self::Execution(db_err.message().to_string()),
            other => Self::Execution(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_carry_kind_prefix() {
        assert_eq!(
            SqlError::config("Password required in dsn").to_string(),
            "Config error: Password required in dsn"
        );
        assert_eq!(
            SqlError::decode("age", "invalid digit").to_string(),
            "Decode error on column 'age': invalid digit"
        );
    }

    #[test]
    fn predicates_match_variant() {
        assert!(SqlError::builder("x").is_builder());
        assert!(!SqlError::builder("x").is_connection());
        assert!(SqlError::connection("x").is_connection());
        assert!(SqlError::execution("x").is_execution());
        assert!(SqlError::config("x").is_config());
    }

    #[test]
    fn message_drops_prefix() {
        assert_eq!(SqlError::connection("refused").message(), "refused");
        assert_eq!(SqlError::decode("age", "bad").message(), "age: bad");
    }
}
