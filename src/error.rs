use thiserror::Error;

/// Main error type for Topomap
#[derive(Error, Debug)]
pub enum TopomapError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The store could not be opened
    #[error("Unable to connect to database: {0}")]
    Connection(String),

    /// A bracketed timestamp matched the log grammar but is not a valid date
    #[error("Invalid timestamp '{value}': {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// A numeric field matched the log grammar but does not fit its type
    #[error("Malformed {field} value '{value}'")]
    MalformedField { field: &'static str, value: String },

    /// The host that shipped the log line has no registry entry
    #[error("No registration found for callee host '{0}'")]
    CalleeUnregistered(String),

    /// The queue row disappeared while its unit of work was running
    #[error("Queue entry {0} no longer exists")]
    QueueEntryMissing(i64),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using TopomapError
pub type Result<T> = std::result::Result<T, TopomapError>;
