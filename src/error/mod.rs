use std::fmt;

#[cfg(test)]
pub(crate) mod testing;

/// Main error type for deferred touching
#[derive(Debug, Clone, PartialEq)]
pub enum TouchError {
    // ============ Store Errors (XX000) ============
    /// The underlying store rejected an update statement
    StoreError {
        statement: String,
        error: String,
    },

    // ============ Record State Errors (55xxx) ============
    /// Immediate touch of a new or deleted record
    RecordNotPersisted {
        table: String,
        pk: i64,
    },

    /// Record is already mutably borrowed (e.g. touching itself from its own callback)
    RecordInUse {
        table: String,
        pk: i64,
    },

    // ============ Naming Errors (42xxx) ============
    /// Table or column name cannot be used in a statement
    InvalidIdentifier {
        name: String,
        reason: String,
    },

    // ============ Flush Errors (54xxx) ============
    /// Flush kept finding new touches after the configured number of passes
    FlushPassLimitExceeded {
        max_passes: usize,
        pending: usize,
    },

    /// A post-touch callback reported failure
    CallbackFailed {
        table: String,
        pk: i64,
        reason: String,
    },

    // ============ Configuration and Serialization ============
    /// Configuration error (invalid setting value)
    ConfigError {
        setting: String,
        value: String,
        reason: String,
    },

    /// Serialization/deserialization failed
    SerializationError {
        message: String,
    },

    /// Internal error (bug in the crate)
    InternalError {
        message: String,
        file: &'static str,
        line: u32,
    },
}

impl TouchError {
    /// Get the SQLSTATE-style code for this error
    pub fn sqlstate(&self) -> &'static str {
        use TouchError::*;
        match self {
            StoreError { .. } => "58000", // System error (store)

            RecordNotPersisted { .. } => "55000", // Object not in prerequisite state
            RecordInUse { .. } => "55006",        // Object in use

            InvalidIdentifier { .. } => "42602", // Invalid name

            FlushPassLimitExceeded { .. } => "54001", // Statement too complex
            CallbackFailed { .. } => "P0001",         // Raise exception

            ConfigError { .. } => "22023", // Invalid parameter value
            SerializationError { .. } => "22P02",
            InternalError { .. } => "XX000",
        }
    }

    /// Create internal error with file/line info
    pub fn internal(message: String, file: &'static str, line: u32) -> Self {
        TouchError::InternalError { message, file, line }
    }

    /// Wrap a store failure for the given statement text
    pub fn store(statement: impl Into<String>, error: impl fmt::Display) -> Self {
        TouchError::StoreError {
            statement: statement.into(),
            error: error.to_string(),
        }
    }
}

impl fmt::Display for TouchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TouchError::*;
        match self {
            StoreError { statement, error } => {
                write!(f, "Store update failed: {}\nStatement: {}", error,
                       truncate_chars(statement, 100))
            }
            RecordNotPersisted { table, pk } => {
                write!(f, "Cannot touch {} row {}: record is new or deleted", table, pk)
            }
            RecordInUse { table, pk } => {
                write!(f, "Record {} row {} is already borrowed", table, pk)
            }
            InvalidIdentifier { name, reason } => {
                write!(f, "Invalid identifier '{}': {}", name, reason)
            }
            FlushPassLimitExceeded { max_passes, pending } => {
                write!(
                    f,
                    "Flush exceeded maximum of {} passes ({} touches still pending). \
                     Possible touch callback loop.",
                    max_passes, pending
                )
            }
            CallbackFailed { table, pk, reason } => {
                write!(f, "Touch callback failed for {} row {}: {}", table, pk, reason)
            }
            ConfigError { setting, value, reason } => {
                write!(f, "Configuration error for '{}': {} (value: {})", setting, reason, value)
            }
            SerializationError { message } => {
                write!(f, "Serialization error: {}", message)
            }
            InternalError { message, file, line } => {
                write!(f, "Internal error at {}:{}: {}\nPlease report this bug.",
                       file, line, message)
            }
        }
    }
}

impl std::error::Error for TouchError {}

/// First `max` characters of `text`, cut on a char boundary
fn truncate_chars(text: &str, max: usize) -> &str {
    text.char_indices().nth(max).map_or(text, |(i, _)| &text[..i])
}

/// Result type for touch operations
pub type TouchResult<T> = Result<T, TouchError>;

/// Convert serde_json::Error to TouchError
impl From<serde_json::Error> for TouchError {
    fn from(e: serde_json::Error) -> Self {
        TouchError::SerializationError {
            message: format!("JSON serialization error: {}", e),
        }
    }
}

/// Convert std::io::Error to TouchError
impl From<std::io::Error> for TouchError {
    fn from(e: std::io::Error) -> Self {
        TouchError::SerializationError {
            message: format!("I/O error: {}", e),
        }
    }
}

/// Helper macro for creating internal errors with automatic file/line
#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::TouchError::internal($msg.to_string(), file!(), line!())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::TouchError::internal(format!($fmt, $($arg)*), file!(), line!())
    };
}
