// Error taxonomy for the import pipeline and the query engine

use thiserror::Error;

/// Fatal import errors. Any of these aborts the whole run; the offending
/// source file and row are carried so operators can fix the data and
/// re-run. The pipeline performs no rollback, the surrounding store
/// lifecycle (drop and recreate before import) guarantees a clean slate.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Malformed CSV cell or row
    #[error("{file}, row {row}: {message}")]
    Parse {
        file: String,
        row: usize,
        message: String,
    },

    /// A referenced entity was not found although the fixed import order
    /// guarantees it should already exist
    #[error("{file}, row {row}: {message}")]
    Reference {
        file: String,
        row: usize,
        message: String,
    },

    /// A required field is missing or an invariant is violated
    #[error("{file}, row {row}: {message}")]
    Validation {
        file: String,
        row: usize,
        message: String,
    },

    /// The backing store rejected a record commit
    #[error("{file}, row {row}: {message}")]
    Store {
        file: String,
        row: usize,
        message: String,
    },

    /// A source file could not be read
    #[error("{file}: {message}")]
    Source { file: String, message: String },

    /// Cooperative cancellation was observed between records
    #[error("import cancelled")]
    Cancelled,
}

impl ImportError {
    pub fn parse(file: &str, row: usize, message: impl Into<String>) -> Self {
        ImportError::Parse {
            file: file.to_string(),
            row,
            message: message.into(),
        }
    }

    pub fn reference(file: &str, row: usize, message: impl Into<String>) -> Self {
        ImportError::Reference {
            file: file.to_string(),
            row,
            message: message.into(),
        }
    }

    pub fn validation(file: &str, row: usize, message: impl Into<String>) -> Self {
        ImportError::Validation {
            file: file.to_string(),
            row,
            message: message.into(),
        }
    }

    pub fn store(file: &str, row: usize, message: impl Into<String>) -> Self {
        ImportError::Store {
            file: file.to_string(),
            row,
            message: message.into(),
        }
    }
}

/// Per-request query errors. These never affect other requests or stored
/// data; unknown filter codes are not errors but empty results.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    /// The requested date span exceeds the fixed query horizon
    #[error("the maximum date range is {max_days} days")]
    DateRangeTooLarge { max_days: i64 },
}
