use thiserror::Error;

/// Errors raised by DROMA operations.
///
/// Variants carrying `details` render as `"<message>: <details>"` when the
/// details are present.
#[derive(Debug, Error)]
pub enum DromaError {
    #[error("{message}{}", suffix(.details))]
    Connection {
        message: String,
        details: Option<String>,
    },

    #[error("Table '{table}' not found{}", suffix(.details))]
    TableNotFound {
        table: String,
        details: Option<String>,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("{message}{}", suffix(.details))]
    Query {
        message: String,
        details: Option<String>,
    },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

fn suffix(details: &Option<String>) -> String {
    match details {
        Some(d) if !d.is_empty() => format!(": {}", d),
        _ => String::new(),
    }
}

impl DromaError {
    pub fn connection(message: impl Into<String>, details: impl Into<String>) -> Self {
        DromaError::Connection {
            message: message.into(),
            details: Some(details.into()),
        }
    }

    pub fn table_not_found(table: impl Into<String>) -> Self {
        DromaError::TableNotFound {
            table: table.into(),
            details: None,
        }
    }

    pub fn query(message: impl Into<String>, details: impl Into<String>) -> Self {
        DromaError::Query {
            message: message.into(),
            details: Some(details.into()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DromaError>;
