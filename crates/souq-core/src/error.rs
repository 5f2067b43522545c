//! Error types for souq-core.

use thiserror::Error;

/// Result type for souq-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in souq-core.
///
/// Cell-level coercion failures are absent: they degrade to
/// missing values and are reported through the quality report instead.
#[derive(Debug, Error)]
pub enum Error {
    /// A raw table is missing columns its schema requires.
    #[error("schema mismatch for {table}: missing required column(s) {}", missing.join(", "))]
    Schema { table: String, missing: Vec<String> },

    /// A table was handed to the wrong cleaning routine.
    #[error("expected a {expected} table, got {found}")]
    WrongTable { expected: String, found: String },

    /// A simulation, forecast or generation parameter is out of range.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter { name: String, message: String },

    /// Configuration could not be used as given.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for [`Error::InvalidParameter`].
    pub fn invalid_parameter(name: &str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// One-line recovery hint for terminal output, if there is a useful one.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Error::Schema { .. } => Some(
                "column names are matched case-insensitively and common aliases \
                 (e.g. cost/unit_cost/unit_cost_aed) are accepted",
            ),
            Error::WrongTable { .. } => {
                Some("name input files after their table: products, stores, sales, inventory, campaigns")
            }
            Error::InvalidParameter { .. } => {
                Some("run the command with --help to see the accepted ranges")
            }
            Error::InvalidConfig(_) => Some("check the JSON file passed with --config"),
            Error::Serialization(_) => None,
        }
    }

    /// Render the error followed by its hint, if any.
    pub fn with_hint(&self) -> String {
        match self.hint() {
            Some(hint) => format!("{self}\n  hint: {hint}"),
            None => self.to_string(),
        }
    }
}
