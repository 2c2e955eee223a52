use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatArbError {
    #[error("Invalid parameter: {field} — {reason}")]
    InvalidParameter { field: String, reason: String },

    #[error("Insufficient data for {context}: at least {required} observations required, got {actual}")]
    InsufficientData {
        context: String,
        required: usize,
        actual: usize,
    },

    #[error("Degenerate input in {context}")]
    DegenerateInput { context: String },

    #[error("Numerical failure: {0}")]
    NumericalFailure(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StatArbError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        StatArbError::InvalidParameter {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn insufficient(context: &str, required: usize, actual: usize) -> Self {
        StatArbError::InsufficientData {
            context: context.to_string(),
            required,
            actual,
        }
    }

    pub(crate) fn degenerate(context: impl Into<String>) -> Self {
        StatArbError::DegenerateInput {
            context: context.into(),
        }
    }
}

impl From<serde_json::Error> for StatArbError {
    fn from(e: serde_json::Error) -> Self {
        StatArbError::Serialization(e.to_string())
    }
}
