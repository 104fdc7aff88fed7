pub mod enums;
pub mod patient;
pub mod prediction;
pub mod user;

pub use enums::*;
pub use patient::*;
pub use prediction::*;
pub use user::*;

use thiserror::Error;

/// Field-level validation failures, surfaced to HTTP callers as 400.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid value for {field}: '{value}'")]
    InvalidEnum { field: &'static str, value: String },

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// A JSON value that may arrive as a number or a numeric string.
///
/// Web forms post `"age": "42"` while other clients send `42`; the classifier
/// does the same with its scores. Both are accepted at the edge.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    /// Finite numeric value, or `None` when the text form does not parse.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
        };
        value.filter(|n| n.is_finite())
    }
}
