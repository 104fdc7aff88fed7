//! Free-text report generation for a classifier prediction.
//!
//! prediction → prompt → chat completion → normalization → [`Report`]
//!
//! [`Report`]: crate::models::Report

pub mod client;
pub mod fallback;
pub mod generator;
pub mod parser;
pub mod prompt;

pub use client::*;
pub use fallback::*;
pub use generator::*;
pub use parser::*;
pub use prompt::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Report model API key is not configured")]
    MissingApiKey,

    #[error("Cannot connect to report model at {0}")]
    Connection(String),

    #[error("Report model request timed out after {0}s")]
    Timeout(u64),

    #[error("Report model returned error (status {status}): {body}")]
    ModelError { status: u16, body: String },

    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}
