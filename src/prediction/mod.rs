//! Client for the remote chest X-ray classifier.
//!
//! The classifier is an HTTP service taking a multipart image upload and
//! answering with three percentage scores plus a primary label, carried in
//! response headers (or a JSON body), with an annotated image as the body.

pub mod client;
pub mod types;

pub use client::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("Classifier URL is not configured")]
    NotConfigured,

    #[error("Classifier unreachable after {attempts} attempts: {last_error}")]
    Unreachable { attempts: u32, last_error: String },

    #[error("Classifier rejected the request (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid classifier response: {0}")]
    InvalidResponse(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}
