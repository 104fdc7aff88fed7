//! HTTP API for the web client.
//!
//! Exposes patient records, clinician accounts, image storage, X-ray
//! classification and report generation as JSON endpoints under `/api/`.
//! `api_router()` returns a `Router` that can be mounted on any axum server.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::{serve, ServerError};
pub use types::ApiContext;
