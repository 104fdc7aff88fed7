//! API endpoint handlers, one module per resource.

pub mod auth;
pub mod health;
pub mod images;
pub mod patients;
pub mod predictions;
pub mod reports;
