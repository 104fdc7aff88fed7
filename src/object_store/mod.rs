//! Blob storage for patient images.
//!
//! Objects are addressed by validated keys and handed out to browsers as
//! time-limited signed URLs (`/objects/<key>?expires=..&signature=..`).

pub mod key;
pub mod local;
pub mod signing;

pub use key::ObjectKey;
pub use local::FsObjectStore;
pub use signing::{SignedUrl, UrlSigner};

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Lifetime of URLs returned from an upload.
pub const UPLOAD_URL_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
/// Lifetime of URLs re-derived for a download.
pub const DOWNLOAD_URL_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Error, Debug)]
pub enum ObjectStoreError {
    #[error("Invalid object key '{key}': {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("URL does not reference a stored object: {0}")]
    NotAnObjectUrl(String),

    #[error("Signature invalid or expired")]
    BadSignature,

    #[error("Signing key rejected: {0}")]
    SigningKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bytes and MIME type of a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(
        &self,
        key: &ObjectKey,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), ObjectStoreError>;

    async fn get_object(&self, key: &ObjectKey) -> Result<StoredObject, ObjectStoreError>;
}
