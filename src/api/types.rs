//! Shared types for the API layer.

use std::sync::Arc;

use crate::db::{PatientStore, UserStore};
use crate::object_store::{ObjectStore, UrlSigner};
use crate::prediction::ClassifierClient;
use crate::report::ReportGenerator;

/// Largest accepted image upload (10 MB).
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Request body cap: one image plus multipart framing and form fields.
pub const MAX_BODY_BYTES: usize = MAX_IMAGE_BYTES + 512 * 1024;

/// Shared context for all API routes. Every adapter is constructed once at
/// startup and injected here; tests swap in in-memory or mock handles.
#[derive(Clone)]
pub struct ApiContext {
    pub patients: Arc<dyn PatientStore>,
    pub users: Arc<dyn UserStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub signer: Arc<UrlSigner>,
    pub classifier: Arc<dyn ClassifierClient>,
    pub reports: Arc<ReportGenerator>,
}
