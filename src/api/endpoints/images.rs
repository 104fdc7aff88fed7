//! Patient image endpoints.
//!
//! - `POST /api/upload-patient-image`: store an image, return a 7-day URL
//! - `GET /api/download-patient-image?url=`: fetch an image as an attachment
//! - `GET /objects/*key`: signed, inline object fetch

use std::collections::HashMap;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, MAX_IMAGE_BYTES};
use crate::object_store::signing::key_from_url;
use crate::object_store::{ObjectKey, SignedUrl, DOWNLOAD_URL_TTL, UPLOAD_URL_TTL};
use crate::prediction::ImageUpload;

/// Multipart body with at most one `image` file and any number of text fields.
#[derive(Debug, Default)]
pub struct ImageForm {
    pub image: Option<ImageUpload>,
    pub fields: HashMap<String, String>,
}

impl ImageForm {
    pub fn require_image(&mut self) -> Result<ImageUpload, ApiError> {
        self.image
            .take()
            .ok_or_else(|| ApiError::BadRequest("No image provided".into()))
    }

    /// Trimmed, non-blank text field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

pub async fn read_image_form(mut multipart: Multipart) -> Result<ImageForm, ApiError> {
    let mut form = ImageForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let filename = field.file_name().unwrap_or("image").to_string();
            let declared = field.content_type().map(str::to_string);
            let bytes = field.bytes().await?;
            form.image = Some(validate_image(filename, declared, bytes.to_vec())?);
        } else {
            let value = field.text().await?;
            form.fields.insert(name, value);
        }
    }
    Ok(form)
}

fn validate_image(
    filename: String,
    declared: Option<String>,
    bytes: Vec<u8>,
) -> Result<ImageUpload, ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Image is empty".into()));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ApiError::PayloadTooLarge(format!(
            "Image too large. Maximum {}MB.",
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }

    let content_type = declared
        .filter(|c| !c.is_empty() && c != "application/octet-stream")
        .unwrap_or_else(|| {
            mime_guess::from_path(&filename)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        });
    if !content_type.starts_with("image/") {
        return Err(ApiError::UnsupportedMediaType(format!(
            "Expected an image, got {content_type}"
        )));
    }

    Ok(ImageUpload {
        bytes,
        filename,
        content_type,
    })
}

/// File extension for a stored image: the upload's own extension when it
/// agrees with the MIME type, else the first one registered for the type.
fn image_extension(image: &ImageUpload) -> String {
    let own = std::path::Path::new(&image.filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    if let Some(ext) = &own {
        let agrees = mime_guess::from_ext(ext)
            .iter()
            .any(|m| m.essence_str() == image.content_type);
        if agrees {
            return ext.clone();
        }
    }

    mime_guess::get_mime_extensions_str(&image.content_type)
        .and_then(|exts| exts.first())
        .map(|e| e.to_string())
        .or(own)
        .unwrap_or_else(|| "bin".to_string())
}

/// Write an image to the object store and sign a long-lived URL for it.
pub async fn store_image(
    ctx: &ApiContext,
    patient_id: Option<&str>,
    image: &ImageUpload,
) -> Result<(ObjectKey, SignedUrl), ApiError> {
    let key = ObjectKey::for_patient_image(patient_id, &image_extension(image));
    ctx.objects
        .put_object(&key, &image.bytes, &image.content_type)
        .await?;
    let signed = ctx.signer.presign(&key, UPLOAD_URL_TTL, Utc::now())?;

    tracing::info!(
        key = %key,
        patient_id = patient_id.unwrap_or("-"),
        size = image.bytes.len(),
        expires_at = %signed.expires_at,
        "Image stored"
    );
    Ok((key, signed))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub image_url: String,
    pub image_key: String,
}

/// `POST /api/upload-patient-image`: multipart `image` plus optional
/// `patientId`. An existing patient gets the new URL appended to `images`.
pub async fn upload(
    State(ctx): State<ApiContext>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut form = read_image_form(multipart).await?;
    let image = form.require_image()?;
    let patient_id = form.field("patientId").map(str::to_string);

    let (key, signed) = store_image(&ctx, patient_id.as_deref(), &image).await?;

    if let Some(id) = patient_id.as_deref() {
        match ctx.patients.get_patient(id)? {
            Some(mut patient) => {
                patient.images.push(signed.url.clone());
                patient.updated_at = Utc::now();
                ctx.patients.put_patient(&patient)?;
                tracing::info!(patient_id = id, key = %key, "Image attached to patient");
            }
            None => {
                tracing::debug!(patient_id = id, "Upload names an unknown patient, not attaching");
            }
        }
    }

    Ok(Json(UploadResponse {
        image_url: signed.url,
        image_key: key.to_string(),
    }))
}

#[derive(Deserialize)]
pub struct DownloadQuery {
    pub url: Option<String>,
}

/// `GET /api/download-patient-image?url=`: re-sign a previously issued URL
/// for five minutes, read through that grant, return the bytes as an attachment.
pub async fn download(
    State(ctx): State<ApiContext>,
    Query(query): Query<DownloadQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let url = query
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing url parameter".into()))?;
    let requested = key_from_url(url)?;

    // The read goes through a fresh short-lived grant, never the caller's URL.
    let now = Utc::now();
    let signed = ctx.signer.presign(&requested, DOWNLOAD_URL_TTL, now)?;
    tracing::info!(key = %requested, expires_at = %signed.expires_at, "Download URL signed");
    let key = ctx.signer.resolve(&signed.url, now)?;

    let object = ctx.objects.get_object(&key).await?;
    let disposition = format!("attachment; filename=\"{}\"", key.file_name());
    Ok((
        [
            (CONTENT_TYPE, object.content_type),
            (CONTENT_DISPOSITION, disposition),
        ],
        object.bytes,
    ))
}

#[derive(Deserialize)]
pub struct SignatureQuery {
    pub expires: Option<i64>,
    pub signature: Option<String>,
}

/// `GET /objects/*key?expires=..&signature=..`: serve a stored object inline.
pub async fn serve_object(
    State(ctx): State<ApiContext>,
    Path(raw_key): Path<String>,
    Query(query): Query<SignatureQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let key = ObjectKey::parse(&raw_key)?;
    let (Some(expires), Some(signature)) = (query.expires, query.signature.as_deref()) else {
        return Err(ApiError::Forbidden("Missing signature".into()));
    };
    ctx.signer.verify(&key, expires, signature, Utc::now())?;

    let object = ctx.objects.get_object(&key).await?;
    Ok((
        [
            (CONTENT_TYPE, object.content_type),
            (CACHE_CONTROL, "private, max-age=300".to_string()),
        ],
        object.bytes,
    ))
}
