//! `POST /api/predict`: forward an X-ray to the classifier.

use axum::extract::{Multipart, State};
use axum::Json;

use super::images::read_image_form;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::prediction::ClassifierOutput;

pub async fn predict(
    State(ctx): State<ApiContext>,
    multipart: Multipart,
) -> Result<Json<ClassifierOutput>, ApiError> {
    let mut form = read_image_form(multipart).await?;
    let image = form.require_image()?;

    tracing::info!(
        filename = %image.filename,
        content_type = %image.content_type,
        size = image.bytes.len(),
        "Classifying image"
    );
    let output = ctx.classifier.classify(&image).await?;
    Ok(Json(output))
}
