//! Patient record endpoints.
//!
//! - `GET /api/search-patients?q=&limit=`: substring search
//! - `GET /api/patient/:id`: one record
//! - `PUT /api/update-patient`: full overwrite
//! - `POST /api/create-patient`: new record from the registrar form
//! - `POST /api/create-patient-with-image`: new record plus its first image

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::images::{read_image_form, store_image};
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::{CaseMode, ScanFilter, MAX_SEARCH_RESULTS};
use crate::models::{Patient, PatientInput, ValidationError};

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<usize>,
}

/// `GET /api/search-patients`: a blank query answers `[]` without a scan.
pub async fn search(
    State(ctx): State<ApiContext>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let q = query.q.as_deref().unwrap_or_default().trim();
    if q.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let filter = ScanFilter::new(
        q,
        CaseMode::Insensitive,
        query.limit.unwrap_or(MAX_SEARCH_RESULTS),
    );
    let found = ctx.patients.scan_patients(&filter)?;
    tracing::debug!(query = q, matches = found.len(), "Patient search");
    Ok(Json(found))
}

/// `GET /api/patient/:id`
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<String>,
) -> Result<Json<Patient>, ApiError> {
    let patient = ctx
        .patients
        .get_patient(&patient_id)?
        .ok_or_else(|| ApiError::NotFound("Patient not found".into()))?;
    Ok(Json(patient))
}

/// `PUT /api/update-patient`: last write wins.
pub async fn update(
    State(ctx): State<ApiContext>,
    payload: Result<Json<PatientInput>, JsonRejection>,
) -> Result<Json<Patient>, ApiError> {
    let Json(input) = payload?;
    let patient_id = input
        .requested_id()
        .ok_or(ValidationError::MissingField("patientId"))?
        .to_string();

    let existing = ctx
        .patients
        .get_patient(&patient_id)?
        .ok_or_else(|| ApiError::NotFound("Patient not found".into()))?;

    let patient = input.into_replacement(&existing, Utc::now())?;
    ctx.patients.put_patient(&patient)?;
    tracing::info!(patient_id = %patient.patient_id, "Patient updated");
    Ok(Json(patient))
}

/// `POST /api/create-patient`: the server assigns the id.
pub async fn create(
    State(ctx): State<ApiContext>,
    payload: Result<Json<PatientInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let Json(input) = payload?;
    let patient = input.into_new_patient(new_patient_id(), Utc::now())?;
    ctx.patients.put_patient(&patient)?;
    tracing::info!(patient_id = %patient.patient_id, "Patient created");
    Ok((StatusCode::CREATED, Json(patient)))
}

/// `POST /api/create-patient-with-image`: multipart `patient` (JSON) and `image`.
pub async fn create_with_image(
    State(ctx): State<ApiContext>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let mut form = read_image_form(multipart).await?;
    let raw = form
        .field("patient")
        .ok_or(ValidationError::MissingField("patient"))?;
    let input: PatientInput = serde_json::from_str(raw)
        .map_err(|e| ApiError::BadRequest(format!("Invalid patient JSON: {e}")))?;
    let image = form.require_image()?;

    let mut patient = input.into_new_patient(new_patient_id(), Utc::now())?;
    let (_, signed) = store_image(&ctx, Some(&patient.patient_id), &image).await?;
    patient.images.push(signed.url);
    ctx.patients.put_patient(&patient)?;

    tracing::info!(patient_id = %patient.patient_id, "Patient created with image");
    Ok((StatusCode::CREATED, Json(patient)))
}

fn new_patient_id() -> String {
    Uuid::new_v4().to_string()
}
