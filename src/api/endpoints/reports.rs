//! `POST /api/generate-report`: LLM report for a prediction.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{Prediction, PredictionInput, Report};

pub async fn generate(
    State(ctx): State<ApiContext>,
    payload: Result<Json<PredictionInput>, JsonRejection>,
) -> Result<Json<Report>, ApiError> {
    let Json(input) = payload?;
    let prediction = Prediction::try_from(input)?;

    tracing::info!(
        label = %prediction.prediction,
        symptoms = prediction.symptoms.len(),
        "Generating report"
    );
    let report = ctx.reports.generate(&prediction).await?;
    Ok(Json(report))
}
