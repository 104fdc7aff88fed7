use base64::Engine;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::PredictionError;
use crate::models::{NumberOrText, Prediction};

pub const LABEL_HEADER: &str = "word";
pub const HEALTHY_HEADER: &str = "healthy_score";
pub const TUBERCULOSIS_HEADER: &str = "tb_score";
pub const PNEUMONIA_HEADER: &str = "pneumonia_score";

/// An image as received from the browser, ready to forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

/// The classifier's annotated copy of the image, base64-encoded for JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedImage {
    pub content_type: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierOutput {
    #[serde(flatten)]
    pub prediction: Prediction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotated_image: Option<AnnotatedImage>,
}

/// JSON form of the classifier answer, used when the headers are absent.
#[derive(Debug, Deserialize)]
struct ClassifierBody {
    word: Option<String>,
    healthy_score: Option<NumberOrText>,
    tb_score: Option<NumberOrText>,
    pneumonia_score: Option<NumberOrText>,
}

/// Decode a successful classifier response.
///
/// Headers take precedence; when none of them is present the body must be
/// a JSON object with the same field names. Missing scores count as 0 and a
/// missing label as empty. A score that is present but not a finite number
/// is an error.
pub fn parse_classifier_response(
    headers: &HeaderMap,
    body: &[u8],
) -> Result<ClassifierOutput, PredictionError> {
    let has_headers = [LABEL_HEADER, HEALTHY_HEADER, TUBERCULOSIS_HEADER, PNEUMONIA_HEADER]
        .iter()
        .any(|name| headers.contains_key(*name));

    if has_headers {
        let prediction = Prediction::new(
            parse_score(HEALTHY_HEADER, header_text(headers, HEALTHY_HEADER)?)?,
            parse_score(TUBERCULOSIS_HEADER, header_text(headers, TUBERCULOSIS_HEADER)?)?,
            parse_score(PNEUMONIA_HEADER, header_text(headers, PNEUMONIA_HEADER)?)?,
            header_text(headers, LABEL_HEADER)?.unwrap_or_default().trim(),
        );
        return Ok(ClassifierOutput {
            prediction,
            annotated_image: annotated_image(headers, body),
        });
    }

    let parsed: ClassifierBody = serde_json::from_slice(body).map_err(|e| {
        PredictionError::InvalidResponse(format!(
            "no prediction headers and body is not a JSON prediction: {e}"
        ))
    })?;
    let prediction = Prediction::new(
        body_score(HEALTHY_HEADER, parsed.healthy_score)?,
        body_score(TUBERCULOSIS_HEADER, parsed.tb_score)?,
        body_score(PNEUMONIA_HEADER, parsed.pneumonia_score)?,
        parsed.word.as_deref().unwrap_or_default().trim(),
    );
    Ok(ClassifierOutput {
        prediction,
        annotated_image: None,
    })
}

fn header_text<'a>(
    headers: &'a HeaderMap,
    name: &'static str,
) -> Result<Option<&'a str>, PredictionError> {
    headers
        .get(name)
        .map(|value| {
            value.to_str().map_err(|_| {
                PredictionError::InvalidResponse(format!("header {name} is not valid text"))
            })
        })
        .transpose()
}

/// Blank or missing → 0.
pub fn parse_score(field: &'static str, raw: Option<&str>) -> Result<f64, PredictionError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(0.0),
        Some(text) => text
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                PredictionError::InvalidResponse(format!("{field} is not a number: '{text}'"))
            }),
    }
}

fn body_score(field: &'static str, raw: Option<NumberOrText>) -> Result<f64, PredictionError> {
    match raw {
        None => Ok(0.0),
        Some(NumberOrText::Text(text)) => parse_score(field, Some(&text)),
        Some(number) => number.as_f64().ok_or_else(|| {
            PredictionError::InvalidResponse(format!("{field} is not a finite number"))
        }),
    }
}

fn annotated_image(headers: &HeaderMap, body: &[u8]) -> Option<AnnotatedImage> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    if body.is_empty() || !content_type.starts_with("image/") {
        return None;
    }
    Some(AnnotatedImage {
        content_type: content_type.to_string(),
        data: base64::engine::general_purpose::STANDARD.encode(body),
    })
}
