use serde::{Deserialize, Serialize};

use super::enums::Symptom;
use super::{NumberOrText, ValidationError};

/// Classifier output for one chest X-ray.
///
/// Scores are percentages and are not required to sum to 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub healthy: f64,
    pub tuberculosis: f64,
    pub pneumonia: f64,
    /// Primary label declared by the classifier ("Healthy", "Tuberculosis", ...).
    pub prediction: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symptoms: Vec<Symptom>,
}

impl Prediction {
    pub fn new(healthy: f64, tuberculosis: f64, pneumonia: f64, label: &str) -> Self {
        Self {
            healthy,
            tuberculosis,
            pneumonia,
            prediction: label.to_string(),
            symptoms: Vec::new(),
        }
    }

    /// Which condition the declared label names, if recognizable.
    pub fn condition(&self) -> Option<Condition> {
        match self.prediction.trim().to_ascii_lowercase().as_str() {
            "healthy" | "normal" => Some(Condition::Healthy),
            "tuberculosis" | "tb" => Some(Condition::Tuberculosis),
            "pneumonia" => Some(Condition::Pneumonia),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Healthy,
    Tuberculosis,
    Pneumonia,
}

/// Report request body. Scores may arrive as numbers or numeric strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionInput {
    pub healthy: Option<NumberOrText>,
    pub tuberculosis: Option<NumberOrText>,
    pub pneumonia: Option<NumberOrText>,
    pub prediction: Option<String>,
    /// Either a list of checklist keys or the `{key: bool}` map the dashboard sends.
    #[serde(default)]
    pub symptoms: Option<serde_json::Value>,
}

impl TryFrom<PredictionInput> for Prediction {
    type Error = ValidationError;

    fn try_from(input: PredictionInput) -> Result<Self, Self::Error> {
        let label = input
            .prediction
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .ok_or(ValidationError::MissingField("prediction"))?;

        Ok(Self {
            healthy: score("healthy", input.healthy.as_ref())?,
            tuberculosis: score("tuberculosis", input.tuberculosis.as_ref())?,
            pneumonia: score("pneumonia", input.pneumonia.as_ref())?,
            prediction: label,
            symptoms: parse_symptoms(input.symptoms.as_ref())?,
        })
    }
}

fn score(field: &'static str, raw: Option<&NumberOrText>) -> Result<f64, ValidationError> {
    let raw = raw.ok_or(ValidationError::MissingField(field))?;
    let value = raw.as_f64().ok_or_else(|| ValidationError::InvalidField {
        field,
        reason: format!("{raw:?} is not a number"),
    })?;
    if !(0.0..=100.0).contains(&value) {
        return Err(ValidationError::InvalidField {
            field,
            reason: format!("{value} is outside 0-100"),
        });
    }
    Ok(value)
}

fn parse_symptoms(raw: Option<&serde_json::Value>) -> Result<Vec<Symptom>, ValidationError> {
    let mut symptoms = Vec::new();
    match raw {
        None | Some(serde_json::Value::Null) => {}
        Some(serde_json::Value::Array(items)) => {
            for item in items {
                if let Some(key) = item.as_str() {
                    push_unique(&mut symptoms, key.parse()?);
                }
            }
        }
        Some(serde_json::Value::Object(flags)) => {
            for (key, flag) in flags {
                if flag.as_bool() == Some(true) {
                    push_unique(&mut symptoms, key.parse()?);
                }
            }
        }
        Some(other) => {
            return Err(ValidationError::InvalidField {
                field: "symptoms",
                reason: format!("expected a list or map, got {other}"),
            })
        }
    }
    Ok(symptoms)
}

fn push_unique(symptoms: &mut Vec<Symptom>, symptom: Symptom) {
    if !symptoms.contains(&symptom) {
        symptoms.push(symptom);
    }
}

/// LLM-generated explanation of a prediction. All three fields are always present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub summary: String,
    pub cause: String,
    pub suggested_actions: String,
}
