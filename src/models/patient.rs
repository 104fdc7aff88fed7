use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::enums::{Sex, Symptom};
use super::{NumberOrText, ValidationError};

pub const MAX_AGE: u8 = 150;

/// Phone rule from the patient edit form.
static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[\d\s\-\(\)]{10,}$").unwrap());

/// A stored patient record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub patient_id: String,
    pub name: String,
    pub age: u8,
    #[serde(default)]
    pub sex: Sex,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub symptoms: Vec<Symptom>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_history: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergies: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medications: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    /// Substring match used by patient search. `needle` must already be
    /// lower-cased when `case_insensitive` is set.
    pub fn matches(&self, needle: &str, case_insensitive: bool) -> bool {
        let fields = [
            Some(self.name.as_str()),
            Some(self.patient_id.as_str()),
            self.phone.as_deref(),
        ];
        fields.into_iter().flatten().any(|field| {
            if case_insensitive {
                field.to_lowercase().contains(needle)
            } else {
                field.contains(needle)
            }
        })
    }
}

/// Patient fields as posted by the registrar and edit forms.
///
/// Everything is optional at the wire level so that missing fields surface
/// as 400 validation errors instead of opaque deserialization failures.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientInput {
    #[serde(default, alias = "PatientID")]
    pub patient_id: Option<String>,
    #[serde(default, alias = "patientName")]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<NumberOrText>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub medical_history: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default)]
    pub medications: Option<String>,
    #[serde(default)]
    pub emergency_contact: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl PatientInput {
    /// Identifier supplied by the caller, if any non-blank one was sent.
    pub fn requested_id(&self) -> Option<&str> {
        self.patient_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Build a brand-new record. The identifier is always the one given here,
    /// never a caller-supplied one.
    pub fn into_new_patient(
        self,
        patient_id: String,
        now: DateTime<Utc>,
    ) -> Result<Patient, ValidationError> {
        self.build(patient_id, now, now)
    }

    /// Build the full-overwrite replacement for `existing`.
    ///
    /// `createdAt` is kept from the stored record unless the caller sent one.
    pub fn into_replacement(
        self,
        existing: &Patient,
        now: DateTime<Utc>,
    ) -> Result<Patient, ValidationError> {
        let created_at = self.created_at.unwrap_or(existing.created_at);
        self.build(existing.patient_id.clone(), created_at, now)
    }

    fn build(
        self,
        patient_id: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Patient, ValidationError> {
        let name = non_blank(self.name).ok_or(ValidationError::MissingField("name"))?;
        let age = parse_age(self.age.as_ref())?;
        let sex = match non_blank(self.sex) {
            Some(raw) => raw.parse()?,
            None => Sex::Unspecified,
        };

        let mut symptoms: Vec<Symptom> = Vec::with_capacity(self.symptoms.len());
        for raw in &self.symptoms {
            let symptom: Symptom = raw.parse()?;
            if !symptoms.contains(&symptom) {
                symptoms.push(symptom);
            }
        }

        let email = non_blank(self.email);
        if let Some(email) = &email {
            if !email.contains('@') {
                return Err(ValidationError::InvalidField {
                    field: "email",
                    reason: "must contain '@'".into(),
                });
            }
        }

        let phone = non_blank(self.phone);
        if let Some(phone) = &phone {
            if !PHONE_PATTERN.is_match(phone) {
                return Err(ValidationError::InvalidField {
                    field: "phone",
                    reason: "expected at least 10 digits, spaces, dashes or parentheses".into(),
                });
            }
        }

        let images = self
            .images
            .into_iter()
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())
            .collect();

        Ok(Patient {
            patient_id,
            name,
            age,
            sex,
            email,
            phone,
            address: non_blank(self.address),
            symptoms,
            medical_history: non_blank(self.medical_history),
            allergies: non_blank(self.allergies),
            medications: non_blank(self.medications),
            emergency_contact: non_blank(self.emergency_contact),
            images,
            created_at,
            updated_at,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_age(raw: Option<&NumberOrText>) -> Result<u8, ValidationError> {
    let raw = raw.ok_or(ValidationError::MissingField("age"))?;
    let invalid = |reason: String| ValidationError::InvalidField { field: "age", reason };

    let value = raw
        .as_f64()
        .ok_or_else(|| invalid(format!("'{raw:?}' is not a number")))?;
    if value.fract() != 0.0 {
        return Err(invalid(format!("{value} is not a whole number")));
    }
    if !(0.0..=f64::from(MAX_AGE)).contains(&value) {
        return Err(invalid(format!("{value} is outside 0-{MAX_AGE}")));
    }
    Ok(value as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(json: serde_json::Value) -> PatientInput {
        serde_json::from_value(json).unwrap()
    }

    fn registrar_form() -> PatientInput {
        form(serde_json::json!({
            "name": "Amina Yusuf",
            "sex": "Female",
            "age": "34",
            "symptoms": ["fever", "coughMoreThanThreeWeek", "fever"],
        }))
    }

    #[test]
    fn builds_patient_from_registrar_form() {
        let now = Utc::now();
        let patient = registrar_form()
            .into_new_patient("p-1".into(), now)
            .unwrap();
        assert_eq!(patient.patient_id, "p-1");
        assert_eq!(patient.age, 34);
        assert_eq!(patient.sex, Sex::Female);
        assert_eq!(
            patient.symptoms,
            vec![Symptom::Fever, Symptom::CoughMoreThanThreeWeeks]
        );
        assert_eq!(patient.created_at, now);
        assert_eq!(patient.updated_at, now);
    }

    #[test]
    fn accepts_legacy_field_names() {
        let input = form(serde_json::json!({
            "PatientID": "legacy-7",
            "patientName": "Old Form",
            "age": 70,
        }));
        assert_eq!(input.requested_id(), Some("legacy-7"));
        let patient = input.into_new_patient("new".into(), Utc::now()).unwrap();
        assert_eq!(patient.name, "Old Form");
        assert_eq!(patient.sex, Sex::Unspecified);
    }

    #[test]
    fn rejects_missing_name() {
        let input = form(serde_json::json!({ "name": "  ", "age": 3 }));
        assert_eq!(
            input.into_new_patient("x".into(), Utc::now()).unwrap_err(),
            ValidationError::MissingField("name")
        );
    }

    #[test]
    fn rejects_age_out_of_range_or_fractional() {
        for age in [serde_json::json!(151), serde_json::json!(-1), serde_json::json!(4.5), serde_json::json!("old")] {
            let input = form(serde_json::json!({ "name": "N", "age": age }));
            assert!(matches!(
                input.into_new_patient("x".into(), Utc::now()),
                Err(ValidationError::InvalidField { field: "age", .. })
            ));
        }
    }

    #[test]
    fn accepts_age_bounds() {
        for age in [0, 150] {
            let input = form(serde_json::json!({ "name": "N", "age": age }));
            assert!(input.into_new_patient("x".into(), Utc::now()).is_ok());
        }
    }

    #[test]
    fn rejects_unknown_symptom() {
        let input = form(serde_json::json!({ "name": "N", "age": 1, "symptoms": ["itching"] }));
        assert!(matches!(
            input.into_new_patient("x".into(), Utc::now()),
            Err(ValidationError::InvalidEnum { field: "Symptom", .. })
        ));
    }

    #[test]
    fn validates_phone_and_email() {
        let bad_phone = form(serde_json::json!({ "name": "N", "age": 1, "phone": "12-34" }));
        assert!(bad_phone.into_new_patient("x".into(), Utc::now()).is_err());

        let bad_email = form(serde_json::json!({ "name": "N", "age": 1, "email": "nobody" }));
        assert!(bad_email.into_new_patient("x".into(), Utc::now()).is_err());

        let good = form(serde_json::json!({
            "name": "N", "age": 1, "phone": "+44 (20) 7946-0958", "email": "n@example.org"
        }));
        assert!(good.into_new_patient("x".into(), Utc::now()).is_ok());
    }

    #[test]
    fn replacement_keeps_identity_and_creation_time() {
        let created = Utc::now() - chrono::Duration::days(3);
        let existing = registrar_form().into_new_patient("p-9".into(), created).unwrap();

        let update = form(serde_json::json!({
            "patientId": "p-9",
            "name": "Amina Y.",
            "age": 35,
            "images": ["https://img/1", " "],
        }));
        let now = Utc::now();
        let replaced = update.into_replacement(&existing, now).unwrap();
        assert_eq!(replaced.patient_id, "p-9");
        assert_eq!(replaced.created_at, created);
        assert_eq!(replaced.updated_at, now);
        assert_eq!(replaced.images, vec!["https://img/1".to_string()]);
        // Full overwrite: symptoms not resent are gone.
        assert!(replaced.symptoms.is_empty());
    }

    #[test]
    fn search_match_covers_name_id_and_phone() {
        let mut patient = registrar_form().into_new_patient("ABC-123".into(), Utc::now()).unwrap();
        patient.phone = Some("0712 345 678".into());

        assert!(patient.matches("amina", true));
        assert!(!patient.matches("amina", false));
        assert!(patient.matches("Amina", false));
        assert!(patient.matches("abc-1", true));
        assert!(patient.matches("345", false));
        assert!(!patient.matches("zzz", true));
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let patient = registrar_form().into_new_patient("p".into(), Utc::now()).unwrap();
        let json = serde_json::to_value(&patient).unwrap();
        assert_eq!(json["patientId"], "p");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("email").is_none());
        assert_eq!(json["symptoms"][0], "fever");
    }
}
