use chrono::SecondsFormat;
use rusqlite::{params, Connection, OptionalExtension};

use super::ScanFilter;
use crate::db::DatabaseError;
use crate::models::Patient;

pub fn get_patient(conn: &Connection, patient_id: &str) -> Result<Option<Patient>, DatabaseError> {
    let document: Option<String> = conn
        .query_row(
            "SELECT document FROM patients WHERE patient_id = ?1",
            params![patient_id],
            |row| row.get(0),
        )
        .optional()?;

    document
        .map(|doc| decode(patient_id, &doc))
        .transpose()
}

pub fn put_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    let document = serde_json::to_string(patient)?;
    conn.execute(
        "INSERT INTO patients (patient_id, document, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(patient_id) DO UPDATE SET
            document = excluded.document,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at",
        params![
            patient.patient_id,
            document,
            patient.created_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
            patient.updated_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
        ],
    )?;
    Ok(())
}

/// Full scan in creation order, keeping the first `filter.limit()` matches.
/// Documents that no longer decode are skipped with a warning.
pub fn scan_patients(conn: &Connection, filter: &ScanFilter) -> Result<Vec<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT patient_id, document FROM patients ORDER BY created_at ASC, patient_id ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut matches = Vec::new();
    for row in rows {
        let (id, document) = row?;
        let patient = match decode(&id, &document) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(patient_id = %id, error = %e, "Skipping undecodable patient document");
                continue;
            }
        };
        if filter.matches(&patient) {
            matches.push(patient);
            if matches.len() >= filter.limit() {
                break;
            }
        }
    }
    Ok(matches)
}

fn decode(patient_id: &str, document: &str) -> Result<Patient, DatabaseError> {
    serde_json::from_str(document).map_err(|e| DatabaseError::CorruptDocument {
        entity_type: "patient",
        id: patient_id.to_string(),
        reason: e.to_string(),
    })
}
