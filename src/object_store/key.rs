use std::fmt;

use uuid::Uuid;

use super::ObjectStoreError;

const MAX_KEY_LEN: usize = 512;

/// A validated object key: relative, `/`-separated, no empty or dot segments,
/// ASCII alphanumerics plus `-_.` inside segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    pub fn parse(raw: &str) -> Result<Self, ObjectStoreError> {
        let invalid = |reason| ObjectStoreError::InvalidKey {
            key: raw.to_string(),
            reason,
        };

        if raw.is_empty() {
            return Err(invalid("empty"));
        }
        if raw.len() > MAX_KEY_LEN {
            return Err(invalid("too long"));
        }
        for segment in raw.split('/') {
            if segment.is_empty() {
                return Err(invalid("empty path segment"));
            }
            if segment == "." || segment == ".." {
                return Err(invalid("relative path segment"));
            }
            if !segment
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
            {
                return Err(invalid("unsupported character"));
            }
        }
        Ok(Self(raw.to_string()))
    }

    /// Fresh key for an uploaded patient image.
    ///
    /// Images without a patient go under `uploads/`.
    pub fn for_patient_image(patient_id: Option<&str>, extension: &str) -> Self {
        let ext = sanitize_segment(extension);
        let ext = if ext.is_empty() { "bin".to_string() } else { ext };
        let name = format!("{}.{ext}", Uuid::new_v4());
        match patient_id.map(sanitize_segment).filter(|p| !p.is_empty()) {
            Some(patient) => Self(format!("patients/{patient}/{name}")),
            None => Self(format!("uploads/{name}")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, used as the download filename.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn sanitize_segment(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_nested_keys() {
        let key = ObjectKey::parse("patients/p-1/abc.png").unwrap();
        assert_eq!(key.file_name(), "abc.png");
    }

    #[test]
    fn rejects_traversal_and_odd_shapes() {
        for raw in ["", "/abs.png", "a//b", "a/../b", "./a", "a/b/", "a b.png", "a/%2e%2e/b", "é.png"] {
            assert!(ObjectKey::parse(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn patient_image_keys_are_unique_and_valid() {
        let a = ObjectKey::for_patient_image(Some("p-1"), "png");
        let b = ObjectKey::for_patient_image(Some("p-1"), "png");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("patients/p-1/"));
        assert!(a.as_str().ends_with(".png"));
        assert!(ObjectKey::parse(a.as_str()).is_ok());
    }

    #[test]
    fn hostile_patient_id_is_sanitized() {
        let key = ObjectKey::for_patient_image(Some("../../etc"), "jpg");
        assert!(ObjectKey::parse(key.as_str()).is_ok());
        assert!(!key.as_str().contains(".."));
    }

    #[test]
    fn missing_patient_and_extension_fall_back() {
        let key = ObjectKey::for_patient_image(None, "");
        assert!(key.as_str().starts_with("uploads/"));
        assert!(key.as_str().ends_with(".bin"));
    }
}
