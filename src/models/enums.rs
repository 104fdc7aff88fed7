use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::ValidationError;

/// Macro to generate enum with as_str + std::str::FromStr + serde-as-string pattern.
/// Parsing ignores ASCII case so form values like "Male" are accepted.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $(
                    if s.eq_ignore_ascii_case($s) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(ValidationError::InvalidEnum {
                    field: stringify!($name),
                    value: s.into(),
                })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

str_enum!(Sex {
    Male => "male",
    Female => "female",
    Other => "other",
    Unspecified => "unspecified",
});

impl Default for Sex {
    fn default() -> Self {
        Self::Unspecified
    }
}

str_enum!(Symptom {
    CoughMoreThanThreeWeeks => "coughMoreThanThreeWeek",
    Fever => "fever",
    Sweating => "sweating",
    Smoking => "smoking",
    ChestPain => "chestPain",
    ShortnessOfBreath => "shortnessOfBreathe",
});

impl Symptom {
    /// Checklist label shown on the intake forms.
    pub fn label(&self) -> &'static str {
        match self {
            Self::CoughMoreThanThreeWeeks => "Cough (more than three weeks)",
            Self::Fever => "Fever",
            Self::Sweating => "Sweating",
            Self::Smoking => "Smoking",
            Self::ChestPain => "Chest Pain",
            Self::ShortnessOfBreath => "Shortness of Breath",
        }
    }
}

str_enum!(UserRole {
    Doctor => "doctor",
    Registrar => "registrar",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn sex_round_trip() {
        for (variant, s) in [
            (Sex::Male, "male"),
            (Sex::Female, "female"),
            (Sex::Other, "other"),
            (Sex::Unspecified, "unspecified"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(Sex::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn sex_accepts_form_capitalization() {
        assert_eq!(Sex::from_str("Male").unwrap(), Sex::Male);
        assert_eq!(Sex::from_str(" FEMALE ").unwrap(), Sex::Female);
    }

    #[test]
    fn symptom_keys_match_intake_checklist() {
        let keys: Vec<&str> = Symptom::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "coughMoreThanThreeWeek",
                "fever",
                "sweating",
                "smoking",
                "chestPain",
                "shortnessOfBreathe",
            ]
        );
    }

    #[test]
    fn unknown_value_is_rejected_with_field_name() {
        let err = Symptom::from_str("headache").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value for Symptom: 'headache'"
        );
    }

    #[test]
    fn serde_uses_string_form() {
        let json = serde_json::to_string(&UserRole::Registrar).unwrap();
        assert_eq!(json, "\"registrar\"");
        let role: UserRole = serde_json::from_str("\"Doctor\"").unwrap();
        assert_eq!(role, UserRole::Doctor);
        assert!(serde_json::from_str::<UserRole>("\"nurse\"").is_err());
    }
}
