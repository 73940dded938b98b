use chrono::{DateTime, Utc};
use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

/// Urgency the requester assigns to a repair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(()),
        }
    }
}

/// Form input exactly as posted, before any trimming or checking.
///
/// Every field takes any scalar a JSON client sends (`"phone": 5551234` is
/// read as `"5551234"`); `null` and absent fields are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSubmission {
    #[serde(default, deserialize_with = "scalar_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub device_model: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub problem_description: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub priority: Option<String>,
}

fn scalar_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ScalarText;

    impl<'de> Visitor<'de> for ScalarText {
        type Value = Option<String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string, number or boolean")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(Some(v.to_owned()))
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D2: Deserializer<'de>>(self, d: D2) -> Result<Self::Value, D2::Error> {
            d.deserialize_any(self)
        }
    }

    deserializer.deserialize_any(ScalarText)
}

impl RawSubmission {
    /// Assign a form field by its wire name. Unknown names are ignored and
    /// reported back as `false`.
    pub fn set_field(&mut self, field: &str, value: String) -> bool {
        let slot = match field {
            "name" => &mut self.name,
            "email" => &mut self.email,
            "phone" => &mut self.phone,
            "deviceModel" => &mut self.device_model,
            "problemDescription" => &mut self.problem_description,
            "priority" => &mut self.priority,
            _ => return false,
        };
        *slot = Some(value);
        true
    }
}

/// Validated, normalized input. Only [`crate::validate`] produces one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionDraft {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub device_model: String,
    pub problem_description: String,
    pub priority: Priority,
}

/// One accepted repair request as persisted in the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub device_model: String,
    pub problem_description: String,
    #[serde(default)]
    pub priority: Priority,
    /// `/uploads/{file}` reference to the attached image, if any
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SubmissionRecord {
    pub fn from_draft(
        draft: SubmissionDraft,
        id: String,
        image: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: draft.name,
            email: draft.email,
            phone: draft.phone,
            device_model: draft.device_model,
            problem_description: draft.problem_description,
            priority: draft.priority,
            image,
            created_at,
        }
    }
}
