//! The uniform response envelope shared by every remote endpoint.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use padron_core::error::FieldError;

/// `{ success, data, count?, totalPages?, currentPage?, message?, errores? }`
///
/// `currentPage` is parsed defensively: some transport layers echo it back
/// as a string instead of a number.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default = "none")]
    pub data: Option<T>,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(rename = "totalPages", default)]
    pub total_pages: Option<u32>,
    #[serde(rename = "currentPage", default, deserialize_with = "string_or_u32")]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "errores", default)]
    pub field_errors: Option<Vec<FieldError>>,
}

// `#[serde(default)]` on `data` would require `T: Default`; this does not.
fn none<T>() -> Option<T> {
    None
}

/// Accept `3`, `"3"`, or `null` for a page number.
fn string_or_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => Ok(n.as_u64().map(|n| n as u32)),
        Some(serde_json::Value::String(s)) => match s.trim().parse::<u32>() {
            Ok(n) => Ok(Some(n)),
            Err(_) => Err(serde::de::Error::custom(format!(
                "currentPage is not a page number: {s:?}"
            ))),
        },
        Some(other) => Err(serde::de::Error::custom(format!(
            "currentPage has unexpected type: {other}"
        ))),
    }
}

impl<T: DeserializeOwned> ApiEnvelope<T> {
    /// Parse an envelope from a raw response body.
    pub fn from_body(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}
