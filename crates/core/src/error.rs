//! Error taxonomy surfaced by the data layer.
//!
//! Every failure out of the gateway or the store ends up as a
//! [`DataError`]; nothing is silently swallowed. Read failures are stored
//! on the state (the list keeps its last-good data); write failures are
//! additionally returned to the caller so editing surfaces can stay open
//! and re-display field messages.

use serde::{Deserialize, Serialize};
use validator::ValidationErrors;

/// Marker the remote API embeds in validation messages when a unique
/// constraint is violated (e.g. a duplicate NIT).
pub const DUPLICATE_MARKER: &str = "must be unique";

/// One field-level validation message, as sent by the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(rename = "campo")]
    pub field: String,
    #[serde(rename = "mensaje")]
    pub message: String,
}

/// Failure kinds distinguished by the data layer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    /// Session expired or user not authenticated (401).
    #[error("session expired or user not authenticated")]
    Unauthorized,

    /// The authenticated user may not perform this action (403).
    #[error("not allowed to perform this action")]
    Forbidden,

    /// The record (or collection) does not exist (404).
    #[error("{entity} not found")]
    NotFound { entity: String },

    /// The server rejected the payload with per-field messages.
    #[error("validation failed on {} field(s)", .0.len())]
    ValidationFailed(Vec<FieldError>),

    /// A unique field already exists (409, or a validation message
    /// carrying the duplication marker).
    #[error("duplicate value{}: {message}", .field.as_ref().map(|f| format!(" on {f}")).unwrap_or_default())]
    Conflict {
        field: Option<String>,
        message: String,
    },

    /// The request never reached the server.
    #[error("could not reach the server: {0}")]
    Network(String),

    /// Anything else; carries the server message when one was sent.
    #[error("{message}")]
    Unknown { message: String },
}

impl DataError {
    /// Field messages to re-display on a form, when this error carries any.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            DataError::ValidationFailed(errors) => errors,
            _ => &[],
        }
    }
}

/// Classify an HTTP status plus the envelope's `message`/`errores` into a
/// [`DataError`].
///
/// - 401/403/404 map directly.
/// - 409 maps to [`DataError::Conflict`].
/// - 400/422 with field errors map to [`DataError::ValidationFailed`],
///   unless a message carries [`DUPLICATE_MARKER`], which is a conflict on
///   that field.
/// - Everything else is [`DataError::Unknown`] with the server message
///   when present.
pub fn classify_status(
    status: u16,
    entity: &str,
    message: Option<String>,
    field_errors: Option<Vec<FieldError>>,
) -> DataError {
    match status {
        401 => DataError::Unauthorized,
        403 => DataError::Forbidden,
        404 => DataError::NotFound {
            entity: entity.to_string(),
        },
        409 => DataError::Conflict {
            field: field_errors
                .as_ref()
                .and_then(|errs| errs.first())
                .map(|e| e.field.clone()),
            message: message.unwrap_or_else(|| "duplicate value".to_string()),
        },
        400 | 422 => match field_errors {
            Some(errors) if !errors.is_empty() => {
                if let Some(dup) = errors.iter().find(|e| e.message.contains(DUPLICATE_MARKER)) {
                    DataError::Conflict {
                        field: Some(dup.field.clone()),
                        message: dup.message.clone(),
                    }
                } else {
                    DataError::ValidationFailed(errors)
                }
            }
            _ => DataError::Unknown {
                message: message.unwrap_or_else(|| format!("request failed ({status})")),
            },
        },
        other => DataError::Unknown {
            message: message.unwrap_or_else(|| format!("request failed ({other})")),
        },
    }
}

/// Convert client-side `validator` output into the same per-field shape
/// the server uses, so forms handle both identically.
pub fn field_errors_from(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    for (field, errs) in errors.field_errors() {
        for err in errs {
            let message = err
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| err.code.to_string());
            out.push(FieldError {
                field: field.to_string(),
                message,
            });
        }
    }
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}
