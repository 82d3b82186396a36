//! Domain errors shared by the storage layer, the publishing engine and the API.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LandableError>;

#[derive(Debug, Error)]
pub enum LandableError {
    /// Lookup by primary key found nothing. Malformed keys end up here too.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// Credentials were missing, malformed, unknown or expired. Deliberately
    /// carries no detail about which check failed.
    #[error("authentication required")]
    Authentication,

    #[error("no acceptable representation for format {0}")]
    UnsupportedRepresentation(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LandableError {
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<ValidationErrors> for LandableError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Per-attribute validation messages, serialized as `{"field": ["message"]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Record "can't be blank" for `field` when `value` is missing or blank.
    pub fn require(&mut self, field: &str, value: Option<&str>) {
        if value.map_or(true, |v| v.trim().is_empty()) {
            self.add(field, "can't be blank");
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded, otherwise a validation error.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(LandableError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "{field} {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}
