use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{domain::CategoryId, protocol::Notice};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    Reference,
    NotFound,
    Transport,
    Internal,
}

/// Field name to message, one message per field (the first violation wins).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Failures of the Access Layer. None of them is fatal to the process.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
    #[error("category not found: {category_id}")]
    Reference { category_id: CategoryId },
    #[error("piece not found")]
    NotFoundOrForbidden,
    #[error("transport failure: {0}")]
    Transport(String),
}

impl CatalogError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CatalogError::Validation(_) => ErrorCode::Validation,
            CatalogError::Reference { .. } => ErrorCode::Reference,
            CatalogError::NotFoundOrForbidden => ErrorCode::NotFound,
            CatalogError::Transport(_) => ErrorCode::Transport,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::Transport(_))
    }
}

impl From<FieldErrors> for CatalogError {
    fn from(value: FieldErrors) -> Self {
        CatalogError::Validation(value)
    }
}

/// JSON error body shared by the server and its clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "FieldErrors::is_empty")]
    pub field_errors: FieldErrors,
    /// Per-file staging notices raised before the request failed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field_errors: FieldErrors::new(),
            notices: Vec::new(),
        }
    }

    pub fn with_notices(mut self, notices: Vec<Notice>) -> Self {
        self.notices = notices;
        self
    }

    /// Rebuilds the typed error on the client side of the wire.
    pub fn into_catalog_error(self) -> CatalogError {
        match self.code {
            ErrorCode::Validation => {
                if self.field_errors.is_empty() {
                    CatalogError::Validation(FieldErrors::single("form", self.message))
                } else {
                    CatalogError::Validation(self.field_errors)
                }
            }
            ErrorCode::Reference => {
                let category_id = self
                    .message
                    .strip_prefix("category not found: ")
                    .unwrap_or(&self.message)
                    .to_string();
                CatalogError::Reference {
                    category_id: CategoryId(category_id),
                }
            }
            ErrorCode::NotFound => CatalogError::NotFoundOrForbidden,
            ErrorCode::Transport | ErrorCode::Internal => CatalogError::Transport(self.message),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(value: CatalogError) -> Self {
        let code = value.code();
        let message = value.to_string();
        let field_errors = match value {
            CatalogError::Validation(errors) => errors,
            _ => FieldErrors::new(),
        };
        Self {
            code,
            message,
            field_errors,
            notices: Vec::new(),
        }
    }
}
