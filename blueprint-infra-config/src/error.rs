//! Error types for configuration loading and validation.

use crate::Field;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// One rejected field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub field: Field,
    /// The offending value, `None` when the field was missing
    pub raw_value: Option<String>,
    pub message: String,
}

impl ValidationError {
    pub(crate) fn missing(field: Field) -> Self {
        Self {
            field,
            raw_value: None,
            message: format!("{} is required", field.key()),
        }
    }

    pub(crate) fn malformed(field: Field, raw_value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field,
            raw_value: Some(raw_value.into()),
            message: message.into(),
        }
    }

    pub fn is_missing(&self) -> bool {
        self.raw_value.is_none()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.raw_value {
            Some(raw) => write!(f, "{}: {} (got {:?})", self.field.key(), self.message, raw),
            None => write!(f, "{}: {}", self.field.key(), self.message),
        }
    }
}

/// Every violation found in one validation pass, in field-declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub(crate) fn new(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} configuration error(s)", self.0.len())?;
        for error in &self.0 {
            write!(f, "\n  - {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ValidationErrors),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
