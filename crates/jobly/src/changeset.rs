//! Changeset-style validation error types.
//!
//! Inputs (`NewJob`, `JobUpdate`, ...) collect every failing field into a
//! [`ValidationErrors`] instead of stopping at the first one.

use crate::error::{JoblyError, JoblyResult};
use serde::Serialize;

/// A machine-friendly validation code.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationCode {
    Required,
    Len,
    Range,
    Url,
    Custom(String),
}

impl ValidationCode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Required => "required",
            Self::Len => "len",
            Self::Range => "range",
            Self::Url => "url",
            Self::Custom(s) => s.as_str(),
        }
    }
}

impl Serialize for ValidationCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// A single field validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub code: ValidationCode,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code,
            message: message.into(),
        }
    }
}

/// A collection of validation errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub items: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn push(&mut self, err: ValidationError) {
        self.items.push(err);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.items.iter()
    }

    /// Whether any error was recorded for `field`.
    pub fn has(&self, field: &str) -> bool {
        self.items.iter().any(|e| e.field == field)
    }

    /// Record a length error unless `value` has between `min` and `max` chars.
    pub fn check_len(&mut self, field: &str, value: &str, min: usize, max: Option<usize>) {
        let len = value.chars().count();
        if len < min {
            self.push(ValidationError::new(
                field,
                ValidationCode::Len,
                format!("must be at least {min} characters"),
            ));
        } else if let Some(max) = max.filter(|max| len > *max) {
            self.push(ValidationError::new(
                field,
                ValidationCode::Len,
                format!("must be at most {max} characters"),
            ));
        }
    }

    /// Record a range error if `value` is below `min`.
    pub fn check_min<T>(&mut self, field: &str, value: T, min: T)
    where
        T: PartialOrd + std::fmt::Display,
    {
        if value < min {
            self.push(ValidationError::new(
                field,
                ValidationCode::Range,
                format!("must be >= {min}"),
            ));
        }
    }

    /// Record a range error unless `min <= value <= max`.
    pub fn check_range<T>(&mut self, field: &str, value: T, min: T, max: T)
    where
        T: PartialOrd + std::fmt::Display,
    {
        if value < min || value > max {
            self.push(ValidationError::new(
                field,
                ValidationCode::Range,
                format!("must be between {min} and {max}"),
            ));
        }
    }

    /// Record a url error unless `value` parses as an absolute URL.
    pub fn check_url(&mut self, field: &str, value: &str) {
        if !crate::validate::is_url(value) {
            self.push(ValidationError::new(
                field,
                ValidationCode::Url,
                "must be a valid URL",
            ));
        }
    }

    /// `Ok(())` when nothing was recorded, otherwise [`JoblyError::Validation`].
    pub fn into_result(self) -> JoblyResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(JoblyError::Validation(self))
        }
    }
}
