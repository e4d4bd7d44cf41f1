//! Field validation helpers.
//!
//! Handlers build a [`Validator`], run checks against the incoming
//! payload, and call [`Validator::finish`]. All failures are reported at
//! once as `ServiceError::InvalidFields`.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{FieldError, ServiceError};
use crate::types::MAX_AMOUNT;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid")
});

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Accumulates field errors.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error unconditionally.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Require a non-blank string of at most `max` characters.
    pub fn required(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, "is required");
        } else if trimmed.chars().count() > max {
            self.add(field, format!("must be at most {} characters", max));
        }
        self
    }

    /// Optional string; when present it must fit in `max` characters.
    pub fn optional(&mut self, field: &str, value: Option<&str>, max: usize) -> &mut Self {
        if let Some(v) = value {
            if v.trim().chars().count() > max {
                self.add(field, format!("must be at most {} characters", max));
            }
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        let value = value.trim();
        if value.is_empty() {
            self.add(field, "is required");
        } else if value.len() > 254 || !EMAIL_RE.is_match(value) {
            self.add(field, "is not a valid email address");
        }
        self
    }

    pub fn password(&mut self, field: &str, value: &str) -> &mut Self {
        if value.chars().count() < MIN_PASSWORD_LEN {
            self.add(field, format!("must be at least {} characters", MIN_PASSWORD_LEN));
        }
        self
    }

    /// A money value: finite, non-negative and at most [`MAX_AMOUNT`].
    pub fn amount(&mut self, field: &str, value: f64) -> &mut Self {
        if !value.is_finite() || value < 0.0 {
            self.add(field, "must be a non-negative number");
        } else if value > MAX_AMOUNT {
            self.add(field, format!("must not exceed {}", MAX_AMOUNT));
        }
        self
    }

    pub fn positive(&mut self, field: &str, value: i64) -> &mut Self {
        if value <= 0 {
            self.add(field, "must be greater than 0");
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(())` if no checks failed, otherwise every collected error.
    pub fn finish(self) -> Result<(), ServiceError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::InvalidFields(self.errors))
        }
    }
}
