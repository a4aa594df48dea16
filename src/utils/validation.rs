//! Input validation primitives.
//!
//! Small checks that return `validation.invalid_argument` errors.

use crate::error::{Error, Result};

/// Require a string to be non-empty after trimming.
///
/// Returns a reference to the trimmed string on success.
pub fn require_non_empty<'a>(value: &'a str, field: &str, message: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::validation_invalid_argument(field, message, None, None))
    } else {
        Ok(trimmed)
    }
}

/// Require a number to fall inside an inclusive range.
pub fn require_in_range(value: u32, min: u32, max: u32, field: &str) -> Result<u32> {
    if value < min || value > max {
        Err(Error::validation_invalid_argument(
            field,
            format!("Must be between {} and {}", min, max),
            Some(value.to_string()),
            None,
        ))
    } else {
        Ok(value)
    }
}
