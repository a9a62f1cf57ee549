//! Request validation utilities for the coupon admin API.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::status::{parse_coupon_date, ValidityWindow};

/// Validation error type.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn invalid(field_name: &str, message: impl Into<String>) -> ValidationError {
    ValidationError {
        field: field_name.to_string(),
        message: message.into(),
    }
}

fn coupon_code_regex() -> &'static Regex {
    static CODE: OnceLock<Regex> = OnceLock::new();
    CODE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{3,32}$").expect("coupon code pattern"))
}

/// Validate a coupon code.
///
/// Codes are 3-32 characters of letters, digits, `_` or `-`. Case is kept as given.
///
/// # Example
/// ```
/// use coupons::server::validation::validate_coupon_code;
///
/// assert!(validate_coupon_code("SUMMER10", "code").is_ok());
/// assert!(validate_coupon_code("summer-10", "code").is_ok());
/// assert!(validate_coupon_code("no spaces", "code").is_err());
/// assert!(validate_coupon_code("AB", "code").is_err());
/// ```
pub fn validate_coupon_code(value: &str, field_name: &str) -> ValidationResult<()> {
    if coupon_code_regex().is_match(value) {
        Ok(())
    } else {
        Err(invalid(
            field_name,
            "must be 3-32 characters of letters, digits, '_' or '-'",
        ))
    }
}

/// Validate a percentage discount: greater than 0, at most 100.
pub fn validate_discount(value: f64, field_name: &str) -> ValidationResult<()> {
    if value.is_finite() && value > 0.0 && value <= 100.0 {
        Ok(())
    } else {
        Err(invalid(field_name, "must be greater than 0 and at most 100"))
    }
}

/// Validate that a string is not empty or whitespace only.
pub fn validate_not_empty(value: &str, field_name: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        Err(invalid(field_name, "cannot be empty"))
    } else {
        Ok(())
    }
}

/// Validate a new coupon's window: both dates parse and `start <= end`.
pub fn validate_window(start: &str, end: &str) -> ValidationResult<ValidityWindow> {
    let start_date =
        parse_coupon_date(start).map_err(|_| invalid("startDate", "must be YYYY-MM-DD"))?;
    let end_date = parse_coupon_date(end).map_err(|_| invalid("endDate", "must be YYYY-MM-DD"))?;

    if start_date > end_date {
        return Err(invalid("endDate", "must not be before startDate"));
    }

    Ok(ValidityWindow {
        start: start_date,
        end: end_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coupon_code_is_case_preserving() {
        assert!(validate_coupon_code("Summer10", "code").is_ok());
        assert!(validate_coupon_code("SUMMER_10", "code").is_ok());
    }

    #[test]
    fn coupon_code_rejects_bad_input() {
        assert!(validate_coupon_code("", "code").is_err());
        assert!(validate_coupon_code("50%OFF", "code").is_err());
        assert!(validate_coupon_code(&"A".repeat(33), "code").is_err());
    }

    #[test]
    fn discount_bounds() {
        assert!(validate_discount(10.0, "discount").is_ok());
        assert!(validate_discount(100.0, "discount").is_ok());
        assert!(validate_discount(0.0, "discount").is_err());
        assert!(validate_discount(100.5, "discount").is_err());
        assert!(validate_discount(f64::NAN, "discount").is_err());
    }

    #[test]
    fn window_must_be_ordered() {
        assert!(validate_window("2024-01-01", "2024-01-31").is_ok());
        assert!(validate_window("2024-01-01", "2024-01-01").is_ok());

        let err = validate_window("2024-02-01", "2024-01-01").unwrap_err();
        assert_eq!(err.field, "endDate");

        let err = validate_window("tomorrow", "2024-01-01").unwrap_err();
        assert_eq!(err.field, "startDate");
    }

    #[test]
    fn not_empty() {
        assert!(validate_not_empty("all", "customerEligibility").is_ok());
        assert!(validate_not_empty("  ", "customerEligibility").is_err());
    }
}
