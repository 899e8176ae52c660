//! Utilidades de validación
//!
//! Custom validators plugged into `#[validate(custom = ...)]` attributes and a
//! few helpers shared by the business layer.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use validator::ValidationError;

use crate::utils::errors::{AppError, AppResult};

lazy_static! {
    static ref PHONE_REGEX: Regex = Regex::new(r"^(0|\+84)[0-9]{9,10}$").unwrap();
    static ref VIN_REGEX: Regex = Regex::new(r"^[A-HJ-NPR-Z0-9]{17}$").unwrap();
    static ref PART_NUMBER_REGEX: Regex = Regex::new(r"^[A-Z0-9][A-Z0-9\-]{2,49}$").unwrap();
    static ref ROLE_NAME_REGEX: Regex = Regex::new(r"^[A-Z][A-Z_]{1,49}$").unwrap();
}

fn custom_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// Vietnamese phone numbers: `0xxxxxxxxx` or `+84xxxxxxxxx`
pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    if PHONE_REGEX.is_match(value) {
        Ok(())
    } else {
        Err(custom_error("phone", "invalid phone number"))
    }
}

/// ISO 3779 VIN: 17 characters without I, O and Q
pub fn validate_vin(value: &str) -> Result<(), ValidationError> {
    if VIN_REGEX.is_match(value) {
        Ok(())
    } else {
        Err(custom_error("vin", "VIN must be 17 characters (no I, O, Q)"))
    }
}

pub fn validate_part_number(value: &str) -> Result<(), ValidationError> {
    if PART_NUMBER_REGEX.is_match(value) {
        Ok(())
    } else {
        Err(custom_error("part_number", "part number must be upper-case alphanumeric"))
    }
}

pub fn validate_role_name(value: &str) -> Result<(), ValidationError> {
    if ROLE_NAME_REGEX.is_match(value) {
        Ok(())
    } else {
        Err(custom_error("role_name", "role name must be upper-case letters or underscores"))
    }
}

/// At least 8 characters with one letter and one digit
pub fn validate_password(value: &str) -> Result<(), ValidationError> {
    let long_enough = value.chars().count() >= 8;
    let has_letter = value.chars().any(|c| c.is_alphabetic());
    let has_digit = value.chars().any(|c| c.is_ascii_digit());
    if long_enough && has_letter && has_digit {
        Ok(())
    } else {
        Err(custom_error(
            "password",
            "password needs at least 8 characters including a letter and a digit",
        ))
    }
}

/// Money amounts are stored with two decimals and may not be negative.
pub fn ensure_non_negative(field: &str, value: Decimal) -> AppResult<()> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(AppError::BadRequest(format!("{} must not be negative", field)));
    }
    Ok(())
}

pub fn ensure_positive(field: &str, value: i32) -> AppResult<()> {
    if value <= 0 {
        return Err(AppError::BadRequest(format!("{} must be greater than zero", field)));
    }
    Ok(())
}

/// Trims a keyword and turns it into an `ILIKE` pattern.
pub fn like_pattern(keyword: Option<&str>) -> Option<String> {
    keyword
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|k| format!("%{}%", k.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone() {
        assert!(validate_phone("0912345678").is_ok());
        assert!(validate_phone("+84912345678").is_ok());
        assert!(validate_phone("12345").is_err());
    }

    #[test]
    fn test_vin() {
        assert!(validate_vin("1HGCM82633A004352").is_ok());
        assert!(validate_vin("1HGCM82633A00435").is_err());
        assert!(validate_vin("1HGCM82633A00435O").is_err());
    }

    #[test]
    fn test_password() {
        assert!(validate_password("secret123").is_ok());
        assert!(validate_password("short1").is_err());
        assert!(validate_password("onlyletters").is_err());
    }

    #[test]
    fn test_role_and_part_number() {
        assert!(validate_role_name("TECHNICIAN").is_ok());
        assert!(validate_role_name("technician").is_err());
        assert!(validate_part_number("BAT-72KWH-01").is_ok());
        assert!(validate_part_number("x").is_err());
    }

    #[test]
    fn test_like_pattern_escapes() {
        assert_eq!(like_pattern(Some("  brake ")), Some("%brake%".to_string()));
        assert_eq!(like_pattern(Some("50%")), Some("%50\\%%".to_string()));
        assert_eq!(like_pattern(Some("   ")), None);
        assert_eq!(like_pattern(None), None);
    }

    #[test]
    fn test_amount_checks() {
        assert!(ensure_non_negative("price", Decimal::ZERO).is_ok());
        assert!(ensure_non_negative("price", Decimal::new(-1, 0)).is_err());
        assert!(ensure_positive("quantity", 0).is_err());
        assert!(ensure_positive("quantity", 3).is_ok());
    }
}
