//! Field checks shared by request structs' `Validate` impls.

use crate::error::AppError;
use regex::Regex;

/// Required string: present and not blank.
pub fn required(col: &str, v: &str) -> Result<(), AppError> {
    if v.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", col)));
    }
    Ok(())
}

/// Like `required`, for fields that may be omitted (partial updates). Present-but-blank is rejected.
pub fn not_blank(col: &str, v: Option<&str>) -> Result<(), AppError> {
    match v {
        Some(s) => required(col, s),
        None => Ok(()),
    }
}

pub fn max_length(col: &str, v: &str, max: usize) -> Result<(), AppError> {
    if v.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            col, max
        )));
    }
    Ok(())
}

pub fn matches_pattern(col: &str, v: &str, pattern: &str) -> Result<(), AppError> {
    let re = Regex::new(pattern).map_err(|_| AppError::Validation(format!("invalid pattern for {}", col)))?;
    if !re.is_match(v) {
        return Err(AppError::Validation(format!("{} does not match required pattern", col)));
    }
    Ok(())
}

pub fn one_of(col: &str, v: &str, allowed: &[&str]) -> Result<(), AppError> {
    if !allowed.contains(&v) {
        return Err(AppError::Validation(format!(
            "{} must be one of: {:?}",
            col,
            allowed.iter().take(5).collect::<Vec<_>>()
        )));
    }
    Ok(())
}

pub fn in_range(col: &str, n: f64, min: f64, max: f64) -> Result<(), AppError> {
    if n < min {
        return Err(AppError::Validation(format!("{} must be at least {}", col, min)));
    }
    if n > max {
        return Err(AppError::Validation(format!("{} must be at most {}", col, max)));
    }
    Ok(())
}

pub fn email(col: &str, v: &str) -> Result<(), AppError> {
    matches_pattern(col, v, EMAIL).map_err(|_| AppError::Validation(format!("{} must be a valid email", col)))
}

/// Trim an optional field in place.
pub fn trim_field(v: &mut Option<String>) {
    if let Some(s) = v {
        let trimmed = s.trim();
        if trimmed.len() != s.len() {
            *s = trimmed.to_string();
        }
    }
}

/// `local@domain.tld`, no whitespace.
pub const EMAIL: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

/// `HH:MM`, 24-hour clock.
pub const TIME_OF_DAY: &str = r"^([01][0-9]|2[0-3]):[0-5][0-9]$";
