use std::sync::LazyLock;

use super::ApiError;

static EMAIL_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex"));

/// Loose RFC-ish email shape: something@something.tld without whitespace.
pub fn validate_email(email: &str) -> Result<&str, ApiError> {
    let trimmed = email.trim();

    if !EMAIL_RE.is_match(trimmed) {
        return Err(ApiError::validation(format!(
            "'{trimmed}' is not a valid email address"
        )));
    }

    Ok(trimmed)
}

/// Event dates travel as ISO `YYYY-MM-DD` strings.
pub fn validate_event_date(date: &str) -> Result<&str, ApiError> {
    let trimmed = date.trim();

    if chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").is_err() {
        return Err(ApiError::validation(format!(
            "'{trimmed}' is not a valid date (expected YYYY-MM-DD)"
        )));
    }

    Ok(trimmed)
}

pub fn validate_required<'a>(value: &'a str, field: &str) -> Result<&'a str, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("jane@example.com").is_ok());
        assert!(validate_email("  padded@example.com ").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("two@@example.com").is_err());
        assert!(validate_email("no@tld").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_validate_event_date() {
        assert!(validate_event_date("2026-03-14").is_ok());
        assert!(validate_event_date("2026-13-01").is_err());
        assert!(validate_event_date("14-03-2026").is_err());
        assert!(validate_event_date("tomorrow").is_err());
    }

    #[test]
    fn test_validate_required() {
        assert_eq!(validate_required("  x  ", "field").unwrap(), "x");
        assert!(validate_required("   ", "field").is_err());
    }
}
