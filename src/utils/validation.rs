use crate::utils::error::{Result, WaqtiError};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern is valid"));

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(WaqtiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(WaqtiError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(WaqtiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(WaqtiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(WaqtiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(WaqtiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(WaqtiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

// 表單欄位驗證：錯誤訊息直接顯示在畫面上，不會送出任何請求

pub fn require_field(label: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(WaqtiError::validation(format!("{} is required", label)));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<()> {
    require_field("Email", email)?;
    if !EMAIL_SHAPE.is_match(email) {
        return Err(WaqtiError::validation("Please enter a valid email address"));
    }
    Ok(())
}

/// Passwords are not trimmed: a whitespace password is still a password.
pub fn validate_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(WaqtiError::validation("Password is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("backend.url", "https://example.supabase.co").is_ok());
        assert!(validate_url("backend.url", "http://localhost:54321").is_ok());
        assert!(validate_url("backend.url", "").is_err());
        assert!(validate_url("backend.url", "invalid-url").is_err());
        assert!(validate_url("backend.url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("backend.timeout_seconds", 10u64, 1, 300).is_ok());
        assert!(validate_range("backend.timeout_seconds", 0u64, 1, 300).is_err());
        assert!(validate_range("backend.timeout_seconds", 301u64, 1, 300).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("demo@waqti.com").is_ok());

        let err = validate_email("   ").unwrap_err();
        assert_eq!(err.user_friendly_message(), "Email is required");

        let err = validate_email("not-an-email").unwrap_err();
        assert_eq!(err.user_friendly_message(), "Please enter a valid email address");

        assert!(validate_email("a@b").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("demo123456").is_ok());
        assert!(validate_password(" ").is_ok());
        assert!(matches!(
            validate_password(""),
            Err(WaqtiError::ValidationError { .. })
        ));
    }
}
