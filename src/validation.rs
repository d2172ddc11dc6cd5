//! Field rules applied before anything touches the store.

use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::{ApiError, ApiResult};

pub const MAX_USERNAME_CHARS: usize = 50;
pub const MAX_EMAIL_CHARS: usize = 254;
pub const MIN_PASSWORD_CHARS: usize = 8;
// bcrypt silently ignores input past 72 bytes.
pub const MAX_PASSWORD_BYTES: usize = 72;
pub const MAX_BIO_CHARS: usize = 500;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[^@\s]+@[^@\s.]+(\.[^@\s.]+)+$").expect("email regex is valid");
}

/// Returns the trimmed address, or a 422 when it is not an email.
pub fn email(raw: &str) -> ApiResult<String> {
    let email = raw.trim();
    if email.chars().count() > MAX_EMAIL_CHARS || !EMAIL_RE.is_match(email) {
        return Err(ApiError::Validation(
            "value is not a valid email address".to_string(),
        ));
    }
    Ok(email.to_string())
}

pub fn username(raw: &str) -> ApiResult<String> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(ApiError::Validation(
            "username must not be empty".to_string(),
        ));
    }
    if username.chars().count() > MAX_USERNAME_CHARS {
        return Err(ApiError::Validation(format!(
            "username must be at most {MAX_USERNAME_CHARS} characters"
        )));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(ApiError::Validation(
            "username must not contain whitespace".to_string(),
        ));
    }
    Ok(username.to_string())
}

pub fn password(raw: &str) -> ApiResult<()> {
    if raw.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ApiError::Validation(format!(
            "password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    if raw.len() > MAX_PASSWORD_BYTES {
        return Err(ApiError::Validation(format!(
            "password must be at most {MAX_PASSWORD_BYTES} bytes"
        )));
    }
    Ok(())
}

pub fn bio(raw: &str) -> ApiResult<String> {
    if raw.chars().count() > MAX_BIO_CHARS {
        return Err(ApiError::Validation(format!(
            "bio must be at most {MAX_BIO_CHARS} characters"
        )));
    }
    Ok(raw.to_string())
}
