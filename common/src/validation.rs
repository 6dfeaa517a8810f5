// Input validation helpers shared by the services and handlers

use crate::errors::ValidationError;
use chrono::NaiveDate;
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 72; // bcrypt truncates beyond this
pub const MAX_NICKNAME_LENGTH: usize = 20;
pub const MAX_TITLE_LENGTH: usize = 50;
pub const MAX_CONTENTS_LENGTH: usize = 2000;
pub const INVITE_CODE_LENGTH: usize = 8;

// No 0/O/1/I so codes can be read aloud
const INVITE_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid regex");
    static ref INVITE_CODE_REGEX: Regex =
        Regex::new(r"^[A-HJ-NP-Z2-9]{8}$").expect("valid regex");
}

/// Trim and lowercase an email, rejecting malformed addresses
pub fn normalize_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ValidationError::MissingField("email".to_string()));
    }
    if !EMAIL_REGEX.is_match(&email) {
        return Err(ValidationError::invalid("email", "not a valid email address"));
    }
    Ok(email)
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::MissingField("password".to_string()));
    }
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::invalid(
            "password",
            format!("must be at least {} characters", MIN_PASSWORD_LENGTH),
        ));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::invalid(
            "password",
            format!("must be at most {} bytes", MAX_PASSWORD_LENGTH),
        ));
    }
    Ok(())
}

/// Trimmed, non-empty text of at most `max_chars` characters
pub fn required_text(field: &str, value: &str, max_chars: usize) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::MissingField(field.to_string()));
    }
    if value.chars().count() > max_chars {
        return Err(ValidationError::invalid(
            field,
            format!("must be at most {} characters", max_chars),
        ));
    }
    Ok(value.to_string())
}

/// Like `required_text`, but blank input means "not set"
pub fn optional_text(
    field: &str,
    value: Option<&str>,
    max_chars: usize,
) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => required_text(field, text, max_chars).map(Some),
    }
}

pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), ValidationError> {
    if start > end {
        return Err(ValidationError::invalid(
            "end_date",
            "must not be before start_date",
        ));
    }
    Ok(())
}

/// Dates in the future are rejected for birthdays and couple start dates
pub fn validate_not_future(field: &str, date: NaiveDate, today: NaiveDate) -> Result<(), ValidationError> {
    if date > today {
        return Err(ValidationError::invalid(field, "must not be in the future"));
    }
    Ok(())
}

pub fn generate_invite_code() -> String {
    let mut rng = rand::thread_rng();
    (0..INVITE_CODE_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..INVITE_CODE_ALPHABET.len());
            INVITE_CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Uppercase and check a partner's invite code
pub fn normalize_invite_code(code: &str) -> Result<String, ValidationError> {
    let code = code.trim().to_uppercase();
    if !INVITE_CODE_REGEX.is_match(&code) {
        return Err(ValidationError::invalid("partner_code", "not a valid invite code"));
    }
    Ok(code)
}
