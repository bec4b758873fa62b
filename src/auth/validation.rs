//! Field rules for signup payloads and the 422 error body they produce.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 100;
pub const EMAIL_MAX: usize = 254;
const EMAIL_LOCAL_MAX: usize = 64;
pub const USERNAME_PATTERN: &str = r"^[a-zA-Z0-9_-]+$";

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(USERNAME_PATTERN).unwrap();
    static ref EMAIL_LOCAL_RE: Regex = Regex::new(
        r"^[\p{L}\p{N}!#$%&'*+/=?^_`{|}~-]+(\.[\p{L}\p{N}!#$%&'*+/=?^_`{|}~-]+)*$"
    )
    .unwrap();
    static ref EMAIL_DOMAIN_RE: Regex = Regex::new(
        r"^([\p{L}\p{N}]([\p{L}\p{N}-]{0,61}[\p{L}\p{N}])?\.)+\p{L}([\p{L}\p{N}-]{0,61}[\p{L}\p{N}])?$"
    )
    .unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    StringTooShort,
    StringTooLong,
    StringPatternMismatch,
    ValueError,
    JsonInvalid,
    Missing,
}

/// One rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub location: Vec<String>,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: ErrorKind,
}

/// A single rule violation, before it is attached to a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub kind: ErrorKind,
    pub message: String,
}

impl Violation {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Default, Error)]
#[error("request validation failed with {} error(s)", .0.len())]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(location: Vec<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self(vec![FieldError {
            location,
            message: message.into(),
            kind,
        }])
    }

    /// Record the outcome of a field rule; `Ok` results are ignored.
    pub fn check(&mut self, field: &str, outcome: Result<(), Violation>) {
        if let Err(v) = outcome {
            self.0.push(FieldError {
                location: vec!["body".to_string(), field.to_string()],
                message: v.message,
                kind: v.kind,
            });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl IntoResponse for ValidationErrors {
    fn into_response(self) -> Response {
        (StatusCode::UNPROCESSABLE_ENTITY, Json(self.0)).into_response()
    }
}

/// Implemented by request bodies made of required string fields.
pub trait Validate {
    /// Field names in reporting order.
    const FIELDS: &'static [&'static str];

    fn check_field(field: &str, value: &str) -> Result<(), Violation>;
}

/// Check a decoded JSON body field by field: absent fields are `missing`,
/// non-strings are `value_error`, strings go through [`Validate::check_field`].
pub fn validate_body<T: Validate>(body: &Value) -> Result<(), ValidationErrors> {
    let Some(obj) = body.as_object() else {
        return Err(ValidationErrors::single(
            vec!["body".to_string()],
            ErrorKind::ValueError,
            "Input should be a valid dictionary",
        ));
    };

    let mut errors = ValidationErrors::new();
    for field in T::FIELDS {
        let outcome = match obj.get(*field) {
            None => Err(Violation::new(ErrorKind::Missing, "Field required")),
            Some(Value::String(value)) => T::check_field(field, value),
            Some(_) => Err(Violation::new(
                ErrorKind::ValueError,
                "Input should be a valid string",
            )),
        };
        errors.check(field, outcome);
    }
    errors.into_result()
}

fn check_length(value: &str, min: usize, max: usize) -> Result<(), Violation> {
    let len = value.chars().count();
    if len < min {
        return Err(Violation::new(
            ErrorKind::StringTooShort,
            format!("String should have at least {min} characters"),
        ));
    }
    if len > max {
        return Err(Violation::new(
            ErrorKind::StringTooLong,
            format!("String should have at most {max} characters"),
        ));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), Violation> {
    check_length(username, USERNAME_MIN, USERNAME_MAX)?;
    if !USERNAME_RE.is_match(username) {
        return Err(Violation::new(
            ErrorKind::StringPatternMismatch,
            format!("String should match pattern '{USERNAME_PATTERN}'"),
        ));
    }
    if !username.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(Violation::new(
            ErrorKind::ValueError,
            "Username must contain at least one alphanumeric character",
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), Violation> {
    let invalid = |reason: &str| {
        Violation::new(
            ErrorKind::ValueError,
            format!("value is not a valid email address: {reason}"),
        )
    };

    let Some((local, domain)) = email.rsplit_once('@') else {
        return Err(invalid("An email address must have an @-sign."));
    };
    if local.is_empty() {
        return Err(invalid("There must be something before the @-sign."));
    }
    if domain.is_empty() {
        return Err(invalid("There must be something after the @-sign."));
    }
    if email.chars().count() > EMAIL_MAX {
        return Err(invalid("The email address is too long."));
    }
    if local.chars().count() > EMAIL_LOCAL_MAX {
        return Err(invalid("The part before the @-sign is too long."));
    }
    if !EMAIL_LOCAL_RE.is_match(local) {
        return Err(invalid("The part before the @-sign is not valid."));
    }
    if !EMAIL_DOMAIN_RE.is_match(domain) {
        return Err(invalid("The part after the @-sign is not valid."));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), Violation> {
    check_length(password, PASSWORD_MIN, PASSWORD_MAX)?;
    if !password.chars().any(char::is_uppercase) {
        return Err(Violation::new(
            ErrorKind::ValueError,
            "Password must contain at least one uppercase letter",
        ));
    }
    if !password.chars().any(char::is_lowercase) {
        return Err(Violation::new(
            ErrorKind::ValueError,
            "Password must contain at least one lowercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(Violation::new(
            ErrorKind::ValueError,
            "Password must contain at least one digit",
        ));
    }
    Ok(())
}

/// Lower-case the domain of an already validated address. The local part is
/// case-sensitive per RFC 5321 and kept as given.
pub fn normalize_email(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(r: Result<(), Violation>) -> Option<ErrorKind> {
        r.err().map(|v| v.kind)
    }

    #[test]
    fn username_rules() {
        assert_eq!(kind(validate_username("ab")), Some(ErrorKind::StringTooShort));
        assert_eq!(kind(validate_username("---")), Some(ErrorKind::ValueError));
        assert_eq!(kind(validate_username("___")), Some(ErrorKind::ValueError));
        assert_eq!(kind(validate_username("abc")), None);
        assert_eq!(kind(validate_username("john_doe-42")), None);
        assert_eq!(kind(validate_username(&"a".repeat(50))), None);
        assert_eq!(kind(validate_username(&"a".repeat(51))), Some(ErrorKind::StringTooLong));
        assert_eq!(
            kind(validate_username("john doe")),
            Some(ErrorKind::StringPatternMismatch)
        );
        assert_eq!(
            kind(validate_username("jöhn")),
            Some(ErrorKind::StringPatternMismatch)
        );
    }

    #[test]
    fn password_rules() {
        assert_eq!(kind(validate_password("short1A")), Some(ErrorKind::StringTooShort));
        let err = validate_password("alllowercase1").unwrap_err();
        assert_eq!(err.message, "Password must contain at least one uppercase letter");
        let err = validate_password("ALLUPPERCASE1").unwrap_err();
        assert_eq!(err.message, "Password must contain at least one lowercase letter");
        let err = validate_password("NoDigitsHere").unwrap_err();
        assert_eq!(err.message, "Password must contain at least one digit");
        assert_eq!(kind(validate_password("ValidPass123")), None);
        assert_eq!(
            kind(validate_password(&format!("Aa1{}", "x".repeat(98)))),
            Some(ErrorKind::StringTooLong)
        );
    }

    #[test]
    fn numeric_symbols_are_not_digits() {
        for password in ["Abcdefgh½", "abcdefghⅫ", "ABCdefgh²"] {
            let err = validate_password(password).unwrap_err();
            assert_eq!(err.message, "Password must contain at least one digit", "{password}");
        }
    }

    #[test]
    fn password_length_counts_characters_not_bytes() {
        // 8 characters, 11 bytes.
        assert_eq!(kind(validate_password("Äbcdéf1ü")), None);
    }

    #[test]
    fn email_rules() {
        assert!(validate_email("john@example.com").is_ok());
        assert!(validate_email("john.doe+tag@mail.example.co.uk").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("john@").is_err());
        assert!(validate_email("john@localhost").is_err());
        assert!(validate_email("john..doe@example.com").is_err());
        assert!(validate_email("john doe@example.com").is_err());
        assert!(validate_email("john@exa_mple.com").is_err());
        assert!(validate_email("josé@example.com").is_ok());
        assert!(validate_email("user@bücher.de").is_ok());
        let long = format!("{}@example.com", "a".repeat(65));
        assert!(validate_email(&long).is_err());
    }

    #[test]
    fn normalize_lowercases_domain_only() {
        assert_eq!(normalize_email("John.Doe@Example.COM"), "John.Doe@example.com");
        assert_eq!(normalize_email("José@BÜCHER.de"), "José@bücher.de");
    }

    #[test]
    fn errors_collect_per_field_with_body_location() {
        let mut errors = ValidationErrors::new();
        errors.check("username", validate_username("ab"));
        errors.check("email", validate_email("john@example.com"));
        errors.check("password", validate_password("NoDigitsHere"));
        let errors = errors.into_result().unwrap_err();
        assert_eq!(errors.0.len(), 2);
        assert_eq!(errors.0[0].location, vec!["body", "username"]);
        assert_eq!(errors.0[1].location, vec!["body", "password"]);

        let json = serde_json::to_value(&errors.0[0]).unwrap();
        assert_eq!(json["type"], "string_too_short");
        assert_eq!(json["message"], "String should have at least 3 characters");
    }
}
