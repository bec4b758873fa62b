use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    repo_types::User,
    validation::{validate_email, validate_password, validate_username, Validate, Violation},
};

/// Request body for user registration.
#[derive(Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

// Keeps the plaintext out of `?payload` log fields and panic messages.
impl std::fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Validate for SignupRequest {
    const FIELDS: &'static [&'static str] = &["username", "email", "password"];

    fn check_field(field: &str, value: &str) -> Result<(), Violation> {
        match field {
            "username" => validate_username(value),
            "email" => validate_email(value),
            "password" => validate_password(value),
            _ => Ok(()),
        }
    }
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}
