use anyhow::Context;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::auth::{
    dto::SignupRequest,
    password::CredentialHasher,
    repo::{StoreError, UserStore},
    repo_types::User,
};

/// Why a registration was refused. The display strings are the client-facing
/// `detail` messages.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Username already registered")]
    DuplicateUsername,
    #[error("Email already registered")]
    DuplicateEmail,
    /// Lost an insert race: the pre-checks passed but a unique index fired.
    #[error("Username or email already registered")]
    DuplicateCredential,
    #[error("An error occurred while creating the user")]
    Internal(#[source] anyhow::Error),
}

impl RegistrationError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::DuplicateUsername | Self::DuplicateEmail | Self::DuplicateCredential => {
                StatusCode::BAD_REQUEST
            }
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for RegistrationError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UniqueViolation(_) => RegistrationError::DuplicateCredential,
            StoreError::Database(_) => RegistrationError::Internal(e.into()),
        }
    }
}

impl IntoResponse for RegistrationError {
    fn into_response(self) -> Response {
        if let Self::Internal(cause) = &self {
            error!(error = ?cause, "registration failed");
        }
        (self.status(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// Check uniqueness, hash the password and persist the new user.
///
/// The username/email pre-checks give precise errors in the common case. Two
/// concurrent requests can both pass them; the loser is then caught by the
/// store's unique indexes and gets [`RegistrationError::DuplicateCredential`].
#[instrument(skip(store, hasher, request), fields(username = %request.username))]
pub async fn register_user(
    store: &dyn UserStore,
    hasher: &CredentialHasher,
    request: SignupRequest,
) -> Result<User, RegistrationError> {
    let lookup = |e: StoreError| RegistrationError::Internal(anyhow::Error::new(e).context("lookup"));

    if store
        .find_by_username(&request.username)
        .await
        .map_err(lookup)?
        .is_some()
    {
        warn!("username already registered");
        return Err(RegistrationError::DuplicateUsername);
    }

    if store
        .find_by_email(&request.email)
        .await
        .map_err(lookup)?
        .is_some()
    {
        warn!("email already registered");
        return Err(RegistrationError::DuplicateEmail);
    }

    let hasher = *hasher;
    let password = request.password;
    let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .context("hashing task panicked")
        .and_then(|r| r)
        .map_err(RegistrationError::Internal)?;

    let user = store
        .create(&request.username, &request.email, &password_hash)
        .await
        .map_err(|e| {
            if let StoreError::UniqueViolation(constraint) = &e {
                warn!(%constraint, "lost registration race");
            }
            RegistrationError::from(e)
        })?;

    info!(user_id = %user.id, "user registered");
    Ok(user)
}
