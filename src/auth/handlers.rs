use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::instrument;

use crate::{
    auth::{
        dto::{SignupRequest, UserResponse},
        extractors::ValidatedJson,
        services::{register_user, RegistrationError},
        validation::normalize_email,
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/auth/signup", post(signup))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(mut payload): ValidatedJson<SignupRequest>,
) -> Result<(StatusCode, Json<UserResponse>), RegistrationError> {
    payload.email = normalize_email(&payload.email);

    let user = register_user(state.store.as_ref(), &state.hasher, payload).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}
