use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::validation::{validate_body, ErrorKind, Validate, ValidationErrors};

/// JSON body that has been checked field by field and then deserialized.
///
/// Syntax errors, absent or mistyped fields and rule violations are all
/// answered with the structured 422 list, so handlers only ever see
/// well-formed input.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + Send,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<Value>::from_request(req, state)
            .await
            .map_err(reject_json)?;
        if let Err(errors) = validate_body::<T>(&body) {
            debug!(count = errors.0.len(), "request body failed validation");
            return Err(errors.into_response());
        }
        let value = serde_json::from_value::<T>(body).map_err(|e| {
            debug!(error = %e, "validated body did not deserialize");
            body_error(ErrorKind::ValueError, e.to_string())
        })?;
        Ok(ValidatedJson(value))
    }
}

fn body_error(kind: ErrorKind, message: String) -> Response {
    ValidationErrors::single(vec!["body".to_string()], kind, message).into_response()
}

fn reject_json(rejection: JsonRejection) -> Response {
    let message = rejection.body_text();
    let kind = match rejection {
        JsonRejection::JsonDataError(_) => ErrorKind::ValueError,
        JsonRejection::JsonSyntaxError(_) => ErrorKind::JsonInvalid,
        // Wrong content type or unreadable body: not a field problem.
        _ => return rejection.into_response(),
    };
    debug!(error = %message, "request body rejected");
    body_error(kind, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::dto::SignupRequest;
    use axum::{
        body::{to_bytes, Body},
        http::StatusCode,
    };

    async fn extract(content_type: &str, body: &'static str) -> Result<SignupRequest, Response> {
        let req = Request::builder()
            .method("POST")
            .uri("/auth/signup")
            .header("content-type", content_type)
            .body(Body::from(body))
            .unwrap();
        ValidatedJson::<SignupRequest>::from_request(req, &())
            .await
            .map(|v| v.0)
    }

    #[tokio::test]
    async fn accepts_valid_body() {
        let req = extract(
            "application/json",
            r#"{"username":"abc","email":"a@example.com","password":"ValidPass123"}"#,
        )
        .await
        .unwrap();
        assert_eq!(req.username, "abc");
    }

    async fn errors(res: Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_field_is_unprocessable() {
        let res = extract("application/json", r#"{"username":"abc"}"#)
            .await
            .unwrap_err();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = errors(res).await;
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert_eq!(body[0]["location"], serde_json::json!(["body", "email"]));
        assert_eq!(body[0]["type"], "missing");
        assert_eq!(body[1]["location"], serde_json::json!(["body", "password"]));
        assert_eq!(body[1]["type"], "missing");
    }

    #[tokio::test]
    async fn wrong_field_type_is_reported_at_that_field() {
        let res = extract(
            "application/json",
            r#"{"username":"ab","email":"a@example.com","password":123}"#,
        )
        .await
        .unwrap_err();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = errors(res).await;
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert_eq!(body[0]["location"], serde_json::json!(["body", "username"]));
        assert_eq!(body[0]["type"], "string_too_short");
        assert_eq!(body[1]["location"], serde_json::json!(["body", "password"]));
        assert_eq!(body[1]["type"], "value_error");
    }

    #[tokio::test]
    async fn non_object_body_is_unprocessable() {
        let res = extract("application/json", "[1, 2]").await.unwrap_err();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = errors(res).await;
        assert_eq!(body[0]["location"], serde_json::json!(["body"]));
        assert_eq!(body[0]["type"], "value_error");
    }

    #[tokio::test]
    async fn syntax_error_is_unprocessable() {
        let res = extract("application/json", r#"{"username":"#)
            .await
            .unwrap_err();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(errors(res).await[0]["type"], "json_invalid");
    }

    #[tokio::test]
    async fn rule_violation_is_unprocessable() {
        let res = extract(
            "application/json",
            r#"{"username":"---","email":"a@example.com","password":"ValidPass123"}"#,
        )
        .await
        .unwrap_err();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn wrong_content_type_keeps_axum_status() {
        let res = extract("text/plain", "{}").await.unwrap_err();
        assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }
}
