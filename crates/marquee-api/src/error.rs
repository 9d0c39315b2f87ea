//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use marquee_core::{policy::DenialReason, validate::ValidationErrors};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Credentials were supplied but did not match an activated account.
  #[error("invalid credentials")]
  Unauthorized,

  #[error("access denied: {0}")]
  Denied(DenialReason),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("gone: {0}")]
  Gone(String),

  #[error("validation failed: {0}")]
  Validation(#[from] ValidationErrors),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The request body could not be read as the expected JSON.
  #[error("malformed body: {0}")]
  Body(#[from] JsonRejection),

  #[error("internal error: {0}")]
  Internal(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<marquee_core::Error> for ApiError {
  fn from(e: marquee_core::Error) -> Self {
    use marquee_core::Error;
    match e {
      Error::Validation(errors) => Self::Validation(errors),
      Error::Denied(reason) => Self::Denied(reason),
      Error::InvalidToken => Self::NotFound("token not found".to_string()),
      Error::TokenExpired => Self::Gone("password reset token has expired".to_string()),
    }
  }
}

fn challenge(mut res: Response) -> Response {
  res.headers_mut().insert(
    header::WWW_AUTHENTICATE,
    HeaderValue::from_static("Basic realm=\"marquee\""),
  );
  res
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::Unauthorized => challenge(
        (StatusCode::UNAUTHORIZED, Json(json!({ "error": "invalid credentials" })))
          .into_response(),
      ),
      ApiError::Denied(reason) => {
        let body = Json(json!({
          "error":    reason,
          "message":  reason.message(),
          "redirect": reason.redirect().path(),
        }));
        if reason == DenialReason::NotAuthenticated {
          challenge((StatusCode::UNAUTHORIZED, body).into_response())
        } else {
          (StatusCode::FORBIDDEN, body).into_response()
        }
      }
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, Json(json!({ "error": m }))).into_response(),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, Json(json!({ "error": m }))).into_response(),
      ApiError::Gone(m) => (StatusCode::GONE, Json(json!({ "error": m }))).into_response(),
      ApiError::Validation(errors) => (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "error": "validation failed", "errors": errors })),
      )
        .into_response(),
      ApiError::BadRequest(m) => {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": m }))).into_response()
      }
      ApiError::Body(rejection) => {
        (rejection.status(), Json(json!({ "error": rejection.body_text() }))).into_response()
      }
      ApiError::Internal(m) => {
        error!(error = %m, "internal error");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "internal error" })))
          .into_response()
      }
      ApiError::Store(e) => {
        error!(error = %e, "store error");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() })))
          .into_response()
      }
    }
  }
}
