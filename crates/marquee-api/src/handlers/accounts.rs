//! Account activation and password reset.
//!
//! Neither flow requires authentication: possession of the mailed token is
//! the credential.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use marquee_core::{
  account::{issue_token, verify_activation, verify_reset},
  store::MarqueeStore,
  user::{Credentials, PasswordForm, User},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{
  AppState,
  error::ApiError,
  mailer::{Mail, MailKind},
  password::hash_password,
};

async fn user_with_credentials<S: MarqueeStore>(
  store: &S,
  email: &str,
) -> Result<Option<(User, Credentials)>, ApiError> {
  let Some(user) = store
    .find_user_by_email(email)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
  else {
    return Ok(None);
  };
  let credentials = store
    .get_credentials(user.user_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .unwrap_or_default();
  Ok(Some((user, credentials)))
}

// ─── Activation ──────────────────────────────────────────────────────────────

/// `POST /account_activations/{token}`: body `{"email", "password",
/// "password_confirmation"}`
pub async fn activate<S: MarqueeStore>(
  State(state): State<AppState<S>>,
  Path(token): Path<String>,
  Json(form): Json<PasswordForm>,
) -> Result<Json<User>, ApiError> {
  let found = user_with_credentials(state.store.as_ref(), &form.normalised_email()).await?;
  let Some((user, credentials)) = found.filter(|(u, _)| !u.is_activated()) else {
    warn!("activation attempted for unknown or active account");
    return Err(ApiError::NotFound("activation link is invalid".to_string()));
  };
  verify_activation(&credentials, &token)
    .map_err(|_| ApiError::NotFound("activation link is invalid".to_string()))?;

  let password = form.parse_password()?;
  let hash = hash_password(&password).map_err(|e| ApiError::Internal(e.to_string()))?;

  let user = state
    .store
    .activate_user(user.user_id, hash)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound("activation link is invalid".to_string()))?;

  info!(user_id = %user.user_id, "account activated");
  Ok(Json(user))
}

// ─── Password reset ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ResetRequestBody {
  pub email: String,
}

/// `POST /password_resets`: body `{"email": "..."}`
pub async fn request_reset<S: MarqueeStore>(
  State(state): State<AppState<S>>,
  Json(body): Json<ResetRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
  let email = body.email.trim().to_lowercase();
  let user = state
    .store
    .find_user_by_email(&email)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound("email address not found".to_string()))?;
  if !user.is_activated() {
    return Err(ApiError::BadRequest("account not yet activated".to_string()));
  }

  let token = issue_token();
  let stored = state
    .store
    .set_reset_digest(user.user_id, token.digest)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  if !stored {
    return Err(ApiError::NotFound("email address not found".to_string()));
  }

  state.mailer.send(Mail {
    kind:  MailKind::PasswordReset,
    to:    user.email.clone(),
    name:  user.name.clone(),
    link:  state.config.link(&format!("/password_resets/{}", token.token)),
    token: token.token,
  });
  info!(user_id = %user.user_id, "password reset requested");

  Ok((
    StatusCode::ACCEPTED,
    Json(json!({ "message": "email sent with password reset instructions" })),
  ))
}

/// `PATCH /password_resets/{token}`: body `{"email", "password",
/// "password_confirmation"}`
pub async fn reset<S: MarqueeStore>(
  State(state): State<AppState<S>>,
  Path(token): Path<String>,
  Json(form): Json<PasswordForm>,
) -> Result<Json<User>, ApiError> {
  let found = user_with_credentials(state.store.as_ref(), &form.normalised_email()).await?;
  let Some((user, credentials)) = found.filter(|(u, _)| u.is_activated()) else {
    return Err(ApiError::NotFound("password reset link is invalid".to_string()));
  };
  verify_reset(&credentials, &token, Utc::now(), state.config.reset_ttl())?;

  let password = form.parse_password()?;
  let hash = hash_password(&password).map_err(|e| ApiError::Internal(e.to_string()))?;

  let user = state
    .store
    .reset_password(user.user_id, hash)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound("password reset link is invalid".to_string()))?;

  info!(user_id = %user.user_id, "password reset");
  Ok(Json(user))
}
