//! HTTP Basic authentication and policy enforcement.
//!
//! Credentials are `email:password`. A request without an `Authorization`
//! header has no actor; the access policy decides what that allows. A
//! request with credentials that do not match an activated account is
//! rejected outright.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use marquee_core::{
  policy::{self, AccessRequest, Decision, DenialReason},
  store::MarqueeStore,
  user::User,
};
use tracing::warn;

use crate::{AppState, error::ApiError, password::verify_password};

/// The authenticated actor, if any.
pub struct CurrentUser(pub Option<User>);

impl CurrentUser {
  pub fn actor(&self) -> Option<&User> { self.0.as_ref() }

  /// The actor, or a `NotAuthenticated` denial.
  pub fn require(&self) -> Result<&User, ApiError> {
    self
      .0
      .as_ref()
      .ok_or(ApiError::Denied(DenialReason::NotAuthenticated))
  }
}

/// Split a Basic `Authorization` header into `(email, password)`.
///
/// `Ok(None)` when the header is absent.
fn basic_credentials(headers: &HeaderMap) -> Result<Option<(String, String)>, ApiError> {
  let Some(value) = headers.get(header::AUTHORIZATION) else {
    return Ok(None);
  };
  let encoded = value
    .to_str()
    .ok()
    .and_then(|v| v.strip_prefix("Basic "))
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;
  let (email, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;

  Ok(Some((email.trim().to_lowercase(), password.to_owned())))
}

/// Resolve the request's credentials to an activated user.
pub async fn authenticate<S: MarqueeStore>(
  headers: &HeaderMap,
  store: &S,
) -> Result<Option<User>, ApiError> {
  let Some((email, password)) = basic_credentials(headers)? else {
    return Ok(None);
  };

  let user = store
    .find_user_by_email(&email)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .filter(User::is_activated);
  let Some(user) = user else {
    warn!(%email, "login failed: no activated account");
    return Err(ApiError::Unauthorized);
  };

  let hash = store
    .get_credentials(user.user_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .and_then(|c| c.password_hash);

  match hash {
    Some(hash) if verify_password(&password, &hash) => Ok(Some(user)),
    _ => {
      warn!(user_id = %user.user_id, "login failed: wrong password");
      Err(ApiError::Unauthorized)
    }
  }
}

impl<S: MarqueeStore> FromRequestParts<AppState<S>> for CurrentUser {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    Ok(CurrentUser(authenticate(&parts.headers, state.store.as_ref()).await?))
  }
}

/// Evaluate the access policy, logging denials.
pub fn authorize(req: AccessRequest<'_>) -> Result<(), ApiError> {
  match policy::evaluate(&req) {
    Decision::Allowed => Ok(()),
    Decision::Denied(reason) => {
      warn!(
        actor = ?req.actor.map(|a| a.user_id),
        subject = ?req.subject.map(|s| s.user_id),
        resource = ?req.resource,
        action = ?req.action,
        %reason,
        "access denied"
      );
      Err(ApiError::Denied(reason))
    }
  }
}

#[cfg(test)]
mod tests {
  use axum::{body::Body, http::Request};

  use super::*;
  use crate::tests::{basic, seed_user, state};
  use marquee_core::user::Rank;

  async fn extract(
    req: Request<Body>,
    state: &AppState<marquee_store_sqlite::SqliteStore>,
  ) -> Result<CurrentUser, ApiError> {
    let (mut parts, _) = req.into_parts();
    CurrentUser::from_request_parts(&mut parts, state).await
  }

  #[tokio::test]
  async fn correct_credentials() {
    let (state, _) = state().await;
    let ada = seed_user(&state, "Ada", Rank::Regular, "secret1").await;
    let req = Request::builder()
      .header(header::AUTHORIZATION, basic("ADA@example.com", "secret1"))
      .body(Body::empty())
      .unwrap();
    let user = extract(req, &state).await.unwrap();
    assert_eq!(user.actor().map(|u| u.user_id), Some(ada.user_id));
  }

  #[tokio::test]
  async fn missing_header_is_anonymous() {
    let (state, _) = state().await;
    let req = Request::builder().body(Body::empty()).unwrap();
    let user = extract(req, &state).await.unwrap();
    assert!(user.actor().is_none());
    assert!(matches!(
      user.require(),
      Err(ApiError::Denied(DenialReason::NotAuthenticated))
    ));
  }

  #[tokio::test]
  async fn wrong_password() {
    let (state, _) = state().await;
    seed_user(&state, "Ada", Rank::Regular, "secret1").await;
    let req = Request::builder()
      .header(header::AUTHORIZATION, basic("ada@example.com", "wrong"))
      .body(Body::empty())
      .unwrap();
    assert!(matches!(extract(req, &state).await, Err(ApiError::Unauthorized)));
  }

  #[tokio::test]
  async fn invalid_base64() {
    let (state, _) = state().await;
    let req = Request::builder()
      .header(header::AUTHORIZATION, "Basic !!!not-base64!!!")
      .body(Body::empty())
      .unwrap();
    assert!(matches!(extract(req, &state).await, Err(ApiError::Unauthorized)));
  }

  #[tokio::test]
  async fn unactivated_account_cannot_log_in() {
    let (state, _) = state().await;
    state
      .store
      .create_user(marquee_core::user::NewUser {
        name:              "Bea".into(),
        email:             "bea@example.com".into(),
        rank:              Rank::Regular,
        creator_id:        None,
        password_hash:     Some(crate::password::hash_password("secret1").unwrap()),
        activation_digest: None,
        activated_at:      None,
      })
      .await
      .unwrap();
    let req = Request::builder()
      .header(header::AUTHORIZATION, basic("bea@example.com", "secret1"))
      .body(Body::empty())
      .unwrap();
    assert!(matches!(extract(req, &state).await, Err(ApiError::Unauthorized)));
  }
}
