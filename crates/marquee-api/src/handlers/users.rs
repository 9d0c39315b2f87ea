//! Handlers for `/users` and `/me`.
//!
//! | Method   | Path          | Policy |
//! |----------|---------------|--------|
//! | `GET`    | `/me`         | authenticated |
//! | `GET`    | `/users`      | admin or super-admin; visibility-filtered |
//! | `POST`   | `/users`      | admin or super-admin; sends an activation mail |
//! | `GET`    | `/users/{id}` | authenticated |
//! | `PATCH`  | `/users/{id}` | the user themself |
//! | `DELETE` | `/users/{id}` | actor outranks the user |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use marquee_core::{
  account::issue_token,
  policy::{AccessRequest, Action, Resource},
  store::{MarqueeStore, Page, UserQuery},
  user::{InvitationForm, NewUser, ProfileChanges, ProfileForm, Rank, User},
  validate::ValidationErrors,
};
use tracing::info;
use uuid::Uuid;

use super::{Body, PageParams, body};
use crate::{
  AppState,
  auth::{CurrentUser, authorize},
  error::ApiError,
  mailer::{Mail, MailKind},
  password::hash_password,
};

fn email_taken() -> ApiError {
  ApiError::Validation(ValidationErrors::single("email", "has already been taken"))
}

pub(crate) fn missing(id: Uuid) -> ApiError { ApiError::NotFound(format!("user {id} not found")) }

/// The user a request acts on. `None` is handed to the policy as an absent
/// subject, which denies everything that needs one.
pub(crate) async fn find_subject<S: MarqueeStore>(
  store: &S,
  id: Uuid,
) -> Result<Option<User>, ApiError> {
  store.get_user(id).await.map_err(|e| ApiError::Store(Box::new(e)))
}

// ─── Me ──────────────────────────────────────────────────────────────────────

/// `GET /me`
pub async fn me<S: MarqueeStore>(current: CurrentUser) -> Result<Json<User>, ApiError> {
  Ok(Json(current.require()?.clone()))
}

// ─── Index ───────────────────────────────────────────────────────────────────

/// `GET /users[?page=N]`
pub async fn index<S: MarqueeStore>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Query(params): Query<PageParams>,
) -> Result<Json<Page<User>>, ApiError> {
  authorize(AccessRequest::new(current.actor(), Resource::User, Action::ViewIndex))?;
  let actor = current.require()?;

  let page = state
    .store
    .list_users(UserQuery {
      visible_to: Some((actor.user_id, actor.rank)),
      page:       params.request(&state.config),
    })
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(page))
}

// ─── Invite ──────────────────────────────────────────────────────────────────

/// `POST /users`: body `{"name": "...", "email": "..."}`
pub async fn create<S: MarqueeStore>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  form: Body<InvitationForm>,
) -> Result<impl IntoResponse, ApiError> {
  authorize(AccessRequest::new(current.actor(), Resource::User, Action::Create))?;
  let actor = current.require()?;
  let invitation = body(form)?.parse()?;

  let taken = state
    .store
    .find_user_by_email(&invitation.email)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  if taken.is_some() {
    return Err(email_taken());
  }

  let token = issue_token();
  let user = state
    .store
    .create_user(NewUser {
      name:              invitation.name,
      email:             invitation.email,
      rank:              Rank::Regular,
      creator_id:        Some(actor.user_id),
      password_hash:     None,
      activation_digest: Some(token.digest),
      activated_at:      None,
    })
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(email_taken)?;

  state.mailer.send(Mail {
    kind:  MailKind::Activation,
    to:    user.email.clone(),
    name:  user.name.clone(),
    link:  state.config.link(&format!("/account_activations/{}", token.token)),
    token: token.token,
  });
  info!(user_id = %user.user_id, actor = %actor.user_id, "user invited");

  Ok((StatusCode::CREATED, Json(user)))
}

// ─── Show ────────────────────────────────────────────────────────────────────

/// `GET /users/{id}`
pub async fn show<S: MarqueeStore>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
  let subject = find_subject(state.store.as_ref(), id).await?;
  authorize(
    AccessRequest::new(current.actor(), Resource::User, Action::ViewShow).on(subject.as_ref()),
  )?;
  Ok(Json(subject.ok_or_else(|| missing(id))?))
}

// ─── Profile update ──────────────────────────────────────────────────────────

/// `PATCH /users/{id}`: name, email, and optionally a new password.
pub async fn update<S: MarqueeStore>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Path(id): Path<Uuid>,
  form: Body<ProfileForm>,
) -> Result<Json<User>, ApiError> {
  let subject = find_subject(state.store.as_ref(), id).await?;
  authorize(
    AccessRequest::new(current.actor(), Resource::User, Action::Update).on(subject.as_ref()),
  )?;
  let subject = subject.ok_or_else(|| missing(id))?;
  let edit = body(form)?.parse()?;

  if edit.email != subject.email {
    let taken = state
      .store
      .find_user_by_email(&edit.email)
      .await
      .map_err(|e| ApiError::Store(Box::new(e)))?;
    if taken.is_some() {
      return Err(email_taken());
    }
  }

  let password_hash = edit
    .password
    .as_deref()
    .map(hash_password)
    .transpose()
    .map_err(|e| ApiError::Internal(e.to_string()))?;

  let user = state
    .store
    .update_profile(id, ProfileChanges {
      name: edit.name,
      email: edit.email,
      password_hash,
      updater_id: subject.user_id,
    })
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| missing(id))?;

  info!(user_id = %id, "profile updated");
  Ok(Json(user))
}

// ─── Destroy ─────────────────────────────────────────────────────────────────

/// `DELETE /users/{id}`
pub async fn destroy<S: MarqueeStore>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  let subject = find_subject(state.store.as_ref(), id).await?;
  authorize(
    AccessRequest::new(current.actor(), Resource::User, Action::Destroy).on(subject.as_ref()),
  )?;
  let actor = current.require()?;

  let deleted = state
    .store
    .delete_user(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  if !deleted {
    return Err(missing(id));
  }

  info!(user_id = %id, actor = %actor.user_id, "user deleted");
  Ok(StatusCode::NO_CONTENT)
}
