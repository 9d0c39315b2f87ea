//! Handlers for `/users/{id}/admin_status`.
//!
//! Both routes are gated by the outranks rule: the actor must hold a strictly
//! higher rank than the subject, and super-admins cannot act on each other.

use axum::{
  Json,
  extract::{Path, State},
};
use marquee_core::{
  policy::{AccessRequest, Action, Resource},
  store::MarqueeStore,
  user::{ASSIGNABLE_RANKS, AdminStatusForm, Rank, User},
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::{
  Body, body,
  users::{find_subject, missing},
};
use crate::{
  AppState,
  auth::{CurrentUser, authorize},
  error::ApiError,
};

#[derive(Debug, Serialize)]
pub struct AdminStatus {
  pub user_id:          Uuid,
  pub rank:             Rank,
  pub rank_assigned_by: Option<Uuid>,
  pub assignable:       &'static [Rank],
}

impl From<&User> for AdminStatus {
  fn from(user: &User) -> Self {
    Self {
      user_id:          user.user_id,
      rank:             user.rank,
      rank_assigned_by: user.rank_assigned_by,
      assignable:       &ASSIGNABLE_RANKS,
    }
  }
}

/// `GET /users/{id}/admin_status`
pub async fn edit<S: MarqueeStore>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<AdminStatus>, ApiError> {
  let subject = find_subject(state.store.as_ref(), id).await?;
  authorize(
    AccessRequest::new(current.actor(), Resource::User, Action::EditAdminStatus)
      .on(subject.as_ref()),
  )?;
  let subject = subject.ok_or_else(|| missing(id))?;
  Ok(Json(AdminStatus::from(&subject)))
}

/// `PATCH /users/{id}/admin_status`: body `{"rank": "regular" | "admin"}`
pub async fn update<S: MarqueeStore>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Path(id): Path<Uuid>,
  form: Body<AdminStatusForm>,
) -> Result<Json<AdminStatus>, ApiError> {
  let subject = find_subject(state.store.as_ref(), id).await?;
  authorize(
    AccessRequest::new(current.actor(), Resource::User, Action::UpdateAdminStatus)
      .on(subject.as_ref()),
  )?;
  let subject = subject.ok_or_else(|| missing(id))?;
  let actor = current.require()?;
  let rank = body(form)?.parse()?;

  let user = state
    .store
    .set_rank(id, rank, actor.user_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| missing(id))?;

  info!(user_id = %id, actor = %actor.user_id, from = ?subject.rank, to = ?rank, "rank changed");
  Ok(Json(AdminStatus::from(&user)))
}
