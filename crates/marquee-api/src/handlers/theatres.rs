//! Handlers for `/theatres`.
//!
//! Theatres are created only through production submissions; this module
//! lists, shows, renames and deletes them.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use marquee_core::{
  policy::{AccessRequest, Action, Resource},
  production::Production,
  store::{MarqueeStore, Page},
  theatre::{RenameTheatreForm, Theatre},
  validate::ValidationErrors,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::{Body, PageParams, body};
use crate::{
  AppState,
  auth::{CurrentUser, authorize},
  error::ApiError,
};

fn missing(id: Uuid) -> ApiError { ApiError::NotFound(format!("theatre {id} not found")) }

/// A theatre with the productions staged there.
#[derive(Debug, Serialize)]
pub struct TheatreView {
  #[serde(flatten)]
  pub theatre:     Theatre,
  pub productions: Vec<Production>,
}

/// `GET /theatres[?page=N]`
pub async fn index<S: MarqueeStore>(
  State(state): State<AppState<S>>,
  Query(params): Query<PageParams>,
) -> Result<Json<Page<Theatre>>, ApiError> {
  let page = state
    .store
    .list_theatres(params.request(&state.config))
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(page))
}

/// `GET /theatres/{id}`
pub async fn show<S: MarqueeStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<TheatreView>, ApiError> {
  let theatre = state
    .store
    .get_theatre(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| missing(id))?;
  let productions = state
    .store
    .theatre_productions(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(TheatreView { theatre, productions }))
}

/// `PATCH /theatres/{id}`: body `{"name": "..."}`
pub async fn update<S: MarqueeStore>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Path(id): Path<Uuid>,
  form: Body<RenameTheatreForm>,
) -> Result<Json<Theatre>, ApiError> {
  authorize(AccessRequest::new(current.actor(), Resource::Theatre, Action::Update))?;
  let actor = current.require()?;
  let attrs = body(form)?.parse()?;

  let holder = state
    .store
    .find_theatre_by_name(attrs.name())
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  if holder.is_some_and(|t| t.theatre_id != id) {
    return Err(ApiError::Validation(ValidationErrors::single(
      "name",
      "has already been taken",
    )));
  }

  let theatre = state
    .store
    .rename_theatre(id, attrs, actor.user_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| missing(id))?;

  info!(theatre_id = %id, actor = %actor.user_id, name = %theatre.name, "theatre renamed");
  Ok(Json(theatre))
}

/// `DELETE /theatres/{id}`. Refused while a production references it.
pub async fn destroy<S: MarqueeStore>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  authorize(AccessRequest::new(current.actor(), Resource::Theatre, Action::Destroy))?;
  let actor = current.require()?;

  let staged = state
    .store
    .theatre_productions(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  if !staged.is_empty() {
    return Err(ApiError::Conflict(format!(
      "theatre {id} is still used by {} production(s)",
      staged.len()
    )));
  }

  let deleted = state
    .store
    .delete_theatre(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  if !deleted {
    return Err(missing(id));
  }

  info!(theatre_id = %id, actor = %actor.user_id, "theatre deleted");
  Ok(StatusCode::NO_CONTENT)
}
