//! Handlers for `/productions`.
//!
//! A production's theatre is given by name in `theatre_attributes`; an
//! unknown name creates the theatre, attributed to the acting user.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use marquee_core::{
  listing,
  policy::{AccessRequest, Action, Resource},
  production::{Production, ProductionForm, ProductionView},
  store::{MarqueeStore, Page},
};
use tracing::info;
use uuid::Uuid;

use super::{Body, PageParams, body};
use crate::{
  AppState,
  auth::{CurrentUser, authorize},
  error::ApiError,
};

fn missing(id: Uuid) -> ApiError { ApiError::NotFound(format!("production {id} not found")) }

/// `GET /productions[?page=N]`
pub async fn index<S: MarqueeStore>(
  State(state): State<AppState<S>>,
  Query(params): Query<PageParams>,
) -> Result<Json<Page<Production>>, ApiError> {
  let page = state
    .store
    .list_productions(params.request(&state.config))
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(page))
}

/// `POST /productions`
pub async fn create<S: MarqueeStore>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  form: Body<ProductionForm>,
) -> Result<impl IntoResponse, ApiError> {
  authorize(AccessRequest::new(current.actor(), Resource::Production, Action::Create))?;
  let actor = current.require()?;
  let draft = body(form)?.parse_new()?;

  let view = listing::create_production(state.store.as_ref(), actor, draft)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok((StatusCode::CREATED, Json(view)))
}

/// `GET /productions/{id}`
pub async fn show<S: MarqueeStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ProductionView>, ApiError> {
  let production = state
    .store
    .get_production(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| missing(id))?;
  let view = listing::view_production(state.store.as_ref(), production)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| missing(id))?;
  Ok(Json(view))
}

/// `PATCH /productions/{id}`
pub async fn update<S: MarqueeStore>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Path(id): Path<Uuid>,
  form: Body<ProductionForm>,
) -> Result<Json<ProductionView>, ApiError> {
  authorize(AccessRequest::new(current.actor(), Resource::Production, Action::Update))?;
  let actor = current.require()?;
  let draft = body(form)?.parse_changes()?;

  let view = listing::update_production(state.store.as_ref(), actor, id, draft)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| missing(id))?;
  Ok(Json(view))
}

/// `DELETE /productions/{id}`. The theatre is kept.
pub async fn destroy<S: MarqueeStore>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  authorize(AccessRequest::new(current.actor(), Resource::Production, Action::Destroy))?;
  let actor = current.require()?;

  let deleted = state
    .store
    .delete_production(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  if !deleted {
    return Err(missing(id));
  }

  info!(production_id = %id, actor = %actor.user_id, "production deleted");
  Ok(StatusCode::NO_CONTENT)
}
