//! Route handlers, one module per resource.

pub mod accounts;
pub mod admin_status;
pub mod productions;
pub mod theatres;
pub mod users;

use axum::{Json, extract::rejection::JsonRejection};
use marquee_core::store::PageRequest;
use serde::Deserialize;

use crate::{config::ServerConfig, error::ApiError};

/// `?page=N`, 1-based.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
  pub page: Option<u32>,
}

impl PageParams {
  pub fn request(&self, config: &ServerConfig) -> PageRequest {
    PageRequest::new(self.page.unwrap_or(1), config.per_page)
  }
}

/// A JSON body that is only inspected once the request has been authorized,
/// so a malformed body never masks a denial.
pub type Body<T> = Result<Json<T>, JsonRejection>;

pub fn body<T>(body: Body<T>) -> Result<T, ApiError> {
  let Json(value) = body?;
  Ok(value)
}

/// Fallback for unknown routes.
pub async fn not_found() -> ApiError { ApiError::NotFound("no such route".to_string()) }
