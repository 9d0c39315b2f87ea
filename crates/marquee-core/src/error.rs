//! Error types for `marquee-core`.

use thiserror::Error;

use crate::{policy::DenialReason, validate::ValidationErrors};

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation failed: {0}")]
  Validation(#[from] ValidationErrors),

  #[error("access denied: {0}")]
  Denied(DenialReason),

  #[error("token is invalid")]
  InvalidToken,

  #[error("token has expired")]
  TokenExpired,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
