//! Single-use account tokens for activation and password reset.
//!
//! The plaintext token is handed to the user (by mail) exactly once; only its
//! SHA-256 digest is stored.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::{
  error::{Error, Result},
  user::Credentials,
};

/// How long a reset link stays valid unless configured otherwise.
pub const DEFAULT_RESET_TTL_MINUTES: i64 = 120;

/// A freshly issued token and the digest to persist.
#[derive(Debug, Clone)]
pub struct AccountToken {
  pub token:  String,
  pub digest: String,
}

/// Generate a random URL-safe token.
pub fn issue_token() -> AccountToken {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  let token = URL_SAFE_NO_PAD.encode(bytes);
  let digest = digest_token(&token);
  AccountToken { token, digest }
}

/// Lowercase hex SHA-256 of `token`.
pub fn digest_token(token: &str) -> String {
  hex::encode(Sha256::digest(token.as_bytes()))
}

/// Constant-time comparison of `token`'s digest against `digest`.
pub fn token_matches(token: &str, digest: &str) -> bool {
  digest_token(token).as_bytes().ct_eq(digest.as_bytes()).into()
}

/// Check an activation link against the stored credentials.
pub fn verify_activation(credentials: &Credentials, token: &str) -> Result<()> {
  match &credentials.activation_digest {
    Some(digest) if token_matches(token, digest) => Ok(()),
    _ => Err(Error::InvalidToken),
  }
}

/// Check a reset link. A matching token older than `ttl` is
/// [`Error::TokenExpired`].
pub fn verify_reset(
  credentials: &Credentials,
  token: &str,
  now: DateTime<Utc>,
  ttl: Duration,
) -> Result<()> {
  let (Some(digest), Some(sent_at)) = (&credentials.reset_digest, credentials.reset_sent_at)
  else {
    return Err(Error::InvalidToken);
  };
  if !token_matches(token, digest) {
    return Err(Error::InvalidToken);
  }
  if now - sent_at > ttl {
    return Err(Error::TokenExpired);
  }
  Ok(())
}
