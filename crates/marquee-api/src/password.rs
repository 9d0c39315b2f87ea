//! Argon2 password hashing.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use rand_core::OsRng;

pub use argon2::password_hash::Error;

/// Hash `password` into a PHC string, e.g. `$argon2id$v=19$…`.
pub fn hash_password(password: &str) -> Result<String, Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

/// `false` for a wrong password or an unparseable hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(hash) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_then_verify() {
    let hash = hash_password("hunter22").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password("hunter22", &hash));
    assert!(!verify_password("hunter2", &hash));
  }

  #[test]
  fn whitespace_is_significant() {
    let hash = hash_password(" padded ").unwrap();
    assert!(!verify_password("padded", &hash));
  }

  #[test]
  fn garbage_hash_never_verifies() {
    assert!(!verify_password("anything", "not-a-phc-string"));
  }
}
