//! Field-level validation shared by every validated input type.
//!
//! Input structs are parsed into validated values at the HTTP boundary; a
//! failed parse yields [`ValidationErrors`], which the API renders as a list
//! of `{field, message}` pairs.

use std::fmt;

use serde::Serialize;

pub const NAME_MAX_LEN: usize = 50;
pub const EMAIL_MAX_LEN: usize = 255;
pub const PASSWORD_MIN_LEN: usize = 6;

/// A single failed rule on a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
  pub field:   String,
  pub message: String,
}

/// Every rule that failed while parsing one input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
  errors: Vec<FieldError>,
}

impl ValidationErrors {
  pub fn new() -> Self { Self::default() }

  pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
    let mut errors = Self::new();
    errors.add(field, message);
    errors
  }

  pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
    self.errors.push(FieldError {
      field:   field.into(),
      message: message.into(),
    });
  }

  pub fn is_empty(&self) -> bool { self.errors.is_empty() }

  pub fn errors(&self) -> &[FieldError] { &self.errors }

  /// Messages recorded against `field`.
  pub fn on<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    self
      .errors
      .iter()
      .filter(move |e| e.field == field)
      .map(|e| e.message.as_str())
  }

  pub fn has(&self, field: &str) -> bool { self.on(field).next().is_some() }

  /// `Ok(value)` when nothing failed, otherwise `Err(self)`.
  pub fn finish<T>(self, value: T) -> Result<T, Self> {
    if self.is_empty() { Ok(value) } else { Err(self) }
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, e) in self.errors.iter().enumerate() {
      if i > 0 {
        f.write_str("; ")?;
      }
      write!(f, "{} {}", e.field, e.message)?;
    }
    Ok(())
  }
}

impl std::error::Error for ValidationErrors {}

// ─── Rules ───────────────────────────────────────────────────────────────────

/// Required text, trimmed.
pub fn required(errors: &mut ValidationErrors, field: &str, value: &str) -> String {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    errors.add(field, "can't be blank");
  }
  trimmed.to_owned()
}

/// Optional free text: surrounding whitespace dropped, empty becomes `None`.
pub fn optional(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
}

/// A person's display name.
pub fn name(errors: &mut ValidationErrors, field: &str, value: &str) -> String {
  let name = required(errors, field, value);
  if name.chars().count() > NAME_MAX_LEN {
    errors.add(field, format!("is too long (maximum is {NAME_MAX_LEN} characters)"));
  }
  name
}

/// An email address; returned lowercased.
pub fn email(errors: &mut ValidationErrors, field: &str, value: &str) -> String {
  let email = required(errors, field, value).to_lowercase();
  if email.is_empty() {
    return email;
  }
  if email.len() > EMAIL_MAX_LEN {
    errors.add(field, format!("is too long (maximum is {EMAIL_MAX_LEN} characters)"));
  }
  if !is_email_shaped(&email) {
    errors.add(field, "is invalid");
  }
  email
}

/// A new password and its confirmation. Whitespace is significant and kept.
pub fn password(
  errors: &mut ValidationErrors,
  password: &str,
  confirmation: &str,
) {
  if password.trim().is_empty() {
    errors.add("password", "can't be blank");
  } else if password.chars().count() < PASSWORD_MIN_LEN {
    errors.add(
      "password",
      format!("is too short (minimum is {PASSWORD_MIN_LEN} characters)"),
    );
  }
  if password != confirmation {
    errors.add("password_confirmation", "doesn't match password");
  }
}

/// `local@label.label`, where the final label is alphabetic.
fn is_email_shaped(email: &str) -> bool {
  let Some((local, domain)) = email.split_once('@') else {
    return false;
  };
  let local_ok = !local.is_empty()
    && local
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-' | '.'));

  let labels: Vec<&str> = domain.split('.').collect();
  let domain_ok = labels.len() >= 2
    && labels.iter().all(|l| {
      !l.is_empty() && l.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
    && labels
      .last()
      .is_some_and(|tld| tld.chars().all(|c| c.is_ascii_alphabetic()));

  local_ok && domain_ok
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blank_required_field_is_reported() {
    let mut errors = ValidationErrors::new();
    let value = required(&mut errors, "title", "   ");
    assert_eq!(value, "");
    assert_eq!(errors.on("title").collect::<Vec<_>>(), ["can't be blank"]);
  }

  #[test]
  fn email_is_lowercased_and_checked() {
    let mut errors = ValidationErrors::new();
    assert_eq!(email(&mut errors, "email", " Ada@Example.COM "), "ada@example.com");
    assert!(errors.is_empty());

    for bad in ["ada", "ada@", "@example.com", "ada@example", "ada@example.c0m", "a b@example.com"] {
      let mut errors = ValidationErrors::new();
      email(&mut errors, "email", bad);
      assert!(errors.has("email"), "accepted {bad:?}");
    }
  }

  #[test]
  fn long_name_is_rejected() {
    let mut errors = ValidationErrors::new();
    name(&mut errors, "name", &"x".repeat(NAME_MAX_LEN + 1));
    assert!(errors.has("name"));
  }

  #[test]
  fn password_rules() {
    let mut errors = ValidationErrors::new();
    password(&mut errors, "foo", "foo");
    assert!(errors.has("password"));

    let mut errors = ValidationErrors::new();
    password(&mut errors, "foobar", "barfoo");
    assert!(errors.has("password_confirmation"));
    assert!(!errors.has("password"));

    let mut errors = ValidationErrors::new();
    password(&mut errors, " foobar ", " foobar ");
    assert!(errors.is_empty());
  }

  #[test]
  fn serialises_as_a_flat_list() {
    let errors = ValidationErrors::single("theatre.name", "can't be blank");
    let json = serde_json::to_value(&errors).unwrap();
    assert_eq!(
      json,
      serde_json::json!([{ "field": "theatre.name", "message": "can't be blank" }])
    );
    assert_eq!(errors.to_string(), "theatre.name can't be blank");
  }
}
