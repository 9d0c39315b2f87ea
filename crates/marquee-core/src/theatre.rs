//! Theatres: venues identified by their name, shared by many productions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validate::{self, ValidationErrors};

/// A stored theatre. `name` is unique across all theatres.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theatre {
  pub theatre_id: Uuid,
  pub name:       String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  /// Set once at creation; never overwritten when the theatre is reused.
  pub creator_id: Option<Uuid>,
  pub updater_id: Option<Uuid>,
}

/// A theatre to claim by name, through
/// [`crate::store::TheatreStore::claim_theatre`] or as part of a production
/// write. The creator is also recorded as the first updater.
#[derive(Debug, Clone)]
pub struct NewTheatre {
  pub name:       String,
  pub creator_id: Uuid,
}

/// Outcome of claiming a [`NewTheatre`].
#[derive(Debug, Clone)]
pub enum TheatreClaim {
  /// No theatre had the name; this row was inserted.
  Created(Theatre),
  /// The name was already taken; that row is returned untouched.
  Existing(Theatre),
}

impl TheatreClaim {
  pub fn into_parts(self) -> (Theatre, bool) {
    match self {
      Self::Created(t) => (t, true),
      Self::Existing(t) => (t, false),
    }
  }
}

/// The nested `theatre_attributes` block of a production submission, as
/// received.
#[derive(Debug, Clone, Deserialize)]
pub struct TheatreForm {
  pub name: String,
}

/// Validated nested attributes: a non-blank theatre name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TheatreAttributes {
  name: String,
}

impl TheatreAttributes {
  /// Validate a name submitted nested under a production.
  pub fn parse(name: &str) -> Result<Self, ValidationErrors> {
    Self::parse_field("theatre.name", name)
  }

  /// Validate a name submitted directly on a theatre.
  pub fn parse_field(field: &str, name: &str) -> Result<Self, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let name = validate::required(&mut errors, field, name);
    errors.finish(Self { name })
  }

  pub fn name(&self) -> &str { &self.name }
}

impl TryFrom<TheatreForm> for TheatreAttributes {
  type Error = ValidationErrors;

  fn try_from(form: TheatreForm) -> Result<Self, Self::Error> { Self::parse(&form.name) }
}

/// Body of `PATCH /theatres/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RenameTheatreForm {
  pub name: String,
}

impl RenameTheatreForm {
  pub fn parse(self) -> Result<TheatreAttributes, ValidationErrors> {
    TheatreAttributes::parse_field("name", &self.name)
  }
}
