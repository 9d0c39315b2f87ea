//! User accounts: rank, suspension, activation, and attribution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validate::{self, ValidationErrors};

// ─── Rank ────────────────────────────────────────────────────────────────────

/// Total order used for admin-status decisions:
/// `Regular < Admin < SuperAdmin`.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
  #[default]
  Regular,
  Admin,
  SuperAdmin,
}

impl Rank {
  /// Numeric level stored in the database; preserves the ordering.
  pub fn level(self) -> i64 {
    match self {
      Self::Regular => 0,
      Self::Admin => 1,
      Self::SuperAdmin => 2,
    }
  }

  pub fn from_level(level: i64) -> Option<Self> {
    match level {
      0 => Some(Self::Regular),
      1 => Some(Self::Admin),
      2 => Some(Self::SuperAdmin),
      _ => None,
    }
  }

  /// Admins and super-admins manage user accounts.
  pub fn is_manager(self) -> bool { self >= Self::Admin }
}

/// Ranks that can be set through the admin-status update. Super-admin is
/// never granted over HTTP.
pub const ASSIGNABLE_RANKS: [Rank; 2] = [Rank::Regular, Rank::Admin];

// ─── User ────────────────────────────────────────────────────────────────────

/// The public view of an account. Secrets live in [`Credentials`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:          Uuid,
  pub name:             String,
  /// Always stored lowercased.
  pub email:            String,
  pub rank:             Rank,
  /// Independent of rank; a super-admin can be suspended.
  pub suspended:        bool,
  pub activated_at:     Option<DateTime<Utc>>,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
  pub creator_id:       Option<Uuid>,
  pub updater_id:       Option<Uuid>,
  /// The actor who last changed `rank`.
  pub rank_assigned_by: Option<Uuid>,
}

impl User {
  pub fn is_activated(&self) -> bool { self.activated_at.is_some() }
}

/// Secret columns of a user row.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
  /// Argon2 PHC string; `None` until the account is activated.
  pub password_hash:     Option<String>,
  pub activation_digest: Option<String>,
  pub reset_digest:      Option<String>,
  pub reset_sent_at:     Option<DateTime<Utc>>,
}

/// Input to [`crate::store::MarqueeStore::create_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub name:              String,
  pub email:             String,
  pub rank:              Rank,
  /// `None` for accounts bootstrapped from the command line.
  pub creator_id:        Option<Uuid>,
  pub password_hash:     Option<String>,
  pub activation_digest: Option<String>,
  pub activated_at:      Option<DateTime<Utc>>,
}

/// Input to [`crate::store::MarqueeStore::update_profile`].
#[derive(Debug, Clone)]
pub struct ProfileChanges {
  pub name:          String,
  pub email:         String,
  /// `None` keeps the current password.
  pub password_hash: Option<String>,
  pub updater_id:    Uuid,
}

// ─── Forms ───────────────────────────────────────────────────────────────────

/// Body of `POST /users`: an admin inviting a new user.
#[derive(Debug, Clone, Deserialize)]
pub struct InvitationForm {
  pub name:  String,
  pub email: String,
}

/// A validated invitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitation {
  pub name:  String,
  pub email: String,
}

impl InvitationForm {
  pub fn parse(self) -> Result<Invitation, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let name = validate::name(&mut errors, "name", &self.name);
    let email = validate::email(&mut errors, "email", &self.email);
    errors.finish(Invitation { name, email })
  }
}

/// Body of `PATCH /users/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileForm {
  pub name:                  String,
  pub email:                 String,
  #[serde(default)]
  pub password:              String,
  #[serde(default)]
  pub password_confirmation: String,
}

/// A validated profile edit. `password` is the new plaintext, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileEdit {
  pub name:     String,
  pub email:    String,
  pub password: Option<String>,
}

impl ProfileForm {
  /// A blank password and confirmation keep the existing password.
  pub fn parse(self) -> Result<ProfileEdit, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let name = validate::name(&mut errors, "name", &self.name);
    let email = validate::email(&mut errors, "email", &self.email);

    let password = if self.password.is_empty() && self.password_confirmation.is_empty() {
      None
    } else {
      validate::password(&mut errors, &self.password, &self.password_confirmation);
      Some(self.password)
    };

    errors.finish(ProfileEdit { name, email, password })
  }
}

/// Body of the account-activation and password-reset submissions.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordForm {
  pub email:                 String,
  #[serde(default)]
  pub password:              String,
  #[serde(default)]
  pub password_confirmation: String,
}

impl PasswordForm {
  /// Returns the new plaintext password; blank is never accepted here.
  pub fn parse_password(&self) -> Result<String, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    validate::password(&mut errors, &self.password, &self.password_confirmation);
    errors.finish(self.password.clone())
  }

  pub fn normalised_email(&self) -> String { self.email.trim().to_lowercase() }
}

/// Body of `PATCH /users/{id}/admin_status`.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminStatusForm {
  pub rank: Rank,
}

impl AdminStatusForm {
  pub fn parse(self) -> Result<Rank, ValidationErrors> {
    if ASSIGNABLE_RANKS.contains(&self.rank) {
      Ok(self.rank)
    } else {
      Err(ValidationErrors::single("rank", "is not assignable"))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rank_order_matches_levels() {
    assert!(Rank::Regular < Rank::Admin);
    assert!(Rank::Admin < Rank::SuperAdmin);
    for rank in [Rank::Regular, Rank::Admin, Rank::SuperAdmin] {
      assert_eq!(Rank::from_level(rank.level()), Some(rank));
    }
    assert_eq!(Rank::from_level(7), None);
  }

  #[test]
  fn invitation_normalises_email() {
    let form = InvitationForm { name: " Ada ".into(), email: "ADA@Example.com".into() };
    let invitation = form.parse().unwrap();
    assert_eq!(invitation.name, "Ada");
    assert_eq!(invitation.email, "ada@example.com");
  }

  #[test]
  fn profile_blank_password_is_kept() {
    let form = ProfileForm {
      name:                  "Ada".into(),
      email:                 "ada@example.com".into(),
      password:              String::new(),
      password_confirmation: String::new(),
    };
    assert_eq!(form.parse().unwrap().password, None);
  }

  #[test]
  fn profile_short_password_is_rejected() {
    let form = ProfileForm {
      name:                  "Ada".into(),
      email:                 "ada@example.com".into(),
      password:              "foo".into(),
      password_confirmation: "foo".into(),
    };
    assert!(form.parse().unwrap_err().has("password"));
  }

  #[test]
  fn blank_password_form_is_rejected() {
    let form = PasswordForm {
      email:                 "ada@example.com".into(),
      password:              String::new(),
      password_confirmation: String::new(),
    };
    assert!(form.parse_password().unwrap_err().has("password"));
  }

  #[test]
  fn super_admin_is_not_assignable() {
    assert!(AdminStatusForm { rank: Rank::SuperAdmin }.parse().is_err());
    assert_eq!(AdminStatusForm { rank: Rank::Admin }.parse().unwrap(), Rank::Admin);
  }
}
