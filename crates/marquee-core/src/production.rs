//! Productions: a run of a show at exactly one theatre.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  theatre::{NewTheatre, Theatre, TheatreAttributes, TheatreForm},
  validate::{self, ValidationErrors},
};

/// A stored production.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Production {
  pub production_id: Uuid,
  pub title:         String,
  /// Slug derived from the title.
  pub url:           String,
  #[serde(flatten)]
  pub details:       ProductionDetails,
  pub theatre_id:    Uuid,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
  pub creator_id:    Option<Uuid>,
  pub updater_id:    Option<Uuid>,
}

/// The optional descriptive fields of a production.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionDetails {
  /// Sort key used instead of the title when present (e.g. "Hamlet, The").
  pub alphabetise:        Option<String>,
  pub first_date:         Option<NaiveDate>,
  pub press_date:         Option<NaiveDate>,
  pub last_date:          Option<NaiveDate>,
  pub press_date_wording: Option<String>,
  pub dates_tbc_note:     Option<String>,
  pub dates_note:         Option<String>,
}

/// A production bundled with its theatre.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductionView {
  #[serde(flatten)]
  pub production: Production,
  pub theatre:    Theatre,
}

/// Input to [`crate::store::MarqueeStore::create_production`]. The theatre
/// is claimed by name in the same transaction as the insert.
#[derive(Debug, Clone)]
pub struct NewProduction {
  pub title:      String,
  pub url:        String,
  pub details:    ProductionDetails,
  pub theatre:    NewTheatre,
  pub creator_id: Uuid,
}

/// Input to [`crate::store::MarqueeStore::update_production`]. The creator is
/// never changed.
#[derive(Debug, Clone)]
pub struct ProductionUpdate {
  pub title:      String,
  pub url:        String,
  pub details:    ProductionDetails,
  /// `None` keeps the current theatre.
  pub theatre:    Option<NewTheatre>,
  pub updater_id: Uuid,
}

// ─── Forms ───────────────────────────────────────────────────────────────────

/// Body of `POST /productions` and `PATCH /productions/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductionForm {
  #[serde(default)]
  pub title:              String,
  pub alphabetise:        Option<String>,
  pub first_date:         Option<NaiveDate>,
  pub press_date:         Option<NaiveDate>,
  pub last_date:          Option<NaiveDate>,
  pub press_date_wording: Option<String>,
  pub dates_tbc_note:     Option<String>,
  pub dates_note:         Option<String>,
  pub theatre_attributes: Option<TheatreForm>,
}

/// A validated production submission. `T` is [`TheatreAttributes`] when
/// creating (a theatre is required) and `Option<TheatreAttributes>` when
/// editing (`None` keeps the current theatre).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductionDraft<T> {
  pub title:   String,
  pub details: ProductionDetails,
  pub theatre: T,
}

impl ProductionForm {
  /// Validate a submission that creates a production.
  pub fn parse_new(self) -> Result<ProductionDraft<TheatreAttributes>, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let (title, details, theatre) = self.parse_into(&mut errors, true);
    match theatre {
      Some(theatre) if errors.is_empty() => Ok(ProductionDraft { title, details, theatre }),
      _ => Err(errors),
    }
  }

  /// Validate a submission that edits a production.
  pub fn parse_changes(
    self,
  ) -> Result<ProductionDraft<Option<TheatreAttributes>>, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let (title, details, theatre) = self.parse_into(&mut errors, false);
    errors.finish(ProductionDraft { title, details, theatre })
  }

  fn parse_into(
    self,
    errors: &mut ValidationErrors,
    theatre_required: bool,
  ) -> (String, ProductionDetails, Option<TheatreAttributes>) {
    let title = validate::required(errors, "title", &self.title);

    if let (Some(first), Some(last)) = (self.first_date, self.last_date)
      && last < first
    {
      errors.add("last_date", "can't be before first date");
    }

    let theatre = match self.theatre_attributes {
      Some(form) => match TheatreAttributes::try_from(form) {
        Ok(attrs) => Some(attrs),
        Err(e) => {
          for fe in e.errors() {
            errors.add(fe.field.clone(), fe.message.clone());
          }
          None
        }
      },
      None => {
        if theatre_required {
          errors.add("theatre.name", "can't be blank");
        }
        None
      }
    };

    let details = ProductionDetails {
      alphabetise:        validate::optional(self.alphabetise),
      first_date:         self.first_date,
      press_date:         self.press_date,
      last_date:          self.last_date,
      press_date_wording: validate::optional(self.press_date_wording),
      dates_tbc_note:     validate::optional(self.dates_tbc_note),
      dates_note:         validate::optional(self.dates_note),
    };

    (title, details, theatre)
  }
}

/// Lowercase ASCII alphanumerics separated by single hyphens.
///
/// `"Romeo & Juliet"` becomes `"romeo-juliet"`.
pub fn slugify(title: &str) -> String {
  let mut slug = String::with_capacity(title.len());
  let mut pending_dash = false;
  for c in title.chars() {
    if c.is_ascii_alphanumeric() {
      if pending_dash && !slug.is_empty() {
        slug.push('-');
      }
      pending_dash = false;
      slug.push(c.to_ascii_lowercase());
    } else {
      pending_dash = true;
    }
  }
  slug
}
