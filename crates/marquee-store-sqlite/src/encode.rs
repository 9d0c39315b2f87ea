//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, calendar dates as `YYYY-MM-DD`,
//! UUIDs as hyphenated lowercase strings and ranks as their numeric level.

use chrono::{DateTime, NaiveDate, Utc};
use marquee_core::{
  production::{Production, ProductionDetails},
  theatre::Theatre,
  user::{Credentials, Rank, User},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

fn decode_opt_date(s: Option<String>) -> Result<Option<NaiveDate>> {
  s.as_deref()
    .map(|s| {
      NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
    })
    .transpose()
}

// ─── Rank ────────────────────────────────────────────────────────────────────

pub fn decode_rank(level: i64) -> Result<Rank> {
  Rank::from_level(level).ok_or(Error::Rank(level))
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "user_id, name, email, rank_level, suspended, activated_at,
   created_at, updated_at, creator_id, updater_id, rank_assigned_by";

/// Raw values read directly from the public columns of a `users` row, in
/// [`USER_COLUMNS`] order.
pub struct RawUser {
  pub user_id:          String,
  pub name:             String,
  pub email:            String,
  pub rank_level:       i64,
  pub suspended:        bool,
  pub activated_at:     Option<String>,
  pub created_at:       String,
  pub updated_at:       String,
  pub creator_id:       Option<String>,
  pub updater_id:       Option<String>,
  pub rank_assigned_by: Option<String>,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:          row.get(0)?,
      name:             row.get(1)?,
      email:            row.get(2)?,
      rank_level:       row.get(3)?,
      suspended:        row.get(4)?,
      activated_at:     row.get(5)?,
      created_at:       row.get(6)?,
      updated_at:       row.get(7)?,
      creator_id:       row.get(8)?,
      updater_id:       row.get(9)?,
      rank_assigned_by: row.get(10)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:          decode_uuid(&self.user_id)?,
      name:             self.name,
      email:            self.email,
      rank:             decode_rank(self.rank_level)?,
      suspended:        self.suspended,
      activated_at:     decode_opt_dt(self.activated_at)?,
      created_at:       decode_dt(&self.created_at)?,
      updated_at:       decode_dt(&self.updated_at)?,
      creator_id:       decode_opt_uuid(self.creator_id)?,
      updater_id:       decode_opt_uuid(self.updater_id)?,
      rank_assigned_by: decode_opt_uuid(self.rank_assigned_by)?,
    })
  }
}

/// Raw secret columns of a `users` row.
pub struct RawCredentials {
  pub password_hash:     Option<String>,
  pub activation_digest: Option<String>,
  pub reset_digest:      Option<String>,
  pub reset_sent_at:     Option<String>,
}

impl RawCredentials {
  pub fn into_credentials(self) -> Result<Credentials> {
    Ok(Credentials {
      password_hash:     self.password_hash,
      activation_digest: self.activation_digest,
      reset_digest:      self.reset_digest,
      reset_sent_at:     decode_opt_dt(self.reset_sent_at)?,
    })
  }
}

pub const THEATRE_COLUMNS: &str =
  "theatre_id, name, created_at, updated_at, creator_id, updater_id";

/// Raw strings read directly from a `theatres` row.
pub struct RawTheatre {
  pub theatre_id: String,
  pub name:       String,
  pub created_at: String,
  pub updated_at: String,
  pub creator_id: Option<String>,
  pub updater_id: Option<String>,
}

impl RawTheatre {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      theatre_id: row.get(0)?,
      name:       row.get(1)?,
      created_at: row.get(2)?,
      updated_at: row.get(3)?,
      creator_id: row.get(4)?,
      updater_id: row.get(5)?,
    })
  }

  pub fn into_theatre(self) -> Result<Theatre> {
    Ok(Theatre {
      theatre_id: decode_uuid(&self.theatre_id)?,
      name:       self.name,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      creator_id: decode_opt_uuid(self.creator_id)?,
      updater_id: decode_opt_uuid(self.updater_id)?,
    })
  }
}

pub const PRODUCTION_COLUMNS: &str = "production_id, title, url, alphabetise,
   first_date, press_date, last_date, press_date_wording, dates_tbc_note,
   dates_note, theatre_id, created_at, updated_at, creator_id, updater_id";

/// Raw strings read directly from a `productions` row.
pub struct RawProduction {
  pub production_id:      String,
  pub title:              String,
  pub url:                String,
  pub alphabetise:        Option<String>,
  pub first_date:         Option<String>,
  pub press_date:         Option<String>,
  pub last_date:          Option<String>,
  pub press_date_wording: Option<String>,
  pub dates_tbc_note:     Option<String>,
  pub dates_note:         Option<String>,
  pub theatre_id:         String,
  pub created_at:         String,
  pub updated_at:         String,
  pub creator_id:         Option<String>,
  pub updater_id:         Option<String>,
}

impl RawProduction {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      production_id:      row.get(0)?,
      title:              row.get(1)?,
      url:                row.get(2)?,
      alphabetise:        row.get(3)?,
      first_date:         row.get(4)?,
      press_date:         row.get(5)?,
      last_date:          row.get(6)?,
      press_date_wording: row.get(7)?,
      dates_tbc_note:     row.get(8)?,
      dates_note:         row.get(9)?,
      theatre_id:         row.get(10)?,
      created_at:         row.get(11)?,
      updated_at:         row.get(12)?,
      creator_id:         row.get(13)?,
      updater_id:         row.get(14)?,
    })
  }

  pub fn into_production(self) -> Result<Production> {
    Ok(Production {
      production_id: decode_uuid(&self.production_id)?,
      title:         self.title,
      url:           self.url,
      details:       ProductionDetails {
        alphabetise:        self.alphabetise,
        first_date:         decode_opt_date(self.first_date)?,
        press_date:         decode_opt_date(self.press_date)?,
        last_date:          decode_opt_date(self.last_date)?,
        press_date_wording: self.press_date_wording,
        dates_tbc_note:     self.dates_tbc_note,
        dates_note:         self.dates_note,
      },
      theatre_id:    decode_uuid(&self.theatre_id)?,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
      creator_id:    decode_opt_uuid(self.creator_id)?,
      updater_id:    decode_opt_uuid(self.updater_id)?,
    })
  }
}

/// Production detail columns, encoded for binding.
pub struct EncodedDetails {
  pub alphabetise:        Option<String>,
  pub first_date:         Option<String>,
  pub press_date:         Option<String>,
  pub last_date:          Option<String>,
  pub press_date_wording: Option<String>,
  pub dates_tbc_note:     Option<String>,
  pub dates_note:         Option<String>,
}

impl From<ProductionDetails> for EncodedDetails {
  fn from(d: ProductionDetails) -> Self {
    Self {
      alphabetise:        d.alphabetise,
      first_date:         d.first_date.map(encode_date),
      press_date:         d.press_date.map(encode_date),
      last_date:          d.last_date.map(encode_date),
      press_date_wording: d.press_date_wording,
      dates_tbc_note:     d.dates_tbc_note,
      dates_note:         d.dates_note,
    }
  }
}
