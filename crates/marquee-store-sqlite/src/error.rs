//! Error type for `marquee-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown rank level: {0}")]
  Rank(i64),

  /// A row written inside the current call could not be read back. Carries
  /// the row's id or, for theatres, its name.
  #[error("row vanished after write: {0}")]
  Vanished(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
