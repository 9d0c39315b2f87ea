//! [`SqliteStore`]: the SQLite implementation of [`MarqueeStore`].

use std::path::Path;

use chrono::Utc;
use marquee_core::{
  production::{NewProduction, Production, ProductionUpdate},
  store::{MarqueeStore, Page, PageRequest, TheatreStore, UserQuery},
  theatre::{NewTheatre, Theatre, TheatreAttributes, TheatreClaim},
  user::{Credentials, NewUser, ProfileChanges, Rank, User},
};
use rusqlite::{Connection, OptionalExtension as _};
use tracing::debug;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    EncodedDetails, PRODUCTION_COLUMNS, RawCredentials, RawProduction, RawTheatre, RawUser,
    THEATRE_COLUMNS, USER_COLUMNS, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Row helpers ─────────────────────────────────────────────────────────────

type SqlParam = Box<dyn rusqlite::ToSql + Send>;

fn select_user(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawUser>> {
  conn
    .query_row(
      &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
      rusqlite::params![id],
      RawUser::from_row,
    )
    .optional()
}

fn select_theatre(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawTheatre>> {
  conn
    .query_row(
      &format!("SELECT {THEATRE_COLUMNS} FROM theatres WHERE theatre_id = ?1"),
      rusqlite::params![id],
      RawTheatre::from_row,
    )
    .optional()
}

fn select_theatre_by_name(
  conn: &Connection,
  name: &str,
) -> rusqlite::Result<Option<RawTheatre>> {
  conn
    .query_row(
      &format!("SELECT {THEATRE_COLUMNS} FROM theatres WHERE name = ?1"),
      rusqlite::params![name],
      RawTheatre::from_row,
    )
    .optional()
}

fn select_production(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawProduction>> {
  conn
    .query_row(
      &format!("SELECT {PRODUCTION_COLUMNS} FROM productions WHERE production_id = ?1"),
      rusqlite::params![id],
      RawProduction::from_row,
    )
    .optional()
}

/// Find the theatre named `input.name`, inserting it if there is none. The
/// unique name constraint settles a lost race in favour of the existing row.
/// Returns whether this call inserted, and the row.
fn claim_in(
  conn: &Connection,
  input: &NewTheatre,
  now_str: &str,
) -> rusqlite::Result<(bool, Option<RawTheatre>)> {
  if let Some(raw) = select_theatre_by_name(conn, &input.name)? {
    return Ok((false, Some(raw)));
  }
  let inserted = conn.execute(
    "INSERT INTO theatres (theatre_id, name, created_at, updated_at, creator_id, updater_id)
     VALUES (?1, ?2, ?3, ?3, ?4, ?4)
     ON CONFLICT (name) DO NOTHING",
    rusqlite::params![
      encode_uuid(Uuid::new_v4()),
      input.name,
      now_str,
      encode_uuid(input.creator_id)
    ],
  )?;
  Ok((inserted == 1, select_theatre_by_name(conn, &input.name)?))
}

fn decode_claim(created: bool, raw: Option<RawTheatre>, name: &str) -> Result<TheatreClaim> {
  let theatre = raw
    .map(RawTheatre::into_theatre)
    .transpose()?
    .ok_or_else(|| Error::Vanished(name.to_owned()))?;

  if created {
    Ok(TheatreClaim::Created(theatre))
  } else {
    debug!(theatre_id = %theatre.theatre_id, "theatre name already claimed");
    Ok(TheatreClaim::Existing(theatre))
  }
}

fn decode_user(raw: Option<RawUser>) -> Result<Option<User>> {
  raw.map(RawUser::into_user).transpose()
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Marquee store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a user `UPDATE` and read the row back. The user id is bound after
  /// `params`. `None` if no row matched.
  async fn update_user(
    &self,
    id: Uuid,
    sql: &'static str,
    mut params: Vec<SqlParam>,
  ) -> Result<Option<User>> {
    let id_str = encode_uuid(id);
    params.push(Box::new(id_str.clone()));
    let raw = self
      .conn
      .call(move |conn| {
        if conn.execute(sql, rusqlite::params_from_iter(params.iter()))? == 0 {
          return Ok(None);
        }
        Ok(select_user(conn, &id_str)?)
      })
      .await?;
    decode_user(raw)
  }
}

// ─── TheatreStore impl ───────────────────────────────────────────────────────

impl TheatreStore for SqliteStore {
  type Error = Error;

  async fn find_theatre_by_name(&self, name: &str) -> Result<Option<Theatre>> {
    let name = name.to_owned();
    let raw = self
      .conn
      .call(move |conn| Ok(select_theatre_by_name(conn, &name)?))
      .await?;
    raw.map(RawTheatre::into_theatre).transpose()
  }

  async fn claim_theatre(&self, input: NewTheatre) -> Result<TheatreClaim> {
    let name    = input.name.clone();
    let now_str = encode_dt(Utc::now());

    let (created, raw) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let claimed = claim_in(&tx, &input, &now_str)?;
        tx.commit()?;
        Ok(claimed)
      })
      .await?;

    decode_claim(created, raw, &name)
  }
}

// ─── MarqueeStore impl ───────────────────────────────────────────────────────

impl MarqueeStore for SqliteStore {
  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<Option<User>> {
    let id_str        = encode_uuid(Uuid::new_v4());
    let now_str       = encode_dt(Utc::now());
    let creator_str   = input.creator_id.map(encode_uuid);
    let activated_str = input.activated_at.map(encode_dt);
    let rank_level    = input.rank.level();

    let raw = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT INTO users (
             user_id, name, email, rank_level, suspended, password_hash,
             activation_digest, activated_at, created_at, updated_at,
             creator_id, updater_id
           ) VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?7, ?8, ?8, ?9, ?9)
           ON CONFLICT (email) DO NOTHING",
          rusqlite::params![
            id_str,
            input.name,
            input.email,
            rank_level,
            input.password_hash,
            input.activation_digest,
            activated_str,
            now_str,
            creator_str,
          ],
        )?;
        if inserted == 0 {
          return Ok(None);
        }
        Ok(select_user(conn, &id_str)?)
      })
      .await?;

    decode_user(raw)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| Ok(select_user(conn, &id_str)?))
      .await?;
    decode_user(raw)
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
    let email = email.to_owned();
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
              rusqlite::params![email],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    decode_user(raw)
  }

  async fn get_credentials(&self, id: Uuid) -> Result<Option<Credentials>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT password_hash, activation_digest, reset_digest, reset_sent_at
               FROM users WHERE user_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawCredentials {
                  password_hash:     row.get(0)?,
                  activation_digest: row.get(1)?,
                  reset_digest:      row.get(2)?,
                  reset_sent_at:     row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawCredentials::into_credentials).transpose()
  }

  async fn list_users(&self, query: UserQuery) -> Result<Page<User>> {
    // NULL visibility parameters disable the filter.
    let (self_str, below) = match query.visible_to {
      Some((id, rank)) => (Some(encode_uuid(id)), Some(rank.level())),
      None => (None, None),
    };
    let limit  = query.page.limit();
    let offset = query.page.offset();

    let (raws, total): (Vec<RawUser>, i64) = self
      .conn
      .call(move |conn| {
        const FILTER: &str = "?1 IS NULL OR user_id = ?1 OR rank_level < ?2";

        let total: i64 = conn.query_row(
          &format!("SELECT COUNT(*) FROM users WHERE {FILTER}"),
          rusqlite::params![self_str, below],
          |r| r.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {USER_COLUMNS} FROM users WHERE {FILTER}
           ORDER BY name, email LIMIT ?3 OFFSET ?4"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![self_str, below, limit, offset], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((rows, total))
      })
      .await?;

    let users = raws.into_iter().map(RawUser::into_user).collect::<Result<_>>()?;
    Ok(Page::new(users, query.page, total.max(0) as u64))
  }

  async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> Result<Option<User>> {
    self
      .update_user(
        id,
        "UPDATE users SET
           name = ?1, email = ?2, password_hash = COALESCE(?3, password_hash),
           updater_id = ?4, updated_at = ?5
         WHERE user_id = ?6",
        vec![
          Box::new(changes.name),
          Box::new(changes.email),
          Box::new(changes.password_hash),
          Box::new(encode_uuid(changes.updater_id)),
          Box::new(encode_dt(Utc::now())),
        ],
      )
      .await
  }

  async fn activate_user(&self, id: Uuid, password_hash: String) -> Result<Option<User>> {
    let now = encode_dt(Utc::now());
    self
      .update_user(
        id,
        "UPDATE users SET
           password_hash = ?1, activated_at = ?2, activation_digest = NULL,
           updater_id = user_id, updated_at = ?2
         WHERE user_id = ?3",
        vec![Box::new(password_hash), Box::new(now)],
      )
      .await
  }

  async fn set_reset_digest(&self, id: Uuid, digest: String) -> Result<bool> {
    let id_str  = encode_uuid(id);
    let now_str = encode_dt(Utc::now());
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET reset_digest = ?1, reset_sent_at = ?2 WHERE user_id = ?3",
          rusqlite::params![digest, now_str, id_str],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn reset_password(&self, id: Uuid, password_hash: String) -> Result<Option<User>> {
    self
      .update_user(
        id,
        "UPDATE users SET
           password_hash = ?1, reset_digest = NULL, reset_sent_at = NULL,
           updater_id = user_id, updated_at = ?2
         WHERE user_id = ?3",
        vec![Box::new(password_hash), Box::new(encode_dt(Utc::now()))],
      )
      .await
  }

  async fn set_rank(&self, id: Uuid, rank: Rank, assigned_by: Uuid) -> Result<Option<User>> {
    self
      .update_user(
        id,
        "UPDATE users SET rank_level = ?1, rank_assigned_by = ?2, updated_at = ?3
         WHERE user_id = ?4",
        vec![
          Box::new(rank.level()),
          Box::new(encode_uuid(assigned_by)),
          Box::new(encode_dt(Utc::now())),
        ],
      )
      .await
  }

  async fn set_suspended(&self, id: Uuid, suspended: bool) -> Result<Option<User>> {
    self
      .update_user(
        id,
        "UPDATE users SET suspended = ?1, updated_at = ?2 WHERE user_id = ?3",
        vec![Box::new(suspended), Box::new(encode_dt(Utc::now()))],
      )
      .await
  }

  async fn delete_user(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM users WHERE user_id = ?1", rusqlite::params![id_str])?)
      })
      .await?;
    Ok(changed > 0)
  }

  // ── Theatres ──────────────────────────────────────────────────────────────

  async fn get_theatre(&self, id: Uuid) -> Result<Option<Theatre>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| Ok(select_theatre(conn, &id_str)?))
      .await?;
    raw.map(RawTheatre::into_theatre).transpose()
  }

  async fn list_theatres(&self, page: PageRequest) -> Result<Page<Theatre>> {
    let limit  = page.limit();
    let offset = page.offset();

    let (raws, total): (Vec<RawTheatre>, i64) = self
      .conn
      .call(move |conn| {
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM theatres", [], |r| r.get(0))?;
        let mut stmt = conn.prepare(&format!(
          "SELECT {THEATRE_COLUMNS} FROM theatres ORDER BY name LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![limit, offset], RawTheatre::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((rows, total))
      })
      .await?;

    let theatres = raws.into_iter().map(RawTheatre::into_theatre).collect::<Result<_>>()?;
    Ok(Page::new(theatres, page, total.max(0) as u64))
  }

  async fn rename_theatre(
    &self,
    id: Uuid,
    name: TheatreAttributes,
    updater_id: Uuid,
  ) -> Result<Option<Theatre>> {
    let id_str      = encode_uuid(id);
    let name        = name.name().to_owned();
    let updater_str = encode_uuid(updater_id);
    let now_str     = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE theatres SET name = ?1, updater_id = ?2, updated_at = ?3
           WHERE theatre_id = ?4",
          rusqlite::params![name, updater_str, now_str, id_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(select_theatre(conn, &id_str)?)
      })
      .await?;
    raw.map(RawTheatre::into_theatre).transpose()
  }

  async fn delete_theatre(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM theatres WHERE theatre_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn theatre_productions(&self, id: Uuid) -> Result<Vec<Production>> {
    let id_str = encode_uuid(id);
    let raws: Vec<RawProduction> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PRODUCTION_COLUMNS} FROM productions WHERE theatre_id = ?1
           ORDER BY COALESCE(alphabetise, title)"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawProduction::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawProduction::into_production).collect()
  }

  // ── Productions ───────────────────────────────────────────────────────────

  async fn create_production(
    &self,
    input: NewProduction,
  ) -> Result<(Production, TheatreClaim)> {
    let production_id = Uuid::new_v4();
    let id_str        = encode_uuid(production_id);
    let d             = EncodedDetails::from(input.details);
    let at_str        = encode_dt(Utc::now());
    let creator_str   = encode_uuid(input.creator_id);
    let theatre       = input.theatre;
    let name          = theatre.name.clone();

    let (created, raw_theatre, raw) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let (created, raw_theatre) = claim_in(&tx, &theatre, &at_str)?;
        let Some(theatre_id) = raw_theatre.as_ref().map(|t| t.theatre_id.clone()) else {
          return Ok((created, None, None));
        };
        tx.execute(
          "INSERT INTO productions (
             production_id, title, url, alphabetise, first_date, press_date,
             last_date, press_date_wording, dates_tbc_note, dates_note,
             theatre_id, created_at, updated_at, creator_id, updater_id
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12, ?13, ?13)",
          rusqlite::params![
            id_str,
            input.title,
            input.url,
            d.alphabetise,
            d.first_date,
            d.press_date,
            d.last_date,
            d.press_date_wording,
            d.dates_tbc_note,
            d.dates_note,
            theatre_id,
            at_str,
            creator_str,
          ],
        )?;
        let raw = select_production(&tx, &id_str)?;
        tx.commit()?;
        Ok((created, raw_theatre, raw))
      })
      .await?;

    let claim = decode_claim(created, raw_theatre, &name)?;
    let production = raw
      .map(RawProduction::into_production)
      .transpose()?
      .ok_or_else(|| Error::Vanished(production_id.to_string()))?;
    Ok((production, claim))
  }

  async fn get_production(&self, id: Uuid) -> Result<Option<Production>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| Ok(select_production(conn, &id_str)?))
      .await?;
    raw.map(RawProduction::into_production).transpose()
  }

  async fn list_productions(&self, page: PageRequest) -> Result<Page<Production>> {
    let limit  = page.limit();
    let offset = page.offset();

    let (raws, total): (Vec<RawProduction>, i64) = self
      .conn
      .call(move |conn| {
        let total: i64 =
          conn.query_row("SELECT COUNT(*) FROM productions", [], |r| r.get(0))?;
        let mut stmt = conn.prepare(&format!(
          "SELECT {PRODUCTION_COLUMNS} FROM productions
           ORDER BY COALESCE(alphabetise, title), first_date LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![limit, offset], RawProduction::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((rows, total))
      })
      .await?;

    let productions =
      raws.into_iter().map(RawProduction::into_production).collect::<Result<_>>()?;
    Ok(Page::new(productions, page, total.max(0) as u64))
  }

  async fn update_production(
    &self,
    id: Uuid,
    input: ProductionUpdate,
  ) -> Result<Option<(Production, Option<TheatreClaim>)>> {
    let id_str      = encode_uuid(id);
    let d           = EncodedDetails::from(input.details);
    let updater_str = encode_uuid(input.updater_id);
    let now_str     = encode_dt(Utc::now());
    let theatre     = input.theatre;
    let name        = theatre.as_ref().map(|t| t.name.clone());

    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(current) = select_production(&tx, &id_str)? else {
          return Ok(None);
        };

        let (claimed, theatre_id) = match &theatre {
          Some(theatre) => {
            let (created, raw_theatre) = claim_in(&tx, theatre, &now_str)?;
            let Some(theatre_id) = raw_theatre.as_ref().map(|t| t.theatre_id.clone()) else {
              return Ok(Some((Some((created, None)), None)));
            };
            (Some((created, raw_theatre)), theatre_id)
          }
          None => (None, current.theatre_id.clone()),
        };

        tx.execute(
          "UPDATE productions SET
             title = ?1, url = ?2, alphabetise = ?3, first_date = ?4,
             press_date = ?5, last_date = ?6, press_date_wording = ?7,
             dates_tbc_note = ?8, dates_note = ?9, theatre_id = ?10,
             updater_id = ?11, updated_at = ?12
           WHERE production_id = ?13",
          rusqlite::params![
            input.title,
            input.url,
            d.alphabetise,
            d.first_date,
            d.press_date,
            d.last_date,
            d.press_date_wording,
            d.dates_tbc_note,
            d.dates_note,
            theatre_id,
            updater_str,
            now_str,
            id_str,
          ],
        )?;
        let raw = select_production(&tx, &id_str)?;
        tx.commit()?;
        Ok(Some((claimed, raw)))
      })
      .await?;

    let Some((claimed, raw)) = written else {
      return Ok(None);
    };
    let claim = match (claimed, name) {
      (Some((created, raw_theatre)), Some(name)) => {
        Some(decode_claim(created, raw_theatre, &name)?)
      }
      _ => None,
    };
    let production = raw
      .map(RawProduction::into_production)
      .transpose()?
      .ok_or_else(|| Error::Vanished(id.to_string()))?;
    Ok(Some((production, claim)))
  }

  async fn delete_production(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM productions WHERE production_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }
}
