//! `marquee`: the Marquee listings server and its administrative commands.
//!
//! Reads `marquee.toml` (or the path given with `--config`) layered under
//! `MARQUEE_*` environment variables, opens the SQLite store, and serves the
//! JSON API over HTTP.
//!
//! # Bootstrapping
//!
//! The first super-admin is created from the command line:
//!
//! ```text
//! marquee create-user --name "Ada" --email ada@example.com --rank super-admin
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::{Context as _, bail};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use marquee_api::{AppState, LogMailer, ServerConfig, password::hash_password};
use marquee_core::{
  store::MarqueeStore,
  user::{InvitationForm, NewUser, Rank},
  validate::{self, ValidationErrors},
};
use marquee_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Marquee theatre listings server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "marquee.toml", global = true)]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Print the argon2 hash for a password entered on stdin.
  HashPassword,
  /// Create an activated account; the password is read from stdin.
  CreateUser {
    #[arg(long)]
    name:  String,
    #[arg(long)]
    email: String,
    #[arg(long, value_enum, default_value_t = RankArg::Regular)]
    rank:  RankArg,
  },
  /// Suspend an account. Suspended users keep their rank but cannot write.
  Suspend { email: String },
  /// Lift a suspension.
  Unsuspend { email: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum RankArg {
  Regular,
  Admin,
  SuperAdmin,
}

impl From<RankArg> for Rank {
  fn from(arg: RankArg) -> Self {
    match arg {
      RankArg::Regular => Rank::Regular,
      RankArg::Admin => Rank::Admin,
      RankArg::SuperAdmin => Rank::SuperAdmin,
    }
  }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(load_config(cli.config)?).await,
    Command::HashPassword => {
      let password = read_password()?;
      let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
      println!("{hash}");
      Ok(())
    }
    Command::CreateUser { name, email, rank } => {
      let store = open_store(&load_config(cli.config)?).await?;
      create_user(&store, name, email, rank.into()).await
    }
    Command::Suspend { email } => {
      let store = open_store(&load_config(cli.config)?).await?;
      set_suspended(&store, &email, true).await
    }
    Command::Unsuspend { email } => {
      let store = open_store(&load_config(cli.config)?).await?;
      set_suspended(&store, &email, false).await
    }
  }
}

fn load_config(path: PathBuf) -> anyhow::Result<ServerConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("MARQUEE"))
    .build()
    .context("failed to read config file")?;

  settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")
}

async fn open_store(cfg: &ServerConfig) -> anyhow::Result<SqliteStore> {
  let store_path = expand_tilde(&cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))
}

async fn serve(cfg: ServerConfig) -> anyhow::Result<()> {
  let store = open_store(&cfg).await?;
  let address = format!("{}:{}", cfg.host, cfg.port);

  let state = AppState::new(store, cfg, Arc::new(LogMailer));
  let app = marquee_api::router(state);

  info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn create_user(
  store: &SqliteStore,
  name: String,
  email: String,
  rank: Rank,
) -> anyhow::Result<()> {
  let invitation = InvitationForm { name, email }.parse().map_err(invalid)?;

  let password = read_password()?;
  let mut errors = ValidationErrors::new();
  validate::password(&mut errors, &password, &password);
  errors.finish(()).map_err(invalid)?;
  let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;

  let user = store
    .create_user(NewUser {
      name:              invitation.name,
      email:             invitation.email,
      rank,
      creator_id:        None,
      password_hash:     Some(hash),
      activation_digest: None,
      activated_at:      Some(Utc::now()),
    })
    .await
    .context("failed to create user")?;

  let Some(user) = user else {
    bail!("email address is already taken");
  };
  info!(user_id = %user.user_id, rank = ?user.rank, "user created");
  println!("{}", user.user_id);
  Ok(())
}

async fn set_suspended(store: &SqliteStore, email: &str, suspended: bool) -> anyhow::Result<()> {
  let email = email.trim().to_lowercase();
  let user = store
    .find_user_by_email(&email)
    .await
    .context("failed to look up user")?
    .with_context(|| format!("no user with email {email}"))?;

  store
    .set_suspended(user.user_id, suspended)
    .await
    .context("failed to update user")?;

  info!(user_id = %user.user_id, suspended, "suspension changed");
  Ok(())
}

fn invalid(errors: ValidationErrors) -> anyhow::Error { anyhow::anyhow!("invalid input: {errors}") }

/// Read a password from stdin. Surrounding whitespace other than the line
/// ending is kept.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  eprint!("Password: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/x.db")), PathBuf::from(home).join("x.db"));
    assert_eq!(expand_tilde(Path::new("/abs/x.db")), PathBuf::from("/abs/x.db"));
  }

  #[test]
  fn subcommand_defaults_to_serve() {
    let cli = Cli::try_parse_from(["marquee"]).unwrap();
    assert!(cli.command.is_none());
    assert_eq!(cli.config, PathBuf::from("marquee.toml"));
  }

  #[test]
  fn create_user_parses_rank() {
    let cli = Cli::try_parse_from([
      "marquee",
      "create-user",
      "--name",
      "Ada",
      "--email",
      "ada@example.com",
      "--rank",
      "super-admin",
    ])
    .unwrap();
    match cli.command {
      Some(Command::CreateUser { rank, .. }) => assert_eq!(Rank::from(rank), Rank::SuperAdmin),
      _ => panic!("expected create-user"),
    }
  }

  #[tokio::test]
  async fn suspension_round_trip() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    store
      .create_user(NewUser {
        name:              "Ada".into(),
        email:             "ada@example.com".into(),
        rank:              Rank::Admin,
        creator_id:        None,
        password_hash:     None,
        activation_digest: None,
        activated_at:      Some(Utc::now()),
      })
      .await
      .unwrap();

    set_suspended(&store, " ADA@example.com ", true).await.unwrap();
    let ada = store.find_user_by_email("ada@example.com").await.unwrap().unwrap();
    assert!(ada.suspended);
    assert_eq!(ada.rank, Rank::Admin);

    assert!(set_suspended(&store, "nobody@example.com", true).await.is_err());
  }
}
