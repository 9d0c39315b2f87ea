//! Runtime server configuration.

use std::path::PathBuf;

use marquee_core::{account::DEFAULT_RESET_TTL_MINUTES, store::DEFAULT_PER_PAGE};
use serde::Deserialize;

/// Deserialised from `marquee.toml` layered under `MARQUEE_*` environment
/// variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                    String,
  #[serde(default = "default_port")]
  pub port:                    u16,
  /// Prefix for links in outgoing mail, without a trailing slash.
  #[serde(default = "default_base_url")]
  pub base_url:                String,
  #[serde(default = "default_store_path")]
  pub store_path:              PathBuf,
  #[serde(default = "default_per_page")]
  pub per_page:                u32,
  #[serde(default = "default_reset_ttl")]
  pub reset_token_ttl_minutes: i64,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 3000 }

fn default_base_url() -> String { "http://localhost:3000".to_string() }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/marquee/marquee.db") }

fn default_per_page() -> u32 { DEFAULT_PER_PAGE }

fn default_reset_ttl() -> i64 { DEFAULT_RESET_TTL_MINUTES }

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                    default_host(),
      port:                    default_port(),
      base_url:                default_base_url(),
      store_path:              default_store_path(),
      per_page:                default_per_page(),
      reset_token_ttl_minutes: default_reset_ttl(),
    }
  }
}

impl ServerConfig {
  pub fn reset_ttl(&self) -> chrono::Duration {
    chrono::Duration::minutes(self.reset_token_ttl_minutes)
  }

  /// Absolute link for `path`, which must start with `/`.
  pub fn link(&self, path: &str) -> String {
    format!("{}{path}", self.base_url.trim_end_matches('/'))
  }
}
