//! Outgoing account mail.
//!
//! Delivery is a seam: [`LogMailer`] writes the message to the trace log, and
//! [`MemoryMailer`] records messages so tests can read the tokens back.

use std::sync::Mutex;

use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MailKind {
  Activation,
  PasswordReset,
}

/// A message carrying a single-use account token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mail {
  pub kind:  MailKind,
  pub to:    String,
  pub name:  String,
  pub token: String,
  /// Absolute link the recipient follows.
  pub link:  String,
}

pub trait Mailer: Send + Sync {
  fn send(&self, mail: Mail);
}

/// Logs each message at `info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

impl Mailer for LogMailer {
  fn send(&self, mail: Mail) {
    info!(kind = ?mail.kind, to = %mail.to, link = %mail.link, "mail sent");
  }
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct MemoryMailer {
  sent: Mutex<Vec<Mail>>,
}

impl MemoryMailer {
  pub fn new() -> Self { Self::default() }

  pub fn sent(&self) -> Vec<Mail> {
    self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
  }

  /// The newest message of `kind` addressed to `to`.
  pub fn last(&self, kind: MailKind, to: &str) -> Option<Mail> {
    self
      .sent()
      .into_iter()
      .rev()
      .find(|m| m.kind == kind && m.to == to)
  }
}

impl Mailer for MemoryMailer {
  fn send(&self, mail: Mail) {
    if let Ok(mut sent) = self.sent.lock() {
      sent.push(mail);
    }
  }
}
