//! Access policy: may this actor perform this action on this subject?
//!
//! Each `(resource, action)` pair maps to an ordered list of guards. Guards
//! run in order and the first denial wins, so the evaluation order is always:
//!
//! 1. the actor is authenticated,
//! 2. the actor is not suspended,
//! 3. the rank or ownership rule for the action.
//!
//! Decisions are pure; translating a denial into a redirect and a message is
//! the caller's job (see [`DenialReason::redirect`]).

use std::fmt;

use serde::Serialize;
use tracing::instrument;

use crate::{
  Error,
  user::{Rank, User},
};

// ─── Inputs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
  Production,
  Theatre,
  User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
  ViewIndex,
  ViewShow,
  Create,
  Edit,
  Update,
  Destroy,
  EditAdminStatus,
  UpdateAdminStatus,
}

/// One authorization question. `subject` is the user record being acted on;
/// it is `None` for listings, creation, non-user resources, and for user ids
/// that did not resolve to a record.
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
  pub actor:    Option<&'a User>,
  pub action:   Action,
  pub resource: Resource,
  pub subject:  Option<&'a User>,
}

impl<'a> AccessRequest<'a> {
  pub fn new(actor: Option<&'a User>, resource: Resource, action: Action) -> Self {
    Self { actor, action, resource, subject: None }
  }

  pub fn on(mut self, subject: Option<&'a User>) -> Self {
    self.subject = subject;
    self
  }
}

// ─── Outputs ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
  NotAuthenticated,
  Suspended,
  InsufficientRank,
  /// Equal ranks: editing oneself, or a peer of the same rank.
  SelfOrPeerRankConflict,
  /// The action is only available on one's own record.
  NotSelf,
}

/// Where a denied request should be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Redirect {
  Login,
  Home,
}

impl Redirect {
  pub fn path(self) -> &'static str {
    match self {
      Self::Login => "/login",
      Self::Home => "/",
    }
  }
}

impl DenialReason {
  pub fn redirect(self) -> Redirect {
    match self {
      Self::NotAuthenticated => Redirect::Login,
      _ => Redirect::Home,
    }
  }

  /// User-visible message.
  pub fn message(self) -> &'static str {
    match self {
      Self::NotAuthenticated => "Please log in",
      Self::Suspended => "Access denied: account suspended",
      Self::InsufficientRank | Self::SelfOrPeerRankConflict | Self::NotSelf => {
        "Access denied"
      }
    }
  }
}

impl fmt::Display for DenialReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Self::NotAuthenticated => "not authenticated",
      Self::Suspended => "suspended",
      Self::InsufficientRank => "insufficient rank",
      Self::SelfOrPeerRankConflict => "self or peer rank conflict",
      Self::NotSelf => "not own record",
    };
    f.write_str(s)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
  Allowed,
  Denied(DenialReason),
}

impl Decision {
  pub fn is_allowed(self) -> bool { matches!(self, Self::Allowed) }

  pub fn into_result(self) -> Result<(), Error> {
    match self {
      Self::Allowed => Ok(()),
      Self::Denied(reason) => Err(Error::Denied(reason)),
    }
  }
}

// ─── Guards ──────────────────────────────────────────────────────────────────

pub type Guard = fn(&AccessRequest<'_>) -> Option<DenialReason>;

fn authenticated(req: &AccessRequest<'_>) -> Option<DenialReason> {
  req.actor.is_none().then_some(DenialReason::NotAuthenticated)
}

fn not_suspended(req: &AccessRequest<'_>) -> Option<DenialReason> {
  req
    .actor
    .is_some_and(|a| a.suspended)
    .then_some(DenialReason::Suspended)
}

fn manager(req: &AccessRequest<'_>) -> Option<DenialReason> {
  match req.actor {
    Some(a) if a.rank.is_manager() => None,
    _ => Some(DenialReason::InsufficientRank),
  }
}

fn own_record(req: &AccessRequest<'_>) -> Option<DenialReason> {
  match (req.actor, req.subject) {
    (Some(a), Some(s)) if a.user_id == s.user_id => None,
    _ => Some(DenialReason::NotSelf),
  }
}

fn outranks_subject(req: &AccessRequest<'_>) -> Option<DenialReason> {
  let (Some(actor), Some(subject)) = (req.actor, req.subject) else {
    return Some(DenialReason::InsufficientRank);
  };
  outranks(actor.rank, subject.rank).err()
}

fn never(_: &AccessRequest<'_>) -> Option<DenialReason> {
  Some(DenialReason::InsufficientRank)
}

/// The rank rule for admin-status edits and user removal. The subject's
/// suspension flag plays no part.
pub fn outranks(actor: Rank, subject: Rank) -> Result<(), DenialReason> {
  if actor == Rank::Regular {
    Err(DenialReason::InsufficientRank)
  } else if actor == subject {
    Err(DenialReason::SelfOrPeerRankConflict)
  } else if actor < subject {
    Err(DenialReason::InsufficientRank)
  } else {
    Ok(())
  }
}

const PUBLIC: &[Guard] = &[];
const ACTIVE: &[Guard] = &[authenticated, not_suspended];
const NOT_APPLICABLE: &[Guard] = &[authenticated, not_suspended, never];
const MANAGER: &[Guard] = &[authenticated, not_suspended, manager];
const LOGGED_IN: &[Guard] = &[authenticated];
const OWNER: &[Guard] = &[authenticated, not_suspended, own_record];
const OUTRANKS: &[Guard] = &[authenticated, not_suspended, outranks_subject];

/// The ordered guards for a `(resource, action)` pair.
pub fn guards(resource: Resource, action: Action) -> &'static [Guard] {
  use Action::*;

  match (resource, action) {
    (Resource::Production | Resource::Theatre, ViewIndex | ViewShow) => PUBLIC,
    (Resource::Production | Resource::Theatre, Create | Edit | Update | Destroy) => ACTIVE,
    (Resource::Production | Resource::Theatre, EditAdminStatus | UpdateAdminStatus) => {
      NOT_APPLICABLE
    }
    (Resource::User, ViewIndex | Create) => MANAGER,
    (Resource::User, ViewShow) => LOGGED_IN,
    (Resource::User, Edit | Update) => OWNER,
    (Resource::User, Destroy | EditAdminStatus | UpdateAdminStatus) => OUTRANKS,
  }
}

// ─── Evaluation ──────────────────────────────────────────────────────────────

/// Run the guards for `req`, stopping at the first denial.
#[instrument(
  level = "debug",
  skip(req),
  fields(
    actor = ?req.actor.map(|a| a.user_id),
    subject = ?req.subject.map(|s| s.user_id),
    resource = ?req.resource,
    action = ?req.action,
  ),
  ret
)]
pub fn evaluate(req: &AccessRequest<'_>) -> Decision {
  guards(req.resource, req.action)
    .iter()
    .find_map(|guard| guard(req))
    .map_or(Decision::Allowed, Decision::Denied)
}

/// Whether `actor` sees `candidate` in the user index: themself, plus every
/// user of strictly lower rank.
pub fn visible_in_index(actor: &User, candidate: &User) -> bool {
  actor.user_id == candidate.user_id || candidate.rank < actor.rank
}
