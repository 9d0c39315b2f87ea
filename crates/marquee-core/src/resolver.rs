//! Association resolver: turn a production's nested theatre attributes into a
//! stored theatre, creating it on first use.
//!
//! A theatre is identified by its name. An existing theatre is reused as-is
//! (its creator and updater are never touched); a new one is attributed to the
//! acting user. The previously associated theatre of an updated production is
//! left alone even if nothing references it any more.
//!
//! Lookup, insertion and attaching the theatre to the production happen in a
//! single store transaction. [`claim_for`] builds the request for that
//! transaction and [`attribute`] interprets its outcome.

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
  theatre::{NewTheatre, Theatre, TheatreAttributes, TheatreClaim},
  user::User,
};

/// The theatre a production should point at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
  pub theatre:  Theatre,
  /// Whether this write inserted the theatre.
  pub created:  bool,
  /// The parent's previous theatre, when the submitted name picked a
  /// different one.
  pub replaced: Option<Uuid>,
}

/// The claim to submit for `nested`. Should it insert a row, `acting` is its
/// creator and updater.
pub fn claim_for(nested: &TheatreAttributes, acting: &User) -> NewTheatre {
  NewTheatre { name: nested.name().to_owned(), creator_id: acting.user_id }
}

/// Interpret the store's answer to a [`claim_for`] request.
///
/// `existing` is the parent's theatre before the write, if it had one.
/// Claiming the same name twice without an intervening delete yields the
/// same theatre, and only the first claim reports `created`.
pub fn attribute(claim: TheatreClaim, acting: &User, existing: Option<Uuid>) -> Resolution {
  let (theatre, created) = claim.into_parts();

  if created {
    info!(theatre_id = %theatre.theatre_id, name = %theatre.name, actor = %acting.user_id, "theatre created");
  } else {
    debug!(theatre_id = %theatre.theatre_id, name = %theatre.name, "theatre reused");
  }

  let replaced = existing.filter(|id| *id != theatre.theatre_id);
  Resolution { theatre, created, replaced }
}
