//! Store traits and paging types.
//!
//! [`TheatreStore`] is the narrow seam the association resolver needs;
//! [`MarqueeStore`] extends it with everything the HTTP layer needs. Backends
//! (e.g. `marquee-store-sqlite`) implement both.

use std::future::Future;

use serde::Serialize;
use uuid::Uuid;

use crate::{
  production::{NewProduction, Production, ProductionUpdate},
  theatre::{NewTheatre, Theatre, TheatreAttributes, TheatreClaim},
  user::{Credentials, NewUser, ProfileChanges, Rank, User},
};

pub const DEFAULT_PER_PAGE: u32 = 30;

// ─── Paging ──────────────────────────────────────────────────────────────────

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  pub page:     u32,
  pub per_page: u32,
}

impl PageRequest {
  /// Out-of-range values are clamped to 1.
  pub fn new(page: u32, per_page: u32) -> Self {
    Self { page: page.max(1), per_page: per_page.max(1) }
  }

  pub fn limit(&self) -> i64 { i64::from(self.per_page) }

  pub fn offset(&self) -> i64 { i64::from(self.page - 1) * i64::from(self.per_page) }
}

impl Default for PageRequest {
  fn default() -> Self { Self::new(1, DEFAULT_PER_PAGE) }
}

/// One page of results plus the total row count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
  pub items:    Vec<T>,
  pub page:     u32,
  pub per_page: u32,
  pub total:    u64,
}

impl<T> Page<T> {
  pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
    Self { items, page: request.page, per_page: request.per_page, total }
  }

  pub fn total_pages(&self) -> u64 { self.total.div_ceil(u64::from(self.per_page)) }

  /// Whether the listing needs pagination links at all.
  pub fn is_paginated(&self) -> bool { self.total_pages() > 1 }
}

/// Parameters for [`MarqueeStore::list_users`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UserQuery {
  /// Restrict to the given user plus users ranked strictly below `rank`.
  pub visible_to: Option<(Uuid, Rank)>,
  pub page:       PageRequest,
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Natural-key lookup and creation of theatres.
pub trait TheatreStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Find the theatre whose name equals `name` exactly.
  fn find_theatre_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<Theatre>, Self::Error>> + Send + 'a;

  /// Insert a theatre unless one with the same name exists, atomically.
  ///
  /// Uniqueness is enforced by the backend, not by the caller's prior
  /// lookup: if another writer inserted the name first, that row is returned
  /// as [`TheatreClaim::Existing`] and nothing is written.
  fn claim_theatre(
    &self,
    input: NewTheatre,
  ) -> impl Future<Output = Result<TheatreClaim, Self::Error>> + Send + '_;
}

/// The full Marquee store.
pub trait MarqueeStore: TheatreStore {
  // ── Users ─────────────────────────────────────────────────────────────

  /// Returns `None` if the email is already taken.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// `email` must already be lowercased.
  fn find_user_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  fn get_credentials(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Credentials>, Self::Error>> + Send + '_;

  /// Users ordered by name.
  fn list_users(
    &self,
    query: UserQuery,
  ) -> impl Future<Output = Result<Page<User>, Self::Error>> + Send + '_;

  /// Returns `None` if the user does not exist.
  fn update_profile(
    &self,
    id: Uuid,
    changes: ProfileChanges,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Store the password, stamp `activated_at`, clear the activation digest,
  /// and record the user as their own updater.
  fn activate_user(
    &self,
    id: Uuid,
    password_hash: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Store a reset digest stamped with the current time. Returns `false` if
  /// the user does not exist.
  fn set_reset_digest(
    &self,
    id: Uuid,
    digest: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Store the password, clear the reset digest, and record the user as their
  /// own updater.
  fn reset_password(
    &self,
    id: Uuid,
    password_hash: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn set_rank(
    &self,
    id: Uuid,
    rank: Rank,
    assigned_by: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn set_suspended(
    &self,
    id: Uuid,
    suspended: bool,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Attribution columns that point at the user become `NULL`.
  fn delete_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Theatres ──────────────────────────────────────────────────────────

  fn get_theatre(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Theatre>, Self::Error>> + Send + '_;

  /// Theatres ordered by name.
  fn list_theatres(
    &self,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<Theatre>, Self::Error>> + Send + '_;

  /// Returns `None` if the theatre does not exist. Fails if the new name is
  /// taken by another theatre.
  fn rename_theatre(
    &self,
    id: Uuid,
    name: TheatreAttributes,
    updater_id: Uuid,
  ) -> impl Future<Output = Result<Option<Theatre>, Self::Error>> + Send + '_;

  /// Fails if a production still references the theatre.
  fn delete_theatre(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// The productions staged at a theatre, ordered by title.
  fn theatre_productions(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Vec<Production>, Self::Error>> + Send + '_;

  // ── Productions ───────────────────────────────────────────────────────

  /// Claim `input.theatre` and insert the production against it in one
  /// transaction: if the insert fails, a theatre the claim created is rolled
  /// back with it.
  fn create_production(
    &self,
    input: NewProduction,
  ) -> impl Future<Output = Result<(Production, TheatreClaim), Self::Error>> + Send + '_;

  fn get_production(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Production>, Self::Error>> + Send + '_;

  /// Productions ordered by `alphabetise`, falling back to the title.
  fn list_productions(
    &self,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<Production>, Self::Error>> + Send + '_;

  /// Update a production, claiming `input.theatre` (when given) in the same
  /// transaction. `None` if the production does not exist, in which case
  /// nothing is claimed.
  fn update_production(
    &self,
    id: Uuid,
    input: ProductionUpdate,
  ) -> impl Future<Output = Result<Option<(Production, Option<TheatreClaim>)>, Self::Error>>
  + Send
  + '_;

  /// Never deletes the production's theatre.
  fn delete_production(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
