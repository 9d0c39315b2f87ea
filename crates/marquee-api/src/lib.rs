//! JSON HTTP API for Marquee.
//!
//! Exposes an axum [`Router`] backed by any [`MarqueeStore`]. Every mutating
//! route authenticates with HTTP Basic and checks the access policy before
//! touching the store.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod password;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch, post},
};
use marquee_core::store::MarqueeStore;
use tower_http::trace::TraceLayer;

pub use config::ServerConfig;
pub use error::ApiError;
pub use mailer::{LogMailer, Mail, MailKind, Mailer, MemoryMailer};

use handlers::{accounts, admin_status, productions, theatres, users};

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
  pub mailer: Arc<dyn Mailer>,
}

impl<S> AppState<S> {
  pub fn new(store: S, config: ServerConfig, mailer: Arc<dyn Mailer>) -> Self {
    Self { store: Arc::new(store), config: Arc::new(config), mailer }
  }
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      config: Arc::clone(&self.config),
      mailer: Arc::clone(&self.mailer),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full API router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: MarqueeStore + 'static,
{
  Router::new()
    // Accounts
    .route("/me", get(users::me::<S>))
    .route("/users", get(users::index::<S>).post(users::create::<S>))
    .route(
      "/users/{id}",
      get(users::show::<S>).patch(users::update::<S>).delete(users::destroy::<S>),
    )
    .route(
      "/users/{id}/admin_status",
      get(admin_status::edit::<S>).patch(admin_status::update::<S>),
    )
    .route("/account_activations/{token}", post(accounts::activate::<S>))
    .route("/password_resets", post(accounts::request_reset::<S>))
    .route("/password_resets/{token}", patch(accounts::reset::<S>))
    // Listings
    .route("/productions", get(productions::index::<S>).post(productions::create::<S>))
    .route(
      "/productions/{id}",
      get(productions::show::<S>)
        .patch(productions::update::<S>)
        .delete(productions::destroy::<S>),
    )
    .route("/theatres", get(theatres::index::<S>))
    .route(
      "/theatres/{id}",
      get(theatres::show::<S>).patch(theatres::update::<S>).delete(theatres::destroy::<S>),
    )
    .fallback(handlers::not_found)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
