//! Core types and decision logic for the Marquee listings service.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement the traits in [`store`]; the HTTP layer consults
//! [`policy`] before every mutation and runs [`listing`] on the write path.

pub mod account;
pub mod error;
pub mod listing;
pub mod policy;
pub mod production;
pub mod resolver;
pub mod store;
pub mod theatre;
pub mod user;
pub mod validate;

pub use error::{Error, Result};
