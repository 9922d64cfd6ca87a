//! Core types for the citizenship tracker.
//!
//! This crate holds the domain model, the translation from upstream wire
//! shapes into canonical records, and the row views (flatten, sort, filter,
//! group) the front ends render. It has no HTTP dependency.

pub mod change;
pub mod country;
pub mod error;
pub mod filter;
pub mod group;
pub mod links;
pub mod page;
pub mod row;
pub mod time;
pub mod user;
mod value;

pub use error::{Error, Result};
pub use value::DocumentId;
