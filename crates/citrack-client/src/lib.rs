//! HTTP client and tracker for the upstream game API.
//!
//! [`ApiClient`] wraps the five endpoints the tracker needs and owns the
//! country cache and the authorization token. [`tracker::Tracker`] drives
//! the strictly sequential roster → user → change-log pipeline on top of it.

mod cache;
mod client;
mod procedure;

pub mod error;
pub mod tracker;

pub use client::{ApiClient, ApiConfig, DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE};
pub use error::{ClientError, Result};

#[cfg(test)]
mod tests;
