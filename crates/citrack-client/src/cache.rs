//! Process-lifetime country cache.

use std::{
  collections::HashMap,
  sync::{PoisonError, RwLock},
};

use citrack_core::country::Country;

/// Append-only map from country identifier to country. Entries are never
/// evicted or replaced: the first observation of a country wins.
#[derive(Debug, Default)]
pub(crate) struct CountryCache {
  inner: RwLock<HashMap<String, Country>>,
}

impl CountryCache {
  pub(crate) fn get(&self, country_id: &str) -> Option<Country> {
    self
      .inner
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(country_id)
      .cloned()
  }

  /// Store `country` unless its identifier is already cached. Returns the
  /// cached instance either way.
  pub(crate) fn insert(&self, country: Country) -> Country {
    self
      .inner
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .entry(country.country_id.clone())
      .or_insert(country)
      .clone()
  }

  pub(crate) fn len(&self) -> usize {
    self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
  }
}
