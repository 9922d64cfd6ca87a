//! Cursor-paginated responses.

use serde::{Deserialize, Serialize};

/// One page of items plus the opaque cursor for the next page, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
  pub items:       Vec<T>,
  #[serde(default)]
  pub next_cursor: Option<String>,
}

impl<T> Page<T> {
  pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
    Page {
      items:       self.items.into_iter().map(f).collect(),
      next_cursor: self.next_cursor,
    }
  }

  /// The continuation cursor, ignoring blank tokens.
  pub fn cursor(&self) -> Option<&str> {
    self.next_cursor.as_deref().filter(|c| !c.is_empty())
  }
}
