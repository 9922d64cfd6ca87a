//! Flat change rows and date ordering.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{change::CitizenshipChange, time::parse_instant_in, user::UserLite};

/// Label shown for a change whose date cannot be parsed.
pub const INVALID_DATE: &str = "Invalid date";

/// One citizenship change, flattened with its owner for tabular display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRow {
  pub change_id:         String,
  pub user_id:           String,
  pub username:          String,
  pub from_country_id:   Option<String>,
  pub to_country_id:     Option<String>,
  pub from_country_name: Option<String>,
  pub to_country_name:   Option<String>,
  /// The timestamp string the date was read from.
  pub raw_date:          String,
  /// `None` when `raw_date` is empty or unparseable.
  pub date:              Option<DateTime<Utc>>,
}

impl ChangeRow {
  /// Build a row, reading zone-less timestamps as wall-clock time in `tz`.
  pub fn from_change_in<Tz: TimeZone>(
    user: &UserLite,
    change: &CitizenshipChange,
    tz: &Tz,
  ) -> Self {
    let raw_date = change.raw_date().to_string();
    let date = parse_instant_in(&raw_date, tz);
    Self {
      change_id: change.change_id.clone(),
      user_id: user.user_id.clone(),
      username: user.username.clone(),
      from_country_id: change.details.from_country_id.clone(),
      to_country_id: change.details.to_country_id.clone(),
      from_country_name: change.details.from_country_name.clone(),
      to_country_name: change.details.to_country_name.clone(),
      raw_date,
      date,
    }
  }

  /// Date rendered in `tz`, or [`INVALID_DATE`].
  pub fn date_label_in<Tz>(&self, tz: &Tz) -> String
  where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
  {
    match self.date {
      Some(d) => d.with_timezone(tz).format("%Y-%m-%d %H:%M").to_string(),
      None => INVALID_DATE.to_string(),
    }
  }

  pub fn date_label(&self) -> String { self.date_label_in(&Local) }
}

/// Flatten one player's changes into rows, in the order given.
pub fn flatten_in<'a, Tz: TimeZone>(
  user: &'a UserLite,
  changes: &'a [CitizenshipChange],
  tz: &'a Tz,
) -> impl Iterator<Item = ChangeRow> + 'a {
  changes
    .iter()
    .map(move |change| ChangeRow::from_change_in(user, change, tz))
}

/// Human label for one end of a change: the payload name, then whatever
/// `lookup` knows about the identifier, then the identifier itself.
pub fn country_label(
  id: Option<&str>,
  name: Option<&str>,
  lookup: impl FnOnce(&str) -> Option<String>,
) -> String {
  if let Some(name) = name {
    return name.to_string();
  }
  match id {
    Some(id) => lookup(id).unwrap_or_else(|| id.to_string()),
    None => "—".to_string(),
  }
}

// ─── Ordering ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
  #[default]
  Ascending,
  Descending,
}

impl SortOrder {
  pub fn toggle(self) -> Self {
    match self {
      Self::Ascending => Self::Descending,
      Self::Descending => Self::Ascending,
    }
  }

  pub fn arrow(self) -> &'static str {
    match self {
      Self::Ascending => "↑",
      Self::Descending => "↓",
    }
  }
}

/// Stable sort by parsed date. Undated rows order before every dated row
/// when ascending, and after them when descending.
pub fn sort_rows(rows: &mut [ChangeRow], order: SortOrder) {
  match order {
    SortOrder::Ascending => rows.sort_by(|a, b| a.date.cmp(&b.date)),
    SortOrder::Descending => rows.sort_by(|a, b| b.date.cmp(&a.date)),
  }
}
