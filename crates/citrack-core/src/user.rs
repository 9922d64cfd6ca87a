//! Players: the lite user record and the activity rule.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{DocumentId, time::parse_instant_in, value::scalar_string};

/// A player counts as active when their last connection is at most this many
/// days before the evaluation instant.
pub const ACTIVE_WINDOW_DAYS: i64 = 10;

/// The 10-day activity rule. The boundary is inclusive; a missing
/// timestamp is never active.
pub fn is_active(last_connection_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
  let cutoff = now - TimeDelta::days(ACTIVE_WINDOW_DAYS);
  last_connection_at.is_some_and(|t| t >= cutoff)
}

/// Nested timestamp block some user payloads carry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUserDates {
  #[serde(default)]
  pub last_connection_at: Option<Value>,
}

/// A lite user record as delivered by the upstream API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUserLite {
  #[serde(flatten)]
  pub id:                 DocumentId,
  #[serde(default)]
  pub username:           String,
  #[serde(default)]
  pub last_connection_at: Option<Value>,
  #[serde(default)]
  pub dates:              Option<RawUserDates>,
}

impl RawUserLite {
  /// The last-connection timestamp from either location, parsed.
  pub fn last_connection(&self) -> Option<DateTime<Utc>> {
    self
      .last_connection_at
      .as_ref()
      .or_else(|| self.dates.as_ref()?.last_connection_at.as_ref())
      .and_then(scalar_string)
      .and_then(|raw| parse_instant_in(&raw, &Utc))
  }
}

/// A player with `active` evaluated once, at fetch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLite {
  pub user_id:            String,
  pub username:           String,
  pub last_connection_at: Option<DateTime<Utc>>,
  pub active:             bool,
}

impl UserLite {
  pub fn from_raw(raw: RawUserLite, now: DateTime<Utc>) -> Self {
    let last_connection_at = raw.last_connection();
    Self {
      user_id: raw.id.into_string(),
      username: raw.username,
      last_connection_at,
      active: is_active(last_connection_at, now),
    }
  }
}
