//! Citizenship-change events and payload normalization.
//!
//! The upstream has shipped two naming conventions for the change payload.
//! [`ChangeDetails::from_payload`] is the only place that knows both; every
//! other layer works with the canonical [`CitizenshipChange`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
  DocumentId,
  value::{identifier, scalar_string},
};

/// Action-log type the server filters on.
pub const CHANGED_CITIZENSHIP: &str = "changedCitizenship";

// Current field names first; the legacy ones follow in order of preference.
const FROM_ID_KEYS: &[&str] = &["fromCountryId", "oldCountry", "fromCountry"];
const TO_ID_KEYS: &[&str] = &["toCountryId", "newCountry", "toCountry"];
const FROM_NAME_KEYS: &[&str] = &["fromCountryName", "oldCountryName"];
const TO_NAME_KEYS: &[&str] = &["toCountryName", "newCountryName"];

/// An action-log entry as delivered by the upstream API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCitizenshipChange {
  #[serde(flatten)]
  pub id:         DocumentId,
  #[serde(default)]
  pub user:       Option<Value>,
  #[serde(default)]
  pub user_id:    Option<Value>,
  #[serde(default)]
  pub country:    Option<Value>,
  #[serde(default)]
  pub country_id: Option<Value>,
  #[serde(default)]
  pub created_at: Option<Value>,
  #[serde(default)]
  pub timestamp:  Option<Value>,
  #[serde(default)]
  pub data:       Value,
}

/// Canonical from/to information extracted from a change payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeDetails {
  pub from_country_id:   Option<String>,
  pub to_country_id:     Option<String>,
  pub from_country_name: Option<String>,
  pub to_country_name:   Option<String>,
}

impl ChangeDetails {
  /// Translate either payload convention into canonical fields. Non-object
  /// payloads give empty details.
  pub fn from_payload(data: &Value) -> Self {
    let first = |keys: &[&str], read: fn(&Value) -> Option<String>| {
      keys.iter().find_map(|k| data.get(*k).and_then(read))
    };
    Self {
      from_country_id:   first(FROM_ID_KEYS, identifier),
      to_country_id:     first(TO_ID_KEYS, identifier),
      from_country_name: first(FROM_NAME_KEYS, scalar_string),
      to_country_name:   first(TO_NAME_KEYS, scalar_string),
    }
  }
}

/// A normalized citizenship-change event. Read-only after fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitizenshipChange {
  pub change_id:  String,
  pub user_id:    Option<String>,
  pub country_id: Option<String>,
  /// Raw creation time, kept unparsed so bad values can be shown as such.
  pub created_at: Option<String>,
  /// Raw alternate timestamp; preferred over `created_at` when present.
  pub timestamp:  Option<String>,
  pub details:    ChangeDetails,
}

impl CitizenshipChange {
  pub fn from_raw(raw: RawCitizenshipChange) -> Self {
    Self {
      change_id:  raw.id.into_string(),
      user_id:    first_identifier(raw.user.as_ref(), raw.user_id.as_ref()),
      country_id: first_identifier(raw.country.as_ref(), raw.country_id.as_ref()),
      created_at: raw.created_at.as_ref().and_then(scalar_string),
      timestamp:  raw.timestamp.as_ref().and_then(scalar_string),
      details:    ChangeDetails::from_payload(&raw.data),
    }
  }

  /// The timestamp string used for display and ordering: `timestamp`, then
  /// `created_at`, then the empty string.
  pub fn raw_date(&self) -> &str {
    self
      .timestamp
      .as_deref()
      .or(self.created_at.as_deref())
      .unwrap_or_default()
  }
}

/// `user`/`country` win over their `userId`/`countryId` spellings.
fn first_identifier(preferred: Option<&Value>, fallback: Option<&Value>) -> Option<String> {
  preferred
    .and_then(identifier)
    .or_else(|| fallback.and_then(identifier))
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn raw(value: Value) -> RawCitizenshipChange { serde_json::from_value(value).unwrap() }

  #[test]
  fn current_field_names() {
    let change = CitizenshipChange::from_raw(raw(json!({
      "_id": "a1",
      "user": "u1",
      "country": "c2",
      "createdAt": "2024-01-01T10:00:00.000Z",
      "data": {
        "fromCountryId": "c1",
        "toCountryId": "c2",
        "fromCountryName": "France",
        "toCountryName": "Spain",
      },
    })));
    assert_eq!(change.change_id, "a1");
    assert_eq!(change.user_id.as_deref(), Some("u1"));
    assert_eq!(change.details.from_country_id.as_deref(), Some("c1"));
    assert_eq!(change.details.to_country_id.as_deref(), Some("c2"));
    assert_eq!(change.details.from_country_name.as_deref(), Some("France"));
    assert_eq!(change.details.to_country_name.as_deref(), Some("Spain"));
  }

  #[test]
  fn legacy_field_names() {
    let change = CitizenshipChange::from_raw(raw(json!({
      "id": "a2",
      "userId": { "_id": "u9" },
      "data": {
        "oldCountry": { "_id": "c3", "name": "Italy" },
        "newCountry": "c4",
        "oldCountryName": "Italy",
      },
    })));
    assert_eq!(change.user_id.as_deref(), Some("u9"));
    assert_eq!(change.details.from_country_id.as_deref(), Some("c3"));
    assert_eq!(change.details.to_country_id.as_deref(), Some("c4"));
    assert_eq!(change.details.from_country_name.as_deref(), Some("Italy"));
    assert_eq!(change.details.to_country_name, None);
  }

  #[test]
  fn both_spellings_of_a_reference_decode() {
    let change = CitizenshipChange::from_raw(raw(json!({
      "_id": "a1",
      "id": "a1",
      "user": "u1",
      "userId": "u1-legacy",
      "countryId": "c2",
    })));
    assert_eq!(change.change_id, "a1");
    assert_eq!(change.user_id.as_deref(), Some("u1"));
    assert_eq!(change.country_id.as_deref(), Some("c2"));
  }

  #[test]
  fn current_names_win_over_legacy() {
    let details = ChangeDetails::from_payload(&json!({
      "fromCountryId": "new-from",
      "oldCountry": "old-from",
      "toCountryId": "",
      "newCountry": "old-to",
    }));
    assert_eq!(details.from_country_id.as_deref(), Some("new-from"));
    // A blank current value falls through to the legacy one.
    assert_eq!(details.to_country_id.as_deref(), Some("old-to"));
  }

  #[test]
  fn non_object_payload_is_empty() {
    assert_eq!(ChangeDetails::from_payload(&Value::Null), ChangeDetails::default());
    assert_eq!(ChangeDetails::from_payload(&json!("x")), ChangeDetails::default());
  }

  #[test]
  fn raw_date_fallback_order() {
    let mut change = CitizenshipChange::from_raw(raw(json!({
      "_id": "a3",
      "createdAt": "2024-01-01T00:00:00Z",
      "timestamp": 1704067200000_i64,
    })));
    assert_eq!(change.raw_date(), "1704067200000");
    change.timestamp = None;
    assert_eq!(change.raw_date(), "2024-01-01T00:00:00Z");
    change.created_at = None;
    assert_eq!(change.raw_date(), "");
  }
}
