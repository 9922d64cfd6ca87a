//! Helpers for reading loosely-typed JSON payloads.

use serde::Deserialize;
use serde_json::Value;

/// Render a scalar as a string. Strings are trimmed; blank strings, `null`,
/// arrays and objects give `None`.
pub(crate) fn scalar_string(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => {
      let s = s.trim();
      (!s.is_empty()).then(|| s.to_string())
    }
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

/// Read an identifier that is either a bare scalar or an embedded document
/// carrying `_id` / `id`.
pub(crate) fn identifier(value: &Value) -> Option<String> {
  match value {
    Value::Object(map) => map
      .get("_id")
      .or_else(|| map.get("id"))
      .and_then(scalar_string),
    other => scalar_string(other),
  }
}

/// An upstream document identifier. Documents may carry `_id`, `id` or both;
/// `_id` wins when both are present and at least one is required.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "IdKeys")]
pub struct DocumentId(String);

impl DocumentId {
  pub fn into_string(self) -> String { self.0 }
}

#[derive(Deserialize)]
struct IdKeys {
  #[serde(default, rename = "_id")]
  mongo_id: Option<Value>,
  #[serde(default)]
  id:       Option<Value>,
}

impl TryFrom<IdKeys> for DocumentId {
  type Error = &'static str;

  fn try_from(keys: IdKeys) -> Result<Self, Self::Error> {
    keys
      .mongo_id
      .as_ref()
      .and_then(scalar_string)
      .or_else(|| keys.id.as_ref().and_then(scalar_string))
      .map(Self)
      .ok_or("document has no `_id` or `id`")
  }
}
