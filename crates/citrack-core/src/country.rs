//! Countries: the upstream record and the cached, augmented form.

use serde::{Deserialize, Serialize};

use crate::{DocumentId, links::Links};

/// A country as delivered by the upstream API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCountry {
  #[serde(flatten)]
  pub id:   DocumentId,
  pub name: String,
  #[serde(default)]
  pub code: Option<String>,
}

/// A country with its derived flag URL. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
  pub country_id: String,
  pub name:       String,
  /// Two-letter ISO code, when the upstream knows one.
  pub code:       Option<String>,
  pub flag_url:   Option<String>,
}

impl Country {
  pub fn from_raw(raw: RawCountry, links: &Links) -> Self {
    let code = raw
      .code
      .map(|c| c.trim().to_string())
      .filter(|c| !c.is_empty());
    let flag_url = code.as_deref().and_then(|c| links.flag_url(c));
    Self {
      country_id: raw.id.into_string(),
      name: raw.name,
      code,
      flag_url,
    }
  }

  /// `name (CODE)` or just the name.
  pub fn label(&self) -> String {
    match &self.code {
      Some(code) => format!("{} ({})", self.name, code.to_uppercase()),
      None => self.name.clone(),
    }
  }

  /// Case-insensitive match on identifier, name or code, used to resolve
  /// operator-typed country references.
  pub fn matches_reference(&self, reference: &str) -> bool {
    let reference = reference.trim();
    self.country_id == reference
      || self.name.eq_ignore_ascii_case(reference)
      || self
        .code
        .as_deref()
        .is_some_and(|c| c.eq_ignore_ascii_case(reference))
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn from_raw_derives_flag_url() {
    let raw: RawCountry =
      serde_json::from_value(json!({ "_id": "c1", "name": "France", "code": "FR" }))
        .unwrap();
    let country = Country::from_raw(raw, &Links::default());
    assert_eq!(country.country_id, "c1");
    assert_eq!(country.code.as_deref(), Some("FR"));
    assert_eq!(
      country.flag_url.as_deref(),
      Some("https://flagcdn.com/w40/fr.png")
    );
  }

  #[test]
  fn missing_or_blank_code_has_no_flag() {
    let raw: RawCountry =
      serde_json::from_value(json!({ "id": "c2", "name": "Atlantis", "code": "" }))
        .unwrap();
    let country = Country::from_raw(raw, &Links::default());
    assert_eq!(country.code, None);
    assert_eq!(country.flag_url, None);
    assert_eq!(country.label(), "Atlantis");
  }

  #[test]
  fn both_identifier_spellings_decode() {
    let raw: RawCountry =
      serde_json::from_value(json!({ "_id": "c1", "id": "c1", "name": "France" })).unwrap();
    assert_eq!(Country::from_raw(raw, &Links::default()).country_id, "c1");

    let missing = serde_json::from_value::<RawCountry>(json!({ "name": "Nowhere" }));
    assert!(missing.is_err());
  }

  #[test]
  fn reference_matching() {
    let country = Country {
      country_id: "c1".into(),
      name:       "France".into(),
      code:       Some("fr".into()),
      flag_url:   None,
    };
    assert!(country.matches_reference("c1"));
    assert!(country.matches_reference("france"));
    assert!(country.matches_reference(" FR "));
    assert!(!country.matches_reference("fra"));
  }
}
