//! Outbound link templates: flag images and player profile pages.

use serde::{Deserialize, Serialize};

pub const DEFAULT_FLAG_BASE_URL: &str = "https://flagcdn.com/w40";
pub const DEFAULT_PROFILE_BASE_URL: &str = "https://app.warera.io/user";

/// Base paths for the two derived links. Both are plain string templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Links {
  pub flag_base_url:    String,
  pub profile_base_url: String,
}

impl Default for Links {
  fn default() -> Self {
    Self {
      flag_base_url:    DEFAULT_FLAG_BASE_URL.to_string(),
      profile_base_url: DEFAULT_PROFILE_BASE_URL.to_string(),
    }
  }
}

impl Links {
  /// `{flag_base}/{code}.png` with the code lower-cased; `None` for a blank
  /// code.
  pub fn flag_url(&self, code: &str) -> Option<String> {
    let code = code.trim();
    if code.is_empty() {
      return None;
    }
    Some(format!(
      "{}/{}.png",
      self.flag_base_url.trim_end_matches('/'),
      code.to_lowercase()
    ))
  }

  /// `{profile_base}/{user_id}`.
  pub fn profile_url(&self, user_id: &str) -> String {
    format!("{}/{}", self.profile_base_url.trim_end_matches('/'), user_id)
  }
}
