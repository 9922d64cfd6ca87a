//! Request encoding for the upstream procedures.
//!
//! Every endpoint is `GET {base}/{procedure}?input=<json>`. Responses are
//! either the bare payload or a `{"result":{"data":…}}` envelope.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{ClientError, Result};

pub(crate) const COUNTRY_BY_ID: &str = "country.getCountryById";
pub(crate) const ALL_COUNTRIES: &str = "country.getAllCountries";
pub(crate) const USERS_BY_COUNTRY: &str = "user.getUsersByCountry";
pub(crate) const USER_LITE: &str = "user.getUserLite";
pub(crate) const ACTION_LOGS: &str = "actionLog.getActionLogs";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CountryByIdInput<'a> {
  pub country_id: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct EmptyInput {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UsersByCountryInput<'a> {
  pub country_id: &'a str,
  pub limit:      u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cursor:     Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserLiteInput<'a> {
  pub user_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ActionLogsInput<'a> {
  pub user_id:     &'a str,
  pub action_type: &'static str,
  pub limit:       u32,
  pub direction:   &'static str,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cursor:      Option<&'a str>,
}

/// Serialize `input` into the value of the `input` query parameter.
pub(crate) fn encode_input<I: Serialize>(procedure: &'static str, input: &I) -> Result<String> {
  serde_json::to_string(input).map_err(|source| ClientError::Encode { procedure, source })
}

/// Decode a response body, unwrapping the `result.data` envelope if present.
pub(crate) fn decode_body<T: DeserializeOwned>(procedure: &'static str, body: &[u8]) -> Result<T> {
  let decode = |source| ClientError::Decode { procedure, source };
  let mut value: Value = serde_json::from_slice(body).map_err(decode)?;
  if value.pointer("/result/data").is_some() {
    let data = value["result"]["data"].take();
    value = data;
  }
  serde_json::from_value(value).map_err(decode)
}
