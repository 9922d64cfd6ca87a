//! Async HTTP client wrapping the upstream game API.

use std::{
  sync::{Arc, PoisonError, RwLock},
  time::Duration,
};

use chrono::Utc;
use citrack_core::{
  change::{CHANGED_CITIZENSHIP, CitizenshipChange, RawCitizenshipChange},
  country::{Country, RawCountry},
  links::Links,
  page::Page,
  user::{RawUserLite, UserLite},
};
use reqwest::{Client, header::AUTHORIZATION};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::{
  ClientError, Result,
  cache::CountryCache,
  procedure::{
    ACTION_LOGS, ALL_COUNTRIES, ActionLogsInput, COUNTRY_BY_ID, CountryByIdInput,
    EmptyInput, USER_LITE, USERS_BY_COUNTRY, UserLiteInput, UsersByCountryInput,
    decode_body, encode_input,
  },
};

pub const DEFAULT_BASE_URL: &str = "https://api2.warera.io/trpc";

/// Page size for roster and change-log requests.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Connection settings for the upstream API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub timeout:  Duration,
  pub links:    Links,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: DEFAULT_BASE_URL.to_string(),
      timeout:  Duration::from_secs(30),
      links:    Links::default(),
    }
  }
}

/// Async HTTP client for the upstream API.
///
/// Cheap to clone. Clones share the inner [`reqwest::Client`], the country
/// cache and the authorization token.
#[derive(Clone)]
pub struct ApiClient {
  client:    Client,
  config:    Arc<ApiConfig>,
  countries: Arc<CountryCache>,
  token:     Arc<RwLock<Option<String>>>,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(config.timeout)
      .build()
      .map_err(ClientError::Build)?;
    Ok(Self {
      client,
      config: Arc::new(config),
      countries: Arc::default(),
      token: Arc::default(),
    })
  }

  pub fn links(&self) -> &Links { &self.config.links }

  // ── Authorization ─────────────────────────────────────────────────────────

  /// Set the credential sent as the `Authorization` header on authenticated
  /// calls. A blank token clears it.
  pub fn set_auth_token(&self, token: impl Into<String>) {
    let token = token.into().trim().to_string();
    *self.token.write().unwrap_or_else(PoisonError::into_inner) =
      (!token.is_empty()).then_some(token);
  }

  pub fn clear_auth_token(&self) {
    *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
  }

  pub fn has_auth_token(&self) -> bool { self.auth_token().is_some() }

  fn auth_token(&self) -> Option<String> {
    self.token.read().unwrap_or_else(PoisonError::into_inner).clone()
  }

  // ── Transport ─────────────────────────────────────────────────────────────

  fn url(&self, procedure: &str) -> String {
    format!("{}/{}", self.config.base_url.trim_end_matches('/'), procedure)
  }

  /// `GET {base}/{procedure}?input=<json>`
  async fn call<I, T>(&self, procedure: &'static str, input: &I, token: Option<&str>) -> Result<T>
  where
    I: Serialize,
    T: DeserializeOwned,
  {
    let input = encode_input(procedure, input)?;
    debug!(procedure, %input, "upstream request");

    let mut req = self.client.get(self.url(procedure)).query(&[("input", input)]);
    if let Some(token) = token {
      req = req.header(AUTHORIZATION, token);
    }

    let http = |source| ClientError::Http { procedure, source };
    let resp = req.send().await.map_err(http)?;
    let status = resp.status();
    if !status.is_success() {
      return Err(ClientError::Status { procedure, status });
    }
    let body = resp.bytes().await.map_err(http)?;
    decode_body(procedure, &body)
  }

  // ── Countries ─────────────────────────────────────────────────────────────

  /// Cached country if known, else fetch and cache it. Failures are logged
  /// and reported as `None`.
  pub async fn get_country_by_id(&self, country_id: &str) -> Option<Country> {
    if let Some(country) = self.countries.get(country_id) {
      return Some(country);
    }
    match self
      .call::<_, RawCountry>(COUNTRY_BY_ID, &CountryByIdInput { country_id }, None)
      .await
    {
      Ok(raw) => Some(self.countries.insert(Country::from_raw(raw, &self.config.links))),
      Err(e) => {
        warn!(country_id, error = %e, "country lookup failed");
        None
      }
    }
  }

  /// Fetch every country and cache them all. Failures are logged and
  /// reported as an empty list.
  pub async fn get_all_countries(&self) -> Vec<Country> {
    match self
      .call::<_, Vec<RawCountry>>(ALL_COUNTRIES, &EmptyInput {}, None)
      .await
    {
      Ok(raw) => {
        let countries: Vec<_> = raw
          .into_iter()
          .map(|raw| self.countries.insert(Country::from_raw(raw, &self.config.links)))
          .collect();
        debug!(
          fetched = countries.len(),
          cached = self.countries.len(),
          "country list loaded"
        );
        countries
      }
      Err(e) => {
        warn!(error = %e, "country list fetch failed");
        Vec::new()
      }
    }
  }

  /// Cache lookup only; never touches the network.
  pub fn cached_country(&self, country_id: &str) -> Option<Country> {
    self.countries.get(country_id)
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  /// One page of a country's roster. `limit` defaults to
  /// [`DEFAULT_PAGE_SIZE`].
  pub async fn get_users_by_country(
    &self,
    country_id: &str,
    cursor: Option<&str>,
    limit: Option<u32>,
  ) -> Result<Page<UserLite>> {
    let input = UsersByCountryInput {
      country_id,
      limit: limit.unwrap_or(DEFAULT_PAGE_SIZE),
      cursor,
    };
    let page: Page<RawUserLite> = self.call(USERS_BY_COUNTRY, &input, None).await?;
    let now = Utc::now();
    Ok(page.map(|raw| UserLite::from_raw(raw, now)))
  }

  /// One user, with `active` evaluated against the current time.
  pub async fn get_user_lite(&self, user_id: &str) -> Result<UserLite> {
    let raw: RawUserLite = self
      .call(USER_LITE, &UserLiteInput { user_id }, None)
      .await?;
    Ok(UserLite::from_raw(raw, Utc::now()))
  }

  // ── Citizenship changes ───────────────────────────────────────────────────

  /// One page of a user's citizenship changes, oldest first.
  ///
  /// Requires a token; without one this fails with
  /// [`ClientError::MissingToken`] before any request is made.
  pub async fn get_citizenship_changes(
    &self,
    user_id: &str,
    cursor: Option<&str>,
  ) -> Result<Page<CitizenshipChange>> {
    self.get_citizenship_changes_sized(user_id, cursor, DEFAULT_PAGE_SIZE).await
  }

  pub(crate) async fn get_citizenship_changes_sized(
    &self,
    user_id: &str,
    cursor: Option<&str>,
    limit: u32,
  ) -> Result<Page<CitizenshipChange>> {
    let token = self.auth_token().ok_or(ClientError::MissingToken)?;
    let input = ActionLogsInput {
      user_id,
      action_type: CHANGED_CITIZENSHIP,
      limit,
      direction: "forward",
      cursor,
    };
    let page: Page<RawCitizenshipChange> =
      self.call(ACTION_LOGS, &input, Some(&token)).await?;
    Ok(page.map(CitizenshipChange::from_raw))
  }
}
