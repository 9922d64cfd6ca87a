//! Error type for `citrack-client`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
  /// An authenticated call was attempted before a token was set. No request
  /// was sent.
  #[error("authorization token not set")]
  MissingToken,

  #[error("failed to build HTTP client: {0}")]
  Build(#[source] reqwest::Error),

  #[error("encoding input for {procedure}: {source}")]
  Encode {
    procedure: &'static str,
    #[source]
    source:    serde_json::Error,
  },

  #[error("{procedure} failed: {source}")]
  Http {
    procedure: &'static str,
    #[source]
    source:    reqwest::Error,
  },

  #[error("{procedure} → {status}")]
  Status {
    procedure: &'static str,
    status:    reqwest::StatusCode,
  },

  #[error("deserialising {procedure}: {source}")]
  Decode {
    procedure: &'static str,
    #[source]
    source:    serde_json::Error,
  },
}

impl ClientError {
  /// True for the fail-fast credential error, as opposed to anything the
  /// network or the upstream produced.
  pub fn is_missing_token(&self) -> bool { matches!(self, Self::MissingToken) }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
