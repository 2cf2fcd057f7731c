//! Error taxonomy for the assessment engine, the external question provider and
//! the progress store.

use thiserror::Error;
use uuid::Uuid;

/// Failures of the assessment engine that the caller must act on.
#[derive(Debug, Error)]
pub enum AssessmentError {
  #[error("unknown domain: {0}")]
  DomainNotFound(String),

  /// Finalize was called before any answer was recorded.
  #[error("cannot score an assessment with no recorded answers")]
  EmptyLog,

  /// Finalize was called before the termination condition was reached.
  #[error("assessment is still in progress")]
  NotFinished,

  #[error("no active assessment with id {0}")]
  SessionNotFound(Uuid),
}

/// Failures of the external question provider. Never surfaced to the learner.
#[derive(Debug, Error)]
pub enum ProviderError {
  #[error("transport error: {0}")]
  Transport(String),

  #[error("provider HTTP {status}: {message}")]
  Http { status: u16, message: String },

  #[error("provider did not answer in time")]
  Timeout,

  #[error("provider returned no content")]
  EmptyResponse,

  #[error("could not parse provider response: {0}")]
  Parse(String),

  /// Response parsed but no item satisfied the question invariants.
  #[error("malformed question from provider: {0}")]
  Malformed(String),
}

impl From<reqwest::Error> for ProviderError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_timeout() {
      ProviderError::Timeout
    } else {
      ProviderError::Transport(e.to_string())
    }
  }
}

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("progress store I/O: {0}")]
  Io(#[from] std::io::Error),

  #[error("progress store encoding: {0}")]
  Serde(#[from] serde_json::Error),
}
