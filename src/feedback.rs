//! Personalised coaching feedback on a finished assessment.
//!
//! An optional `FeedbackProvider` turns a scored report into a short summary,
//! strengths, improvement areas, resource-linked study topics and next steps.
//! Like question augmentation it is best-effort: a missing provider, an error,
//! a timeout or an unusable answer all yield `None` and never fail finalize.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::ProviderError;
use crate::scoring::Report;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiFeedback {
  pub feedback_summary: String,
  #[serde(default)]
  pub strengths: Vec<String>,
  #[serde(default)]
  pub improvements: Vec<String>,
  #[serde(default)]
  pub learning_path: Vec<StudyTopic>,
  #[serde(default)]
  pub next_steps: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StudyTopic {
  pub topic: String,
  #[serde(default)]
  pub resources: Vec<Resource>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resource {
  pub title: String,
  pub url: String,
  /// course, documentation, lab or article.
  #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
  pub kind: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

impl AiFeedback {
  /// Requires a summary; drops topics without a name and resources that do
  /// not point at an http(s) URL.
  pub fn sanitized(mut self) -> Result<Self, ProviderError> {
    if self.feedback_summary.trim().is_empty() {
      return Err(ProviderError::Malformed("feedback has no summary".into()));
    }
    self.learning_path.retain(|t| !t.topic.trim().is_empty());
    for topic in &mut self.learning_path {
      topic.resources.retain(|r| !r.title.trim().is_empty() && (r.url.starts_with("https://") || r.url.starts_with("http://")));
    }
    Ok(self)
  }
}

#[async_trait]
pub trait FeedbackProvider: Send + Sync {
  /// Short name for logs.
  fn name(&self) -> &'static str;

  async fn feedback(&self, report: &Report) -> Result<AiFeedback, ProviderError>;
}

/// Ask the provider for feedback on `report`, waiting at most `limit`.
#[instrument(level = "info", skip(provider, report), fields(domain = %report.domain, score = report.score))]
pub async fn request_feedback(provider: Option<&dyn FeedbackProvider>, report: &Report, limit: Duration) -> Option<AiFeedback> {
  let Some(provider) = provider else {
    debug!(target: "assessment", "No feedback provider configured");
    return None;
  };

  let result = match tokio::time::timeout(limit, provider.feedback(report)).await {
    Ok(r) => r,
    Err(_) => Err(ProviderError::Timeout),
  };

  match result.and_then(AiFeedback::sanitized) {
    Ok(fb) => {
      info!(target: "assessment", provider = provider.name(), topics = fb.learning_path.len(), "AI feedback attached");
      Some(fb)
    }
    Err(e) => {
      warn!(target: "assessment", provider = provider.name(), error = %e, "AI feedback unavailable");
      None
    }
  }
}
