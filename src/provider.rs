//! External question provider boundary.
//!
//! A provider asynchronously returns zero or more generated questions for a
//! (domain, tier, count) request, or fails. Callers treat every failure as
//! non-fatal; `screen` enforces the question invariants on whatever comes back.

use async_trait::async_trait;
use tracing::warn;

use crate::domain::{Domain, Question, Tier};
use crate::error::ProviderError;

#[async_trait]
pub trait QuestionProvider: Send + Sync {
  /// Short name for logs.
  fn name(&self) -> &'static str;

  async fn fetch_questions(&self, domain: Domain, tier: Tier, count: usize) -> Result<Vec<Question>, ProviderError>;
}

/// Drops items that violate the question invariants, belong to another domain
/// or are not flagged as generated. An empty input is fine; a non-empty input
/// with nothing left is `Malformed`.
pub fn screen(domain: Domain, items: Vec<Question>) -> Result<Vec<Question>, ProviderError> {
  if items.is_empty() {
    return Ok(items);
  }
  let received = items.len();
  let mut last_problem = String::new();
  let kept: Vec<Question> = items
    .into_iter()
    .filter(|q| {
      let problem = match q.validate() {
        Err(e) => Some(e),
        Ok(()) if q.domain() != domain => Some(format!("question {} is for domain {}, wanted {}", q.id(), q.domain(), domain)),
        Ok(()) if !q.is_ai_generated() => Some(format!("question {} is not flagged as generated", q.id())),
        Ok(()) => None,
      };
      match problem {
        Some(p) => {
          warn!(target: "provider", %domain, problem = %p, "Discarding generated question");
          last_problem = p;
          false
        }
        None => true,
      }
    })
    .collect();

  if kept.is_empty() {
    return Err(ProviderError::Malformed(format!("all {received} item(s) rejected; last: {last_problem}")));
  }
  Ok(kept)
}
