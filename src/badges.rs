//! Badge evaluation on assessment completion.
//!
//! Rules are checked against the progress as it was *before* this assessment:
//!   firstAssessment  prior total == 0
//!   quickLearner     score >= 70
//!   securityExpert   score >= 90
//! Badges already held are not reported again. The total always goes up by one.

use serde::Serialize;
use tracing::info;

use crate::domain::{Badge, Progress};
use crate::progress::ProgressTracker;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeOutcome {
  pub newly_earned: Vec<Badge>,
  pub progress: Progress,
}

pub fn evaluate(prior: &Progress, score: u32) -> BadgeOutcome {
  let qualifies = [
    (Badge::FirstAssessment, prior.total_assessments == 0),
    (Badge::QuickLearner, score >= 70),
    (Badge::SecurityExpert, score >= 90),
  ];

  let mut progress = prior.clone();
  let newly_earned = qualifies
    .into_iter()
    .filter(|(_, ok)| *ok)
    .filter_map(|(b, _)| progress.badges.insert(b).then_some(b))
    .collect();
  progress.total_assessments = prior.total_assessments.saturating_add(1);

  BadgeOutcome { newly_earned, progress }
}

/// Evaluate and persist as one step.
pub async fn award(tracker: &ProgressTracker, score: u32) -> BadgeOutcome {
  let outcome = tracker
    .commit_with(|prior| {
      let outcome = evaluate(prior, score);
      (outcome.progress.clone(), outcome)
    })
    .await;
  info!(
    target: "assessment",
    score,
    total = outcome.progress.total_assessments,
    new_badges = ?outcome.newly_earned,
    "Progress updated"
  );
  outcome
}
