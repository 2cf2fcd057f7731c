//! Scoring: turns a finished answer log into a report.
//!
//! Pure; the same log always yields the same numbers (except `completed_at`).

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{AnswerRecord, Domain, Tier};
use crate::error::AssessmentError;
use crate::util::round_to;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SkillLevel {
  Beginner,
  Intermediate,
  Advanced,
}

impl SkillLevel {
  pub fn from_score(score: u32) -> Self {
    match score {
      80.. => SkillLevel::Advanced,
      60..=79 => SkillLevel::Intermediate,
      _ => SkillLevel::Beginner,
    }
  }
}

/// Confidence 4-5 is high, 1-2 is low. A 3 lands in no bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfidenceBucket {
  CorrectHigh,
  CorrectLow,
  IncorrectHigh,
  IncorrectLow,
}

impl ConfidenceBucket {
  pub fn of(a: &AnswerRecord) -> Option<Self> {
    match (a.correct, a.confidence) {
      (true, 4..) => Some(Self::CorrectHigh),
      (true, ..=2) => Some(Self::CorrectLow),
      (false, 4..) => Some(Self::IncorrectHigh),
      (false, ..=2) => Some(Self::IncorrectLow),
      _ => None,
    }
  }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceMetrics {
  pub correct_with_high_confidence: u32,
  pub correct_with_low_confidence: u32,
  pub incorrect_with_high_confidence: u32,
  pub incorrect_with_low_confidence: u32,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnalysis {
  /// 1-based position in the answer log.
  pub ordinal: usize,
  pub correct: bool,
  pub confidence: u8,
  pub response_time: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierStats {
  pub total: u32,
  pub correct: u32,
  pub percentage: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TierBreakdown {
  pub beginner: TierStats,
  pub intermediate: TierStats,
  pub advanced: TierStats,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
  CalibratedConfidence,
  Underconfident,
  Overconfident,
  NoOverconfidence,
}

#[derive(Clone, Debug, Serialize)]
pub struct Insight {
  pub kind: InsightKind,
  pub message: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
  pub domain: Domain,
  /// 0..=100
  pub score: u32,
  pub correct_answers: usize,
  pub total_questions: usize,
  /// Seconds, rounded to an integer.
  pub avg_time: u64,
  /// One decimal.
  pub avg_confidence: f64,
  pub skill_level: SkillLevel,
  pub confidence_metrics: ConfidenceMetrics,
  pub question_confidence_analysis: Vec<QuestionAnalysis>,
  pub fastest_time: f64,
  pub slowest_time: f64,
  pub tier_breakdown: TierBreakdown,
  pub insights: Vec<Insight>,
  pub final_tier: Tier,
  pub recommended_tier: Tier,
  pub completed_at: DateTime<Utc>,
}

/// Next-session suggestion: step up on 85+, step down under 50.
pub fn recommended_tier(score: u32, current: Tier) -> Tier {
  if score >= 85 {
    current.raised()
  } else if score < 50 {
    current.lowered()
  } else {
    current
  }
}

pub fn compute_report(domain: Domain, answers: &[AnswerRecord], final_tier: Tier) -> Result<Report, AssessmentError> {
  if answers.is_empty() {
    return Err(AssessmentError::EmptyLog);
  }
  let total = answers.len();
  let correct = answers.iter().filter(|a| a.correct).count();
  let score = (100.0 * correct as f64 / total as f64).round() as u32;

  let total_time: f64 = answers.iter().map(|a| a.response_time).sum();
  let total_conf: f64 = answers.iter().map(|a| f64::from(a.confidence)).sum();
  let avg_time = (total_time / total as f64).round().max(0.0) as u64;
  let avg_confidence = round_to(total_conf / total as f64, 1);

  let mut metrics = ConfidenceMetrics::default();
  for a in answers {
    match ConfidenceBucket::of(a) {
      Some(ConfidenceBucket::CorrectHigh) => metrics.correct_with_high_confidence += 1,
      Some(ConfidenceBucket::CorrectLow) => metrics.correct_with_low_confidence += 1,
      Some(ConfidenceBucket::IncorrectHigh) => metrics.incorrect_with_high_confidence += 1,
      Some(ConfidenceBucket::IncorrectLow) => metrics.incorrect_with_low_confidence += 1,
      None => {}
    }
  }

  let analysis = answers
    .iter()
    .enumerate()
    .map(|(i, a)| QuestionAnalysis { ordinal: i + 1, correct: a.correct, confidence: a.confidence, response_time: a.response_time })
    .collect();

  let fastest = answers.iter().map(|a| a.response_time).fold(f64::INFINITY, f64::min);
  let slowest = answers.iter().map(|a| a.response_time).fold(0.0, f64::max);

  let insights = insights_for(&metrics);

  Ok(Report {
    domain,
    score,
    correct_answers: correct,
    total_questions: total,
    avg_time,
    avg_confidence,
    skill_level: SkillLevel::from_score(score),
    confidence_metrics: metrics,
    question_confidence_analysis: analysis,
    fastest_time: round_to(fastest, 2),
    slowest_time: round_to(slowest, 2),
    tier_breakdown: tier_breakdown(answers),
    insights,
    final_tier,
    recommended_tier: recommended_tier(score, final_tier),
    completed_at: Utc::now(),
  })
}

fn tier_breakdown(answers: &[AnswerRecord]) -> TierBreakdown {
  let stats = |tier: Tier| {
    let (total, correct) = answers
      .iter()
      .filter(|a| a.tier == tier)
      .fold((0u32, 0u32), |(t, c), a| (t + 1, c + u32::from(a.correct)));
    let percentage = if total == 0 { 0.0 } else { round_to(100.0 * f64::from(correct) / f64::from(total), 1) };
    TierStats { total, correct, percentage }
  };
  TierBreakdown {
    beginner: stats(Tier::Beginner),
    intermediate: stats(Tier::Intermediate),
    advanced: stats(Tier::Advanced),
  }
}

fn insights_for(m: &ConfidenceMetrics) -> Vec<Insight> {
  let mut out = Vec::with_capacity(2);
  if m.correct_with_high_confidence >= m.correct_with_low_confidence {
    out.push(Insight {
      kind: InsightKind::CalibratedConfidence,
      message: "Your confidence aligns well with your accuracy. You know what you know!".into(),
    });
  } else {
    out.push(Insight {
      kind: InsightKind::Underconfident,
      message: "You might be underestimating yourself - you got many correct even with low confidence.".into(),
    });
  }
  if m.incorrect_with_high_confidence > 0 {
    out.push(Insight {
      kind: InsightKind::Overconfident,
      message: format!("Review the {} questions where you were confident but incorrect.", m.incorrect_with_high_confidence),
    });
  } else {
    out.push(Insight {
      kind: InsightKind::NoOverconfidence,
      message: "Great! You weren't overconfident on any incorrect answers.".into(),
    });
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  fn rec(tier: Tier, correct: bool, time: f64, confidence: u8) -> AnswerRecord {
    AnswerRecord { question_id: "q".into(), tier, selected_index: 0, correct, response_time: time, confidence }
  }

  fn log(correct: usize, total: usize) -> Vec<AnswerRecord> {
    (0..total).map(|i| rec(Tier::Beginner, i < correct, 5.0, 3)).collect()
  }

  #[test]
  fn three_answer_run_rounds_time_and_buckets_one_low_miss() {
    let answers = vec![
      rec(Tier::Beginner, true, 8.0, 5),
      rec(Tier::Beginner, true, 6.0, 4),
      rec(Tier::Intermediate, false, 12.0, 1),
    ];
    let r = compute_report(Domain::SecureCoding, &answers, Tier::Intermediate).unwrap();
    assert_eq!(r.score, 67);
    assert_eq!(r.avg_time, 9);
    assert_eq!(r.avg_confidence, 3.3);
    assert_eq!(r.skill_level, SkillLevel::Intermediate);
    assert_eq!(
      r.confidence_metrics,
      ConfidenceMetrics {
        correct_with_high_confidence: 2,
        correct_with_low_confidence: 0,
        incorrect_with_high_confidence: 0,
        incorrect_with_low_confidence: 1,
      }
    );
    assert_eq!(r.fastest_time, 6.0);
    assert_eq!(r.slowest_time, 12.0);
  }

  #[test]
  fn secure_coding_mixed_run() {
    let answers = vec![
      rec(Tier::Beginner, true, 8.0, 4),
      rec(Tier::Beginner, true, 10.0, 5),
      rec(Tier::Intermediate, true, 9.0, 3),
      rec(Tier::Intermediate, false, 9.0, 2),
      rec(Tier::Intermediate, true, 9.0, 3),
      rec(Tier::Advanced, false, 9.0, 3),
    ];
    let r = compute_report(Domain::SecureCoding, &answers, Tier::Intermediate).unwrap();
    assert_eq!(r.score, 67);
    assert_eq!(r.correct_answers, 4);
    assert_eq!(r.total_questions, 6);
    assert_eq!(r.avg_time, 9);
    assert_eq!(r.avg_confidence, 3.3);
    assert_eq!(r.skill_level, SkillLevel::Intermediate);
    assert_eq!(
      r.confidence_metrics,
      ConfidenceMetrics {
        correct_with_high_confidence: 2,
        correct_with_low_confidence: 0,
        incorrect_with_high_confidence: 0,
        incorrect_with_low_confidence: 1,
      }
    );
    assert_eq!(r.fastest_time, 8.0);
    assert_eq!(r.slowest_time, 10.0);
    assert_eq!(r.recommended_tier, Tier::Intermediate);
    assert_eq!(r.insights[0].kind, InsightKind::CalibratedConfidence);
    assert_eq!(r.insights[1].kind, InsightKind::NoOverconfidence);
  }

  #[test]
  fn analysis_is_one_based_and_in_order() {
    let answers = vec![rec(Tier::Beginner, false, 1.5, 1), rec(Tier::Beginner, true, 2.5, 5)];
    let r = compute_report(Domain::NetworkSecurity, &answers, Tier::Beginner).unwrap();
    let ordinals: Vec<usize> = r.question_confidence_analysis.iter().map(|a| a.ordinal).collect();
    assert_eq!(ordinals, vec![1, 2]);
    assert!(!r.question_confidence_analysis[0].correct);
    assert_eq!(r.question_confidence_analysis[1].confidence, 5);
  }

  #[test]
  fn skill_level_boundaries() {
    assert_eq!(SkillLevel::from_score(100), SkillLevel::Advanced);
    assert_eq!(SkillLevel::from_score(80), SkillLevel::Advanced);
    assert_eq!(SkillLevel::from_score(79), SkillLevel::Intermediate);
    assert_eq!(SkillLevel::from_score(60), SkillLevel::Intermediate);
    assert_eq!(SkillLevel::from_score(59), SkillLevel::Beginner);
    assert_eq!(SkillLevel::from_score(0), SkillLevel::Beginner);
  }

  #[test]
  fn score_rounds_half_up() {
    assert_eq!(compute_report(Domain::SecureCoding, &log(1, 3), Tier::Beginner).unwrap().score, 33);
    assert_eq!(compute_report(Domain::SecureCoding, &log(2, 3), Tier::Beginner).unwrap().score, 67);
    assert_eq!(compute_report(Domain::SecureCoding, &log(1, 8), Tier::Beginner).unwrap().score, 13);
    assert_eq!(compute_report(Domain::SecureCoding, &log(7, 7), Tier::Beginner).unwrap().score, 100);
  }

  #[test]
  fn confidence_three_is_in_no_bucket() {
    let r = compute_report(Domain::IncidentResponse, &log(2, 4), Tier::Beginner).unwrap();
    assert_eq!(r.confidence_metrics, ConfidenceMetrics::default());
    assert_eq!(r.avg_confidence, 3.0);
  }

  #[test]
  fn buckets_never_exceed_answer_count() {
    let answers: Vec<AnswerRecord> = (1..=5u8)
      .flat_map(|c| [rec(Tier::Beginner, true, 1.0, c), rec(Tier::Beginner, false, 1.0, c)])
      .collect();
    let r = compute_report(Domain::IncidentResponse, &answers, Tier::Beginner).unwrap();
    let m = &r.confidence_metrics;
    let bucketed = m.correct_with_high_confidence + m.correct_with_low_confidence + m.incorrect_with_high_confidence + m.incorrect_with_low_confidence;
    assert_eq!(bucketed, 8);
    assert!(bucketed as usize <= r.total_questions);
  }

  #[test]
  fn insights_flag_underconfidence_and_overconfidence() {
    let answers = vec![
      rec(Tier::Beginner, true, 3.0, 1),
      rec(Tier::Beginner, true, 3.0, 2),
      rec(Tier::Beginner, false, 3.0, 5),
    ];
    let r = compute_report(Domain::NetworkSecurity, &answers, Tier::Beginner).unwrap();
    assert_eq!(r.insights[0].kind, InsightKind::Underconfident);
    assert_eq!(r.insights[1].kind, InsightKind::Overconfident);
    assert_eq!(r.insights[1].message, "Review the 1 questions where you were confident but incorrect.");
  }

  #[test]
  fn tier_breakdown_counts_per_tier() {
    let answers = vec![
      rec(Tier::Beginner, true, 1.0, 3),
      rec(Tier::Beginner, false, 1.0, 3),
      rec(Tier::Advanced, true, 1.0, 3),
    ];
    let b = compute_report(Domain::NetworkSecurity, &answers, Tier::Advanced).unwrap().tier_breakdown;
    assert_eq!(b.beginner, TierStats { total: 2, correct: 1, percentage: 50.0 });
    assert_eq!(b.intermediate, TierStats::default());
    assert_eq!(b.advanced.percentage, 100.0);
  }

  #[test]
  fn recommended_tier_moves_one_step() {
    assert_eq!(recommended_tier(90, Tier::Intermediate), Tier::Advanced);
    assert_eq!(recommended_tier(90, Tier::Advanced), Tier::Advanced);
    assert_eq!(recommended_tier(40, Tier::Intermediate), Tier::Beginner);
    assert_eq!(recommended_tier(60, Tier::Intermediate), Tier::Intermediate);
  }

  #[test]
  fn empty_log_is_rejected() {
    assert!(matches!(compute_report(Domain::SecureCoding, &[], Tier::Beginner), Err(AssessmentError::EmptyLog)));
  }
}
