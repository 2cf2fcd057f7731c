//! Domain models: topic domains, difficulty tiers, questions (standard + scenario),
//! answer records and the persisted progress/badge state.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AssessmentError;

/// Cybersecurity topic area with its own question pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Domain {
  NetworkSecurity,
  SecureCoding,
  IncidentResponse,
}

impl Domain {
  pub const ALL: [Domain; 3] = [Domain::NetworkSecurity, Domain::SecureCoding, Domain::IncidentResponse];

  pub fn id(&self) -> &'static str {
    match self {
      Domain::NetworkSecurity => "network-security",
      Domain::SecureCoding => "secure-coding",
      Domain::IncidentResponse => "incident-response",
    }
  }

  /// Human-readable name, interpolated into learning-path recommendations.
  pub fn name(&self) -> &'static str {
    match self {
      Domain::NetworkSecurity => "Network Security",
      Domain::SecureCoding => "Secure Coding",
      Domain::IncidentResponse => "Incident Response",
    }
  }

  pub fn description(&self) -> &'static str {
    match self {
      Domain::NetworkSecurity => "Firewalls, intrusion detection, DDoS and network protocols.",
      Domain::SecureCoding => "OWASP risks, injection flaws, input validation and secure authentication.",
      Domain::IncidentResponse => "Detection, containment, forensics and recovery.",
    }
  }

  /// Topic hint handed to the question generator.
  pub fn generation_focus(&self) -> &'static str {
    match self {
      Domain::NetworkSecurity => "network security, firewalls, intrusion detection, DDoS attacks, network protocols",
      Domain::SecureCoding => "secure software development, OWASP vulnerabilities, SQL injection, XSS, secure authentication",
      Domain::IncidentResponse => "cybersecurity incident response, forensics, containment, recovery, threat hunting",
    }
  }
}

impl fmt::Display for Domain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.id())
  }
}

impl FromStr for Domain {
  type Err = AssessmentError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let wanted = s.trim();
    Domain::ALL
      .into_iter()
      .find(|d| d.id() == wanted)
      .ok_or_else(|| AssessmentError::DomainNotFound(wanted.to_string()))
  }
}

/// Difficulty tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
  Beginner,
  Intermediate,
  Advanced,
}

impl Tier {
  pub const ALL: [Tier; 3] = [Tier::Beginner, Tier::Intermediate, Tier::Advanced];

  pub fn as_str(&self) -> &'static str {
    match self {
      Tier::Beginner => "beginner",
      Tier::Intermediate => "intermediate",
      Tier::Advanced => "advanced",
    }
  }

  pub fn parse(s: &str) -> Option<Tier> {
    match s.trim().to_lowercase().as_str() {
      "beginner" => Some(Tier::Beginner),
      "intermediate" => Some(Tier::Intermediate),
      "advanced" => Some(Tier::Advanced),
      _ => None,
    }
  }

  /// One tier up, saturating at advanced.
  pub fn raised(self) -> Tier {
    match self {
      Tier::Beginner => Tier::Intermediate,
      Tier::Intermediate | Tier::Advanced => Tier::Advanced,
    }
  }

  /// One tier down, saturating at beginner.
  pub fn lowered(self) -> Tier {
    match self {
      Tier::Advanced => Tier::Intermediate,
      Tier::Intermediate | Tier::Beginner => Tier::Beginner,
    }
  }

  /// Wording handed to the question generator.
  pub fn generation_focus(&self) -> &'static str {
    match self {
      Tier::Beginner => "basic foundational concepts suitable for beginners with clear straightforward scenarios",
      Tier::Intermediate => "moderate complexity requiring practical knowledge and real-world application",
      Tier::Advanced => "complex scenarios requiring expert-level analysis and decision-making",
    }
  }
}

impl fmt::Display for Tier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CodeSnippet {
  pub language: String,
  pub code: String,
}

/// Plain multiple-choice question.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardQuestion {
  pub id: String,
  pub domain: Domain,
  pub difficulty: Tier,
  pub question: String,
  pub options: Vec<String>,
  pub correct: usize,
  pub explanation: String,
  #[serde(default)] pub sources: Vec<String>,
  #[serde(default)] pub ai_generated: bool,
  #[serde(default)] pub generated_at: Option<DateTime<Utc>>,
}

/// Question with narrative context, optional diagram/code and learning points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioQuestion {
  pub id: String,
  pub domain: Domain,
  pub difficulty: Tier,
  pub title: String,
  pub context: String,
  #[serde(default)] pub diagram: Option<String>,
  #[serde(default)] pub code_snippet: Option<CodeSnippet>,
  pub question: String,
  pub options: Vec<String>,
  pub correct: usize,
  pub explanation: String,
  #[serde(default)] pub learning_points: Vec<String>,
  #[serde(default)] pub sources: Vec<String>,
  #[serde(default)] pub ai_generated: bool,
  #[serde(default)] pub generated_at: Option<DateTime<Utc>>,
}

/// A question as presented to the learner. Option identity is its position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Question {
  Standard(StandardQuestion),
  Scenario(ScenarioQuestion),
}

impl Question {
  pub fn id(&self) -> &str {
    match self {
      Question::Standard(q) => &q.id,
      Question::Scenario(q) => &q.id,
    }
  }

  pub fn domain(&self) -> Domain {
    match self {
      Question::Standard(q) => q.domain,
      Question::Scenario(q) => q.domain,
    }
  }

  pub fn tier(&self) -> Tier {
    match self {
      Question::Standard(q) => q.difficulty,
      Question::Scenario(q) => q.difficulty,
    }
  }

  pub fn text(&self) -> &str {
    match self {
      Question::Standard(q) => &q.question,
      Question::Scenario(q) => &q.question,
    }
  }

  pub fn options(&self) -> &[String] {
    match self {
      Question::Standard(q) => &q.options,
      Question::Scenario(q) => &q.options,
    }
  }

  pub fn correct(&self) -> usize {
    match self {
      Question::Standard(q) => q.correct,
      Question::Scenario(q) => q.correct,
    }
  }

  pub fn explanation(&self) -> &str {
    match self {
      Question::Standard(q) => &q.explanation,
      Question::Scenario(q) => &q.explanation,
    }
  }

  pub fn learning_points(&self) -> &[String] {
    match self {
      Question::Standard(_) => &[],
      Question::Scenario(q) => &q.learning_points,
    }
  }

  pub fn sources(&self) -> &[String] {
    match self {
      Question::Standard(q) => &q.sources,
      Question::Scenario(q) => &q.sources,
    }
  }

  pub fn is_ai_generated(&self) -> bool {
    match self {
      Question::Standard(q) => q.ai_generated,
      Question::Scenario(q) => q.ai_generated,
    }
  }

  pub fn is_scenario(&self) -> bool {
    matches!(self, Question::Scenario(_))
  }

  /// Position equality against the correct option.
  pub fn is_correct(&self, selected: usize) -> bool {
    selected == self.correct()
  }

  /// Checks the structural invariants every question must satisfy before it
  /// can enter a session: non-empty id/text, at least two non-empty options and
  /// a `correct` index pointing into them.
  pub fn validate(&self) -> Result<(), String> {
    if self.id().trim().is_empty() {
      return Err("question id is empty".into());
    }
    if self.text().trim().is_empty() {
      return Err(format!("question {} has no text", self.id()));
    }
    let options = self.options();
    if options.len() < 2 {
      return Err(format!("question {} has {} option(s), need at least 2", self.id(), options.len()));
    }
    if options.iter().any(|o| o.trim().is_empty()) {
      return Err(format!("question {} has a blank option", self.id()));
    }
    if self.correct() >= options.len() {
      return Err(format!(
        "question {}: correct index {} out of range for {} options",
        self.id(),
        self.correct(),
        options.len()
      ));
    }
    Ok(())
  }
}

/// One recorded answer. Created once per presented question, never modified.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
  pub question_id: String,
  /// Tier of the question as presented.
  pub tier: Tier,
  pub selected_index: usize,
  pub correct: bool,
  /// Seconds, >= 0.
  pub response_time: f64,
  /// 1..=5.
  pub confidence: u8,
}

/// Persistent achievement marker. Earned at most once, never revoked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Badge {
  FirstAssessment,
  QuickLearner,
  SecurityExpert,
}

impl Badge {
  pub fn name(&self) -> &'static str {
    match self {
      Badge::FirstAssessment => "First Assessment",
      Badge::QuickLearner => "Quick Learner",
      Badge::SecurityExpert => "Security Expert",
    }
  }
}

/// Process-wide persisted progress.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
  #[serde(default)] pub badges: BTreeSet<Badge>,
  #[serde(default)] pub total_assessments: u32,
}
