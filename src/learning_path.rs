//! Learning-path recommender: maps (domain, score) to a tiered path.

use serde::Serialize;

use crate::domain::Domain;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PathTier {
  Advanced,
  Intermediate,
  Foundation,
}

impl PathTier {
  pub fn from_score(score: u32) -> Self {
    match score {
      80.. => PathTier::Advanced,
      60..=79 => PathTier::Intermediate,
      _ => PathTier::Foundation,
    }
  }

  /// Stable key for client-side localisation.
  pub fn title_key(&self) -> &'static str {
    match self {
      PathTier::Advanced => "advancedSpec",
      PathTier::Intermediate => "skillEnhance",
      PathTier::Foundation => "foundationBuild",
    }
  }

  pub fn title(&self) -> &'static str {
    match self {
      PathTier::Advanced => "Advanced Specialization",
      PathTier::Intermediate => "Skill Enhancement",
      PathTier::Foundation => "Foundation Building",
    }
  }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPath {
  pub domain: Domain,
  pub tier: PathTier,
  pub title_key: &'static str,
  pub title: &'static str,
  pub recommendations: [String; 4],
}

pub fn recommend(domain: Domain, score: u32) -> LearningPath {
  let tier = PathTier::from_score(score);
  let name = domain.name();
  let recommendations = match tier {
    PathTier::Advanced => [
      format!("Advanced {name} certification (e.g., OSCP, CEH)"),
      "Capture The Flag (CTF) competitions".into(),
      "Contribute to open-source security projects".into(),
      "Mentor junior professionals in your area".into(),
    ],
    PathTier::Intermediate => [
      format!("Intermediate {name} online courses"),
      "Hands-on labs and practice environments".into(),
      "Join CyberHubs community workshops".into(),
      "Read industry whitepapers and case studies".into(),
    ],
    PathTier::Foundation => [
      format!("{name} fundamentals course"),
      "Interactive tutorials and guided exercises".into(),
      "Study NIST and ENISA frameworks".into(),
      "Connect with study groups in your country".into(),
    ],
  };
  LearningPath { domain, tier, title_key: tier.title_key(), title: tier.title(), recommendations }
}
