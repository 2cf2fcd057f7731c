//! Loading application configuration (generation prompts, adaptive policy and
//! optional extra bank questions) from TOML.
//!
//! See `AppConfig`, `Prompts` and `AdaptiveConfig` for the expected schema.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::CodeSnippet;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub adaptive: AdaptiveConfig,
  #[serde(default)]
  pub sessions: SessionsConfig,
  #[serde(default)]
  pub questions: Vec<QuestionCfg>,
}

/// Extra bank entry accepted in TOML configuration.
/// Filling `title` + `context` turns the entry into a scenario question.
#[derive(Clone, Debug, Deserialize)]
pub struct QuestionCfg {
  #[serde(default)] pub id: Option<String>,
  pub domain: String,
  pub difficulty: String,
  pub question: String,
  pub options: Vec<String>,
  pub correct: usize,
  #[serde(default)] pub explanation: String,
  // scenario
  #[serde(default)] pub title: Option<String>,
  #[serde(default)] pub context: Option<String>,
  #[serde(default)] pub diagram: Option<String>,
  #[serde(default)] pub code_snippet: Option<CodeSnippet>,
  #[serde(default)] pub learning_points: Vec<String>,
  #[serde(default)] pub sources: Vec<String>,
}

/// Knobs of the adaptive-difficulty policy.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdaptiveConfig {
  /// Escalation never happens once this many questions have been presented.
  pub max_presented: usize,
  /// How many of the most recent answers are inspected at sequence exhaustion.
  pub lookback: usize,
  /// How many of those must be correct to escalate.
  pub required_correct: usize,
  /// Promote the tier on fast correct answers (beginner < 10 s, intermediate < 8 s).
  pub fast_promotion: bool,
  /// Upper bound on the wait for external questions when starting a session.
  pub augment_timeout_secs: u64,
}

impl Default for AdaptiveConfig {
  fn default() -> Self {
    Self {
      max_presented: 7,
      lookback: 2,
      required_correct: 2,
      fast_promotion: true,
      augment_timeout_secs: 25,
    }
  }
}

/// Housekeeping of the HTTP session table.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionsConfig {
  /// Sessions with no transition for this long are dropped.
  pub idle_timeout_secs: u64,
  pub sweep_interval_secs: u64,
}

impl Default for SessionsConfig {
  fn default() -> Self {
    Self { idle_timeout_secs: 7200, sweep_interval_secs: 300 }
  }
}

impl SessionsConfig {
  pub fn idle_timeout(&self) -> Duration {
    Duration::from_secs(self.idle_timeout_secs)
  }

  /// Never zero; `tokio::time::interval` rejects it.
  pub fn sweep_interval(&self) -> Duration {
    Duration::from_secs(self.sweep_interval_secs.max(1))
  }
}

/// Prompts used by the question generator and the feedback coach. Defaults
/// target cybersecurity education aligned with NIST CSF / ENISA; override them
/// in TOML to tune tone. Missing keys keep their defaults.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub question_system: String,
  pub question_user_template: String,
  pub feedback_system: String,
  /// Placeholders: {domain} {score} {correct} {total} {tier} {avg_time}
  pub feedback_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      question_system: "You are a cybersecurity education expert. Respond ONLY with a strict JSON array, no prose and no Markdown.".into(),
      question_user_template: r#"Generate {count} multiple-choice assessment question(s) about {domain_focus} at the level of {difficulty_focus}.

REQUIREMENTS:
- Realistic, scenario-driven questions aligned with NIST CSF, ENISA and ECSO guidance.
- A compelling title and 1-2 sentences of scenario context.
- Where it helps, a small ASCII network diagram or a short vulnerable code sample.
- Exactly 4 detailed answer options.
- An explanation marking the correct reasoning with ✓ and wrong options with ✗.
- 3-4 key learning points and 2-3 reputable source URLs.

Return a JSON array of objects with fields:
title, context, diagram (optional ASCII art), codeSnippet (optional object with
language and code), question, options (array of 4 strings), correct (0-based index),
explanation, learningPoints (array), sources (array), difficulty ("{difficulty}").
Generate exactly {count} item(s)."#.into(),
      feedback_system: "You are a cybersecurity learning coach. Respond ONLY with a strict JSON object, no prose and no Markdown.".into(),
      feedback_user_template: r#"Analyze these assessment results and give personalised feedback and learning recommendations.

ASSESSMENT RESULTS:
- Domain: {domain}
- Score: {score}%
- Correct: {correct}/{total}
- Difficulty level reached: {tier}
- Average time: {avg_time} seconds per question

REQUIREMENTS:
- Encouraging, personalised feedback (2-3 sentences).
- A learning path of 3-4 high-quality resources mixing courses, documentation, labs and articles.
- Only real, reachable URLs.

Return a JSON object with fields:
feedbackSummary (string), strengths (array), improvements (array),
learningPath (array of {topic, resources: [{title, url, type, description}]}),
nextSteps (array of 3 actionable steps)."#.into(),
    }
  }
}

/// Attempt to load `AppConfig` from ASSESSMENT_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("ASSESSMENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_app_config(&s) {
      Ok(cfg) => {
        info!(target: "cyberhubs_backend", %path, extra_questions = cfg.questions.len(), "Loaded assessment config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "cyberhubs_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "cyberhubs_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn parse_app_config(s: &str) -> Result<AppConfig, toml::de::Error> {
  toml::from_str::<AppConfig>(s)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_config_uses_defaults() {
    let cfg = parse_app_config("").unwrap();
    assert_eq!(cfg.adaptive, AdaptiveConfig::default());
    assert_eq!(cfg.adaptive.max_presented, 7);
    assert!(cfg.questions.is_empty());
    assert!(cfg.prompts.question_user_template.contains("{count}"));
    assert_eq!(cfg.sessions, SessionsConfig::default());
  }

  #[test]
  fn sessions_section_overrides_idle_timeout() {
    let cfg = parse_app_config("[sessions]\nidle_timeout_secs = 600\nsweep_interval_secs = 0\n").unwrap();
    assert_eq!(cfg.sessions.idle_timeout(), Duration::from_secs(600));
    assert_eq!(cfg.sessions.sweep_interval(), Duration::from_secs(1));
  }

  #[test]
  fn partial_prompts_section_keeps_feedback_defaults() {
    let cfg = parse_app_config("[prompts]\nquestion_system = \"Be terse.\"\n").unwrap();
    assert_eq!(cfg.prompts.question_system, "Be terse.");
    assert!(cfg.prompts.question_user_template.contains("{count}"));
    assert!(cfg.prompts.feedback_user_template.contains("{avg_time}"));
  }

  #[test]
  fn partial_adaptive_section_keeps_other_defaults() {
    let cfg = parse_app_config("[adaptive]\nfast_promotion = false\n").unwrap();
    assert!(!cfg.adaptive.fast_promotion);
    assert_eq!(cfg.adaptive.lookback, 2);
    assert_eq!(cfg.adaptive.required_correct, 2);
  }

  #[test]
  fn parses_extra_questions() {
    let cfg = parse_app_config(
      r#"
[[questions]]
domain = "network-security"
difficulty = "advanced"
question = "Which port does DNS use by default?"
options = ["53", "80", "443"]
correct = 0
explanation = "DNS listens on 53."
"#,
    )
    .unwrap();
    assert_eq!(cfg.questions.len(), 1);
    assert_eq!(cfg.questions[0].options.len(), 3);
    assert!(cfg.questions[0].title.is_none());
    assert!(cfg.questions[0].code_snippet.is_none());
  }

  #[test]
  fn parses_scenario_with_code_snippet() {
    let cfg = parse_app_config(
      r#"
[[questions]]
domain = "secure-coding"
difficulty = "intermediate"
title = "Template injection"
context = "A report generator renders user input."
diagram = "[Browser] -> [App] -> [Renderer]"
question = "What is the flaw?"
options = ["SSTI", "CSRF", "XXE", "None"]
correct = 0

[questions.code_snippet]
language = "python"
code = "render_template_string(request.args['name'])"
"#,
    )
    .unwrap();
    let q = &cfg.questions[0];
    assert_eq!(q.diagram.as_deref(), Some("[Browser] -> [App] -> [Renderer]"));
    assert_eq!(q.code_snippet.as_ref().map(|c| c.language.as_str()), Some("python"));
  }
}
