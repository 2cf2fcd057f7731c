//! Minimal Gemini (`generateContent`) client used as the external question
//! provider and as the feedback coach on finished assessments.
//!
//! We request strict JSON, tolerate Markdown fences around it, and validate
//! every item before it can reach a session or a result.
//! Calls are instrumented and log model name, latency and response size (not contents).
//!
//! NOTE: the API key travels in the query string; never log the request URL.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::config::Prompts;
use crate::domain::{CodeSnippet, Domain, Question, ScenarioQuestion, StandardQuestion, Tier};
use crate::error::ProviderError;
use crate::feedback::{AiFeedback, FeedbackProvider};
use crate::provider::{screen, QuestionProvider};
use crate::scoring::Report;
use crate::util::{fill_template, strip_code_fences, trunc_for_log};

#[derive(Clone)]
pub struct Gemini {
  pub client: reqwest::Client,
  api_key: String,
  pub base_url: String,
  pub model: String,
  prompts: Prompts,
}

impl Gemini {
  /// Construct the client if we find GEMINI_API_KEY; `Ok(None)` without one.
  pub fn from_env(prompts: Prompts) -> Result<Option<Self>, ProviderError> {
    let base_url = std::env::var("GEMINI_BASE_URL")
      .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta/models".into());
    let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-pro".into());
    let timeout_secs = std::env::var("GEMINI_TIMEOUT_SECS")
      .ok()
      .and_then(|s| s.parse::<u64>().ok())
      .unwrap_or(20);
    Self::with_key(std::env::var("GEMINI_API_KEY").ok(), base_url, model, Duration::from_secs(timeout_secs), prompts)
  }

  /// A blank or missing key disables the client; a client that cannot be
  /// built is an error so the caller can tell the two apart.
  pub fn with_key(api_key: Option<String>, base_url: String, model: String, timeout: Duration, prompts: Prompts) -> Result<Option<Self>, ProviderError> {
    let Some(api_key) = api_key.filter(|k| !k.trim().is_empty()) else {
      return Ok(None);
    };
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| ProviderError::Transport(format!("building HTTP client: {e}")))?;
    Ok(Some(Self { client, api_key, base_url, model, prompts }))
  }

  /// Single-turn `generateContent` call returning the first candidate's text.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model))]
  async fn generate_text(&self, system: &str, user: &str, temperature: f32, max_output_tokens: u32) -> Result<String, ProviderError> {
    let url = format!("{}/{}:generateContent", self.base_url.trim_end_matches('/'), self.model);
    let req = GenerateRequest {
      system_instruction: Some(Content { role: None, parts: vec![Part { text: system.into() }] }),
      contents: vec![Content { role: Some("user".into()), parts: vec![Part { text: user.into() }] }],
      generation_config: GenerationConfig { temperature, top_k: 40, top_p: 0.95, max_output_tokens },
    };

    let res = self.client.post(&url)
      .query(&[("key", self.api_key.as_str())])
      .header(USER_AGENT, "cyberhubs-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_gemini_error(&body).unwrap_or(body);
      return Err(ProviderError::Http { status, message });
    }

    let body: GenerateResponse = res.json().await.map_err(|e| ProviderError::Parse(e.to_string()))?;
    if let Some(usage) = &body.usage_metadata {
      info!(target: "provider", prompt_tokens = ?usage.prompt_token_count, candidates_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, "Gemini usage");
    }
    let text = body.candidates.into_iter().next()
      .and_then(|c| c.content)
      .and_then(|c| c.parts.into_iter().next())
      .map(|p| p.text)
      .unwrap_or_default();

    if text.trim().is_empty() {
      return Err(ProviderError::EmptyResponse);
    }
    Ok(text)
  }
}

#[async_trait]
impl QuestionProvider for Gemini {
  fn name(&self) -> &'static str { "gemini" }

  #[instrument(level = "info", skip(self))]
  async fn fetch_questions(&self, domain: Domain, tier: Tier, count: usize) -> Result<Vec<Question>, ProviderError> {
    let count_s = count.to_string();
    let user = fill_template(
      &self.prompts.question_user_template,
      &[
        ("count", &count_s),
        ("domain_focus", domain.generation_focus()),
        ("difficulty_focus", tier.generation_focus()),
        ("difficulty", tier.as_str()),
      ],
    );

    let start = Instant::now();
    let result = self.generate_text(&self.prompts.question_system, &user, 0.7, 2048).await;
    let elapsed = start.elapsed();

    let text = match result {
      Ok(t) => {
        info!(target: "provider", ?elapsed, response_len = t.len(), "Model response received");
        t
      }
      Err(e) => {
        error!(target: "provider", ?elapsed, error = %e, "Model call failed during question generation");
        return Err(e);
      }
    };

    let mut questions = parse_generated_questions(&text, domain, tier).map_err(|e| {
      error!(target: "provider", error = %e, preview = %trunc_for_log(&text, 120), "Generated questions rejected");
      e
    })?;
    questions.truncate(count);
    info!(target: "provider", accepted = questions.len(), "Generated questions accepted");
    Ok(questions)
  }
}

#[async_trait]
impl FeedbackProvider for Gemini {
  fn name(&self) -> &'static str { "gemini" }

  #[instrument(level = "info", skip(self, report), fields(domain = %report.domain, score = report.score))]
  async fn feedback(&self, report: &Report) -> Result<AiFeedback, ProviderError> {
    let score = report.score.to_string();
    let correct = report.correct_answers.to_string();
    let total = report.total_questions.to_string();
    let avg_time = report.avg_time.to_string();
    let user = fill_template(
      &self.prompts.feedback_user_template,
      &[
        ("domain", report.domain.name()),
        ("score", &score),
        ("correct", &correct),
        ("total", &total),
        ("tier", report.final_tier.as_str()),
        ("avg_time", &avg_time),
      ],
    );

    let start = Instant::now();
    let text = self.generate_text(&self.prompts.feedback_system, &user, 0.7, 2048).await.map_err(|e| {
      error!(target: "provider", elapsed = ?start.elapsed(), error = %e, "Model call failed during feedback generation");
      e
    })?;
    info!(target: "provider", elapsed = ?start.elapsed(), response_len = text.len(), "Feedback response received");

    parse_feedback(&text).map_err(|e| {
      error!(target: "provider", error = %e, preview = %trunc_for_log(&text, 120), "Generated feedback rejected");
      e
    })
  }
}

/// Parse model output into coaching feedback.
pub fn parse_feedback(text: &str) -> Result<AiFeedback, ProviderError> {
  let payload = strip_code_fences(text);
  serde_json::from_str::<AiFeedback>(payload)
    .map_err(|e| ProviderError::Parse(e.to_string()))?
    .sanitized()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedItem {
  #[serde(default)] title: String,
  #[serde(default)] context: String,
  #[serde(default)] diagram: Option<String>,
  #[serde(default)] code_snippet: Option<CodeSnippet>,
  question: String,
  options: Vec<String>,
  correct: usize,
  #[serde(default)] explanation: String,
  #[serde(default)] learning_points: Vec<String>,
  #[serde(default)] sources: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
  Many(Vec<GeneratedItem>),
  One(GeneratedItem),
}

/// Parse model output into questions for `domain`/`tier`. Items carrying scenario
/// context become scenario questions; everything is stamped as generated and
/// screened against the question invariants.
pub fn parse_generated_questions(text: &str, domain: Domain, tier: Tier) -> Result<Vec<Question>, ProviderError> {
  let payload = strip_code_fences(text);
  let items = match serde_json::from_str::<OneOrMany>(payload).map_err(|e| ProviderError::Parse(e.to_string()))? {
    OneOrMany::Many(v) => v,
    OneOrMany::One(item) => vec![item],
  };

  let now = Utc::now();
  let questions = items
    .into_iter()
    .map(|g| {
      let id = format!("ai-{}-{}-{}", domain, tier, Uuid::new_v4());
      if g.context.trim().is_empty() {
        Question::Standard(StandardQuestion {
          id,
          domain,
          difficulty: tier,
          question: g.question,
          options: g.options,
          correct: g.correct,
          explanation: g.explanation,
          sources: g.sources,
          ai_generated: true,
          generated_at: Some(now),
        })
      } else {
        Question::Scenario(ScenarioQuestion {
          id,
          domain,
          difficulty: tier,
          title: g.title,
          context: g.context,
          diagram: g.diagram.filter(|d| !d.trim().is_empty()),
          code_snippet: g.code_snippet.filter(|c| !c.code.trim().is_empty()),
          question: g.question,
          options: g.options,
          correct: g.correct,
          explanation: g.explanation,
          learning_points: g.learning_points,
          sources: g.sources,
          ai_generated: true,
          generated_at: Some(now),
        })
      }
    })
    .collect();

  screen(domain, questions)
}

// --- generateContent DTOs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
  #[serde(skip_serializing_if = "Option::is_none")]
  system_instruction: Option<Content>,
  contents: Vec<Content>,
  generation_config: GenerationConfig,
}
#[derive(Serialize, Deserialize)]
struct Content {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  role: Option<String>,
  #[serde(default)]
  parts: Vec<Part>,
}
#[derive(Serialize, Deserialize)]
struct Part { #[serde(default)] text: String }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
  temperature: f32,
  top_k: u32,
  top_p: f32,
  max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
  #[serde(default)] candidates: Vec<Candidate>,
  #[serde(default)] usage_metadata: Option<UsageMetadata>,
}
#[derive(Deserialize)]
struct Candidate { #[serde(default)] content: Option<Content> }
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}

/// Try to extract a clean error message from a Gemini error body.
fn extract_gemini_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
