//! Read-only question bank: fixed-order standard questions per (domain, tier)
//! and random scenario lookup.

use std::collections::{HashMap, HashSet};

use rand::seq::SliceRandom;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::QuestionCfg;
use crate::domain::{Domain, Question, ScenarioQuestion, StandardQuestion, Tier};
use crate::seeds::{seed_questions, seed_scenarios};

#[derive(Clone, Debug, Default)]
pub struct QuestionBank {
  standard: HashMap<(Domain, Tier), Vec<Question>>,
  scenarios: HashMap<(Domain, Tier), Vec<Question>>,
}

impl QuestionBank {
  /// Built-in seeds followed by config-provided entries. Config entries never
  /// replace a seed with the same id.
  #[instrument(level = "info", skip_all, fields(extra = extra.len()))]
  pub fn new(extra: &[QuestionCfg]) -> Self {
    let mut bank = Self::default();
    let mut ids = HashSet::new();

    for q in seed_questions().into_iter().chain(seed_scenarios()) {
      ids.insert(q.id().to_string());
      bank.insert(q);
    }

    for (i, cc) in extra.iter().enumerate() {
      let q = match question_from_cfg(cc) {
        Ok(q) => q,
        Err(e) => {
          error!(target: "assessment", index = i, error = %e, "Skipping bank item from config");
          continue;
        }
      };
      if !ids.insert(q.id().to_string()) {
        warn!(target: "assessment", id = %q.id(), "Skipping bank item from config: duplicate id");
        continue;
      }
      bank.insert(q);
    }

    for d in Domain::ALL {
      for t in Tier::ALL {
        let std_count = bank.questions_for(d, t).len();
        let scn_count = bank.scenarios.get(&(d, t)).map_or(0, Vec::len);
        info!(target: "assessment", domain = %d, tier = %t, standard = std_count, scenarios = scn_count, "Startup question inventory");
      }
    }
    bank
  }

  fn insert(&mut self, q: Question) {
    let key = (q.domain(), q.tier());
    let slot = if q.is_scenario() { &mut self.scenarios } else { &mut self.standard };
    slot.entry(key).or_default().push(q);
  }

  /// Ordered standard questions for a domain and tier (deterministic).
  pub fn questions_for(&self, domain: Domain, tier: Tier) -> &[Question] {
    self.standard.get(&(domain, tier)).map(Vec::as_slice).unwrap_or(&[])
  }

  /// First standard question of the tier whose id is not excluded.
  pub fn first_available(&self, domain: Domain, tier: Tier, exclude: &HashSet<&str>) -> Option<Question> {
    self.questions_for(domain, tier)
      .iter()
      .find(|q| !exclude.contains(q.id()))
      .cloned()
  }

  /// Uniform random scenario among the matches.
  pub fn random_scenario_for(&self, domain: Domain, tier: Tier) -> Option<Question> {
    self.random_scenario_excluding(domain, tier, &HashSet::new())
  }

  /// Uniform random scenario among the matches whose id is not excluded.
  pub fn random_scenario_excluding(&self, domain: Domain, tier: Tier, exclude: &HashSet<&str>) -> Option<Question> {
    let pool: Vec<&Question> = self
      .scenarios
      .get(&(domain, tier))
      .map(|v| v.iter().filter(|q| !exclude.contains(q.id())).collect())
      .unwrap_or_default();
    pool.choose(&mut rand::thread_rng()).map(|q| (*q).clone())
  }
}

fn question_from_cfg(cc: &QuestionCfg) -> Result<Question, String> {
  let domain: Domain = cc.domain.parse().map_err(|e| format!("{e}"))?;
  let difficulty = Tier::parse(&cc.difficulty).ok_or_else(|| format!("unknown difficulty: {}", cc.difficulty))?;
  let id = cc.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());

  let q = match (&cc.title, &cc.context) {
    (Some(title), Some(context)) if !context.trim().is_empty() => Question::Scenario(ScenarioQuestion {
      id,
      domain,
      difficulty,
      title: title.clone(),
      context: context.clone(),
      diagram: cc.diagram.clone(),
      code_snippet: cc.code_snippet.clone(),
      question: cc.question.clone(),
      options: cc.options.clone(),
      correct: cc.correct,
      explanation: cc.explanation.clone(),
      learning_points: cc.learning_points.clone(),
      sources: cc.sources.clone(),
      ai_generated: false,
      generated_at: None,
    }),
    _ => Question::Standard(StandardQuestion {
      id,
      domain,
      difficulty,
      question: cc.question.clone(),
      options: cc.options.clone(),
      correct: cc.correct,
      explanation: cc.explanation.clone(),
      sources: cc.sources.clone(),
      ai_generated: false,
      generated_at: None,
    }),
  };
  q.validate()?;
  Ok(q)
}
