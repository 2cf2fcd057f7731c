//! Assessment session: the adaptive-difficulty state machine.
//!
//! A session owns the question sequence, the current position, the current tier
//! and the append-only answer log. Every transition consumes the session and
//! hands back the next one, so a caller never observes a half-applied step.
//!
//! Lifecycle:
//!   start -> augment_with_external (once, before the first answer)
//!         -> (submit_answer -> advance)* -> Finished -> finalize

use std::collections::HashSet;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::bank::QuestionBank;
use crate::config::AdaptiveConfig;
use crate::domain::{AnswerRecord, Domain, Question, Tier};
use crate::error::{AssessmentError, ProviderError};
use crate::provider::{screen, QuestionProvider};
use crate::scoring::{compute_report, Report};

/// Where the external question lands: right after the first beginner question.
const EXTERNAL_SPLICE_AT: usize = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
  InProgress,
  Complete,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
  pub id: Uuid,
  pub domain: Domain,
  pub questions: Vec<Question>,
  pub position: usize,
  pub tier: Tier,
  pub answers: Vec<AnswerRecord>,
  pub status: SessionStatus,
  #[serde(skip)]
  augmented: bool,
}

/// Result of the adaptive step.
#[derive(Debug)]
pub enum Advance {
  /// Positioned on a question awaiting an answer.
  Next(SessionState),
  /// Termination condition met; ready to finalize.
  Finished(SessionState),
}

impl Advance {
  pub fn into_state(self) -> SessionState {
    match self {
      Advance::Next(s) | Advance::Finished(s) => s,
    }
  }
}

impl SessionState {
  /// Seed the sequence: the first two beginner questions, the first intermediate
  /// question and, when the bank has one, a random intermediate scenario.
  #[instrument(level = "info", skip(bank))]
  pub fn start(domain: &str, bank: &QuestionBank) -> Result<Self, AssessmentError> {
    let domain: Domain = domain.parse()?;

    let mut questions: Vec<Question> = bank.questions_for(domain, Tier::Beginner).iter().take(2).cloned().collect();
    questions.extend(bank.questions_for(domain, Tier::Intermediate).iter().take(1).cloned());
    if let Some(s) = bank.random_scenario_for(domain, Tier::Intermediate) {
      questions.push(s);
    }

    let state = Self {
      id: Uuid::new_v4(),
      domain,
      questions,
      position: 0,
      tier: Tier::Beginner,
      answers: Vec::new(),
      status: SessionStatus::InProgress,
      augmented: false,
    };
    info!(target: "assessment", session = %state.id, %domain, questions = state.questions.len(), "Session started");
    Ok(state)
  }

  /// Best-effort: ask the provider for one intermediate question and splice it
  /// after the first beginner question. Any failure, empty result, malformed
  /// item or a wait longer than `limit` leaves the sequence untouched.
  ///
  /// Once an answer has been recorded (or augmentation already ran) this is a
  /// no-op, so a late result can never reorder a sequence in progress.
  #[instrument(level = "info", skip(self, provider), fields(session = %self.id, domain = %self.domain))]
  pub async fn augment_with_external(mut self, provider: Option<&dyn QuestionProvider>, limit: Duration) -> Self {
    let Some(provider) = provider else {
      debug!(target: "assessment", "No external provider configured; local questions only");
      return self;
    };
    if self.augmented || !self.answers.is_empty() || self.position > 0 {
      debug!(target: "assessment", "Session already under way; skipping external questions");
      return self;
    }
    self.augmented = true;

    let fetched = match tokio::time::timeout(limit, provider.fetch_questions(self.domain, Tier::Intermediate, 1)).await {
      Ok(r) => r,
      Err(_) => Err(ProviderError::Timeout),
    };

    match fetched.and_then(|qs| screen(self.domain, qs)) {
      Ok(qs) => match qs.into_iter().find(|q| self.questions.iter().all(|e| e.id() != q.id())) {
        Some(q) => {
          let at = EXTERNAL_SPLICE_AT.min(self.questions.len());
          info!(target: "assessment", provider = provider.name(), id = %q.id(), at, "Spliced external question");
          self.questions.insert(at, q);
        }
        None => info!(target: "assessment", provider = provider.name(), "Provider returned no usable question"),
      },
      Err(e) => {
        warn!(target: "assessment", provider = provider.name(), error = %e, "External questions unavailable; using local questions only");
      }
    }
    self
  }

  pub fn current_question(&self) -> Option<&Question> {
    if self.status == SessionStatus::Complete {
      return None;
    }
    self.questions.get(self.position)
  }

  /// The answer log is position-aligned: entry `i` answers question `i`.
  pub fn is_current_answered(&self) -> bool {
    self.answers.len() > self.position
  }

  /// Questions shown so far, counting the current one.
  pub fn presented(&self) -> usize {
    (self.position + 1).min(self.questions.len())
  }

  /// Record an answer for the current position. Confidence is clamped to 1..=5
  /// and the response time to >= 0. A second submission for the same position,
  /// or one on a finished session, returns the state unchanged and no record.
  #[instrument(level = "debug", skip(self, policy), fields(session = %self.id, position = self.position))]
  pub fn submit_answer(mut self, selected: usize, confidence: i64, response_time: f64, policy: &AdaptiveConfig) -> (Self, Option<AnswerRecord>) {
    if self.is_current_answered() {
      debug!(target: "assessment", "Duplicate submission ignored");
      return (self, None);
    }
    let Some(question) = self.current_question() else {
      debug!(target: "assessment", "No current question; submission ignored");
      return (self, None);
    };

    let record = AnswerRecord {
      question_id: question.id().to_string(),
      tier: question.tier(),
      selected_index: selected,
      correct: question.is_correct(selected),
      response_time: clamp_response_time(response_time),
      confidence: clamp_confidence(confidence),
    };

    if record.correct && policy.fast_promotion {
      let promoted = match self.tier {
        Tier::Beginner if record.response_time < 10.0 => Some(Tier::Intermediate),
        Tier::Intermediate if record.response_time < 8.0 => Some(Tier::Advanced),
        _ => None,
      };
      if let Some(t) = promoted {
        debug!(target: "assessment", from = %self.tier, to = %t, "Fast correct answer; tier promoted");
        self.tier = t;
      }
    }

    info!(
      target: "assessment",
      session = %self.id,
      question = %record.question_id,
      correct = record.correct,
      confidence = record.confidence,
      response_time = record.response_time,
      "Answer recorded"
    );
    self.answers.push(record.clone());
    (self, Some(record))
  }

  /// The adaptive step, called once the current answer is recorded.
  ///
  /// Moves to the next queued question if there is one. At the end of the
  /// sequence it escalates only when the last `lookback` answers contain at
  /// least `required_correct` correct ones and fewer than `max_presented`
  /// questions were shown; otherwise the session terminates.
  #[instrument(level = "debug", skip(self, bank, policy), fields(session = %self.id, position = self.position))]
  pub fn advance(mut self, bank: &QuestionBank, policy: &AdaptiveConfig) -> Advance {
    if self.status == SessionStatus::Complete {
      return Advance::Finished(self);
    }
    if !self.is_current_answered() {
      debug!(target: "assessment", "Current question not answered yet; staying put");
      return Advance::Next(self);
    }
    if self.position + 1 < self.questions.len() {
      self.position += 1;
      return Advance::Next(self);
    }

    let presented = self.presented();
    let window = &self.answers[self.answers.len().saturating_sub(policy.lookback)..];
    let recent_correct = window.iter().filter(|a| a.correct).count();

    if recent_correct >= policy.required_correct && presented < policy.max_presented {
      let target = match self.tier {
        Tier::Beginner => Tier::Intermediate,
        Tier::Intermediate | Tier::Advanced => Tier::Advanced,
      };

      let extra: Vec<Question> = {
        let queued: HashSet<&str> = self.questions.iter().map(Question::id).collect();
        let mut extra: Vec<Question> = bank.first_available(self.domain, target, &queued).into_iter().collect();
        if target == Tier::Advanced {
          extra.extend(bank.random_scenario_excluding(self.domain, target, &queued));
        }
        extra
      };

      if !extra.is_empty() {
        info!(target: "assessment", session = %self.id, from = %self.tier, to = %target, added = extra.len(), presented, "Difficulty escalated");
        self.tier = target;
        self.questions.extend(extra);
        self.position += 1;
        return Advance::Next(self);
      }
      info!(target: "assessment", session = %self.id, %target, "Nothing left to escalate to");
    } else {
      debug!(target: "assessment", recent_correct, presented, "Escalation conditions not met");
    }

    self.status = SessionStatus::Complete;
    info!(target: "assessment", session = %self.id, answered = self.answers.len(), "Session complete");
    Advance::Finished(self)
  }

  /// Score the answer log of a finished session. Fails with `EmptyLog` if
  /// nothing was answered and `NotFinished` while the run is still going.
  pub fn finalize(&self) -> Result<Report, AssessmentError> {
    if self.answers.is_empty() {
      return Err(AssessmentError::EmptyLog);
    }
    if self.status != SessionStatus::Complete {
      return Err(AssessmentError::NotFinished);
    }
    compute_report(self.domain, &self.answers, self.tier)
  }
}

fn clamp_confidence(c: i64) -> u8 {
  c.clamp(1, 5) as u8
}

fn clamp_response_time(t: f64) -> f64 {
  if t.is_finite() { t.max(0.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::Ordering;

  use super::*;
  use crate::provider::fakes::{generated, FailingProvider, SlowProvider, StaticProvider};

  const LIMIT: Duration = Duration::from_secs(5);

  fn bank() -> QuestionBank {
    QuestionBank::new(&[])
  }

  fn policy() -> AdaptiveConfig {
    AdaptiveConfig { fast_promotion: false, ..AdaptiveConfig::default() }
  }

  /// Answer the current question (right or wrong) and advance.
  fn step(s: SessionState, right: bool, bank: &QuestionBank) -> Advance {
    let q = s.current_question().expect("current question");
    let pick = if right { q.correct() } else { (q.correct() + 1) % q.options().len() };
    let (s, rec) = s.submit_answer(pick, 4, 5.0, &policy());
    assert!(rec.is_some());
    s.advance(bank, &policy())
  }

  fn ids(s: &SessionState) -> Vec<&str> {
    s.questions.iter().map(Question::id).collect()
  }

  #[test]
  fn start_seeds_two_beginner_then_intermediate_then_scenario() {
    let bank = bank();
    for d in Domain::ALL {
      let s = SessionState::start(d.id(), &bank).unwrap();
      assert!(s.questions.len() >= 3);
      assert_eq!(s.questions[0].tier(), Tier::Beginner);
      assert_eq!(s.questions[1].tier(), Tier::Beginner);
      assert_eq!(s.questions[2].tier(), Tier::Intermediate);
      assert!(!s.questions[2].is_scenario());
      assert_eq!(s.position, 0);
      assert_eq!(s.tier, Tier::Beginner);
      assert!(s.answers.is_empty());
    }
    let s = SessionState::start("secure-coding", &bank).unwrap();
    assert_eq!(ids(&s), vec!["sc1", "sc2", "sc3", "sc-scenario-1"]);
  }

  #[test]
  fn start_rejects_unknown_domain() {
    let err = SessionState::start("cloud-security", &bank()).unwrap_err();
    assert!(matches!(err, AssessmentError::DomainNotFound(_)));
  }

  #[tokio::test]
  async fn augmentation_splices_after_first_beginner() {
    let bank = bank();
    let provider = StaticProvider(vec![generated(Domain::SecureCoding, Tier::Intermediate, "ai-1")]);
    let s = SessionState::start("secure-coding", &bank).unwrap()
      .augment_with_external(Some(&provider), LIMIT).await;
    assert_eq!(ids(&s), vec!["sc1", "ai-1", "sc2", "sc3", "sc-scenario-1"]);
  }

  #[tokio::test]
  async fn failing_provider_leaves_sequence_unchanged() {
    let bank = bank();
    let provider = FailingProvider::default();
    let before = SessionState::start("network-security", &bank).unwrap();
    let expected: Vec<String> = before.questions.iter().map(|q| q.id().to_string()).collect();
    let after = before.augment_with_external(Some(&provider), LIMIT).await;
    assert_eq!(ids(&after), expected);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn empty_and_malformed_results_are_ignored() {
    let bank = bank();
    let s = SessionState::start("incident-response", &bank).unwrap();
    let n = s.questions.len();

    let s = s.augment_with_external(Some(&StaticProvider(vec![])), LIMIT).await;
    assert_eq!(s.questions.len(), n);

    let mut broken = generated(Domain::IncidentResponse, Tier::Intermediate, "ai-broken");
    if let Question::Standard(q) = &mut broken {
      q.options.truncate(1);
      q.correct = 0;
    }
    let s = SessionState::start("incident-response", &bank).unwrap()
      .augment_with_external(Some(&StaticProvider(vec![broken])), LIMIT).await;
    assert_eq!(s.questions.len(), n);
  }

  #[tokio::test(start_paused = true)]
  async fn slow_provider_is_abandoned_at_the_limit() {
    let bank = bank();
    let s = SessionState::start("network-security", &bank).unwrap();
    let n = s.questions.len();
    let s = s.augment_with_external(Some(&SlowProvider(Duration::from_secs(60))), Duration::from_secs(1)).await;
    assert_eq!(s.questions.len(), n);
  }

  #[tokio::test]
  async fn augmentation_after_first_answer_is_dropped() {
    let bank = bank();
    let provider = StaticProvider(vec![generated(Domain::NetworkSecurity, Tier::Intermediate, "ai-late")]);
    let s = SessionState::start("network-security", &bank).unwrap();
    let (s, _) = s.submit_answer(1, 3, 4.0, &policy());
    let s = s.augment_with_external(Some(&provider), LIMIT).await;
    assert!(ids(&s).iter().all(|id| *id != "ai-late"));
  }

  #[tokio::test]
  async fn augmentation_runs_at_most_once() {
    let bank = bank();
    let provider = StaticProvider(vec![generated(Domain::NetworkSecurity, Tier::Intermediate, "ai-1")]);
    let s = SessionState::start("network-security", &bank).unwrap();
    let n = s.questions.len();
    let s = s.augment_with_external(Some(&provider), LIMIT).await;
    let s = s.augment_with_external(Some(&provider), LIMIT).await;
    assert_eq!(s.questions.len(), n + 1);
  }

  #[test]
  fn submit_is_idempotent_per_position() {
    let s = SessionState::start("secure-coding", &bank()).unwrap();
    let (s, first) = s.submit_answer(1, 5, 3.0, &policy());
    assert!(first.unwrap().correct);
    let (s, second) = s.submit_answer(0, 1, 9.0, &policy());
    assert!(second.is_none());
    assert_eq!(s.answers.len(), 1);
    assert!(s.answers[0].correct);
  }

  #[test]
  fn submit_clamps_confidence_and_time() {
    let s = SessionState::start("secure-coding", &bank()).unwrap();
    let (_, rec) = s.submit_answer(0, 42, -3.0, &policy());
    let rec = rec.unwrap();
    assert_eq!(rec.confidence, 5);
    assert_eq!(rec.response_time, 0.0);
    assert!(!rec.correct);

    let s = SessionState::start("secure-coding", &bank()).unwrap();
    let (_, rec) = s.submit_answer(1, -7, f64::NAN, &policy());
    let rec = rec.unwrap();
    assert_eq!(rec.confidence, 1);
    assert_eq!(rec.response_time, 0.0);
  }

  #[test]
  fn fast_correct_answers_promote_the_tier() {
    let on = AdaptiveConfig::default();
    let s = SessionState::start("network-security", &bank()).unwrap();
    let (s, _) = s.submit_answer(1, 4, 9.5, &on);
    assert_eq!(s.tier, Tier::Intermediate);

    let s = SessionState::start("network-security", &bank()).unwrap();
    let (s, _) = s.submit_answer(1, 4, 12.0, &on);
    assert_eq!(s.tier, Tier::Beginner);

    let s = SessionState::start("network-security", &bank()).unwrap();
    let (s, _) = s.submit_answer(0, 4, 1.0, &on);
    assert_eq!(s.tier, Tier::Beginner);
  }

  #[test]
  fn advance_without_answer_stays_put() {
    let s = SessionState::start("secure-coding", &bank()).unwrap();
    let s = s.advance(&bank(), &policy()).into_state();
    assert_eq!(s.position, 0);
    assert_eq!(s.status, SessionStatus::InProgress);
  }

  #[test]
  fn all_correct_run_escalates_twice_then_stops() {
    let bank = bank();
    let mut s = SessionState::start("secure-coding", &bank).unwrap();
    // sc1 sc2 sc3 sc-scenario-1
    for _ in 0..3 {
      s = match step(s, true, &bank) { Advance::Next(s) => s, Advance::Finished(_) => panic!("finished early") };
    }
    // exhausted after 4 presented: beginner -> intermediate (sc4)
    s = match step(s, true, &bank) { Advance::Next(s) => s, Advance::Finished(_) => panic!("expected escalation") };
    assert_eq!(s.tier, Tier::Intermediate);
    assert_eq!(s.current_question().unwrap().id(), "sc4");

    // 5 presented: intermediate -> advanced (sc5 + advanced scenario)
    s = match step(s, true, &bank) { Advance::Next(s) => s, Advance::Finished(_) => panic!("expected escalation") };
    assert_eq!(s.tier, Tier::Advanced);
    assert_eq!(&ids(&s)[5..], &["sc5", "sc-scenario-2"]);

    s = match step(s, true, &bank) { Advance::Next(s) => s, Advance::Finished(_) => panic!("sc-scenario-2 still queued") };
    // 7 presented: ceiling reached even though everything is correct
    let done = match step(s, true, &bank) { Advance::Finished(s) => s, Advance::Next(_) => panic!("escalated past the ceiling") };
    assert_eq!(done.status, SessionStatus::Complete);
    assert_eq!(done.answers.len(), 7);
    assert!(done.current_question().is_none());
  }

  #[test]
  fn no_escalation_unless_last_two_correct() {
    let bank = bank();
    let mut s = SessionState::start("network-security", &bank).unwrap();
    let n = s.questions.len();
    let pattern = [true, true, true, false];
    for (i, right) in pattern.iter().enumerate() {
      match step(s, *right, &bank) {
        Advance::Next(next) => s = next,
        Advance::Finished(done) => {
          assert_eq!(i, n - 1);
          assert_eq!(done.questions.len(), n);
          return;
        }
      }
    }
    panic!("session should have finished");
  }

  #[test]
  fn escalation_stops_when_bank_is_exhausted() {
    // A bank with nothing above beginner: escalation has nothing to pull.
    let s = SessionState {
      id: Uuid::new_v4(),
      domain: Domain::NetworkSecurity,
      questions: bank().questions_for(Domain::NetworkSecurity, Tier::Beginner).to_vec(),
      position: 0,
      tier: Tier::Beginner,
      answers: Vec::new(),
      status: SessionStatus::InProgress,
      augmented: false,
    };
    let empty = QuestionBank::default();
    let s = match step(s, true, &empty) { Advance::Next(s) => s, Advance::Finished(_) => panic!() };
    assert!(matches!(step(s, true, &empty), Advance::Finished(_)));
  }

  #[test]
  fn finalize_requires_answers() {
    let s = SessionState::start("secure-coding", &bank()).unwrap();
    assert!(matches!(s.finalize(), Err(AssessmentError::EmptyLog)));
  }

  #[test]
  fn finalize_refuses_unfinished_run() {
    let bank = bank();
    let s = SessionState::start("secure-coding", &bank).unwrap();
    let correct = s.current_question().unwrap().correct();
    let (s, _) = s.submit_answer(correct, 5, 2.0, &policy());
    assert_eq!(s.status, SessionStatus::InProgress);
    assert!(matches!(s.finalize(), Err(AssessmentError::NotFinished)));

    let mut adv = s.advance(&bank, &policy());
    let s = loop {
      match adv {
        Advance::Next(s) => {
          assert!(matches!(s.finalize(), Err(AssessmentError::NotFinished)));
          adv = step(s, false, &bank);
        }
        Advance::Finished(s) => break s,
      }
    };
    assert_eq!(s.finalize().unwrap().total_questions, s.answers.len());
  }
}
