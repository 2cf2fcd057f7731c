//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Starting a session (local picks + bounded external augmentation)
//!   - Submitting answers and building feedback
//!   - Advancing through the adaptive sequence
//!   - Finalizing: report, badges, learning path, optional AI feedback
//!   - HTTP session-table plumbing (take/transition/put back under one lock)

use tracing::{info, instrument};
use uuid::Uuid;

use crate::badges::award;
use crate::error::AssessmentError;
use crate::feedback::request_feedback;
use crate::learning_path::recommend;
use crate::protocol::{AnswerFeedback, FinalizeOut};
use crate::scoring::Report;
use crate::session::SessionState;
use crate::state::{AppState, TrackedSession};

#[instrument(level = "info", skip(state))]
pub async fn start_assessment(state: &AppState, domain: &str) -> Result<SessionState, AssessmentError> {
  let session = SessionState::start(domain, &state.bank)?;
  Ok(session.augment_with_external(state.provider.as_deref(), state.augment_limit()).await)
}

/// Record the answer and describe the outcome for the current position.
/// `None` when there is no question to answer.
pub fn submit_answer(state: &AppState, session: SessionState, selected: usize, confidence: i64, response_time: f64) -> (SessionState, Option<AnswerFeedback>) {
  let (session, record) = session.submit_answer(selected, confidence, response_time, &state.adaptive);
  let feedback = session
    .questions
    .get(session.position)
    .zip(session.answers.get(session.position))
    .map(|(q, a)| AnswerFeedback::new(q, a, record.is_some()));
  (session, feedback)
}

pub fn next_question(state: &AppState, session: SessionState) -> SessionState {
  session.advance(&state.bank, &state.adaptive).into_state()
}

/// Badges and the learning path follow from the scored report; AI feedback
/// is attached when a provider answers in time.
#[instrument(level = "info", skip(state, report), fields(domain = %report.domain, score = report.score))]
pub async fn conclude(state: &AppState, report: Report) -> FinalizeOut {
  let outcome = award(&state.progress, report.score).await;
  let path = recommend(report.domain, report.score);
  let ai_feedback = request_feedback(state.feedback.as_deref(), &report, state.augment_limit()).await;
  info!(target: "assessment", skill = ?report.skill_level, path = path.title_key, ai_feedback = ai_feedback.is_some(), "Assessment finalized");
  FinalizeOut::new(report, outcome, path, ai_feedback)
}

/// Apply a transition to a stored session while holding the table lock.
/// The transition counts as activity for idle expiry.
pub async fn with_session<R>(state: &AppState, id: Uuid, f: impl FnOnce(SessionState) -> (SessionState, R)) -> Result<R, AssessmentError> {
  let mut sessions = state.sessions.write().await;
  let tracked = sessions.remove(&id).ok_or(AssessmentError::SessionNotFound(id))?;
  let (session, out) = f(tracked.session);
  sessions.insert(id, TrackedSession::new(session));
  Ok(out)
}

/// Score and drop a stored session. On `EmptyLog` or `NotFinished` the
/// session stays in place.
#[instrument(level = "info", skip(state))]
pub async fn finalize_stored(state: &AppState, id: Uuid) -> Result<FinalizeOut, AssessmentError> {
  let report = {
    let mut sessions = state.sessions.write().await;
    let report = sessions.get(&id).ok_or(AssessmentError::SessionNotFound(id))?.session.finalize()?;
    sessions.remove(&id);
    report
  };
  Ok(conclude(state, report).await)
}


#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::testing::app_state;
  use super::*;
  use crate::domain::{Badge, Domain, Tier};
  use crate::feedback::fakes::{sample, FailingFeedback, StaticFeedback};
  use crate::feedback::AiFeedback;
  use crate::progress::ProgressStore;
  use crate::provider::fakes::{generated, FailingProvider, StaticProvider};
  use crate::session::SessionStatus;

  #[tokio::test]
  async fn start_with_provider_splices_external_question() {
    let provider = StaticProvider(vec![generated(Domain::SecureCoding, Tier::Intermediate, "ai-x")]);
    let (state, _) = app_state(Some(Arc::new(provider)));
    let s = start_assessment(&state, "secure-coding").await.unwrap();
    assert_eq!(s.questions[1].id(), "ai-x");
  }

  #[tokio::test]
  async fn start_survives_failing_provider() {
    let (state, _) = app_state(Some(Arc::new(FailingProvider::default())));
    let s = start_assessment(&state, "incident-response").await.unwrap();
    assert_eq!(s.questions[0].id(), "ir1");
    assert_eq!(s.questions[1].id(), "ir2");
  }

  #[tokio::test]
  async fn feedback_reveals_answer_key_and_flags_duplicates() {
    let (state, _) = app_state(None);
    let s = start_assessment(&state, "network-security").await.unwrap();
    let (s, fb) = submit_answer(&state, s, 0, 3, 4.0);
    let fb = fb.unwrap();
    assert!(fb.accepted);
    assert!(!fb.correct);
    assert_eq!(fb.correct_index, 1);
    assert!(!fb.explanation.is_empty());

    let (_, again) = submit_answer(&state, s, 1, 3, 4.0);
    let again = again.unwrap();
    assert!(!again.accepted);
    assert!(!again.correct);
  }

  #[tokio::test]
  async fn full_run_finalizes_and_awards() {
    let (state, store) = app_state(None);
    let mut s = start_assessment(&state, "secure-coding").await.unwrap();
    while s.status == SessionStatus::InProgress {
      let correct = s.current_question().unwrap().correct();
      let (next, fb) = submit_answer(&state, s, correct, 5, 3.0);
      assert!(fb.unwrap().correct);
      s = next_question(&state, next);
    }
    let report = s.finalize().unwrap();
    assert_eq!(report.score, 100);
    let out = conclude(&state, report).await;
    assert_eq!(out.new_badges.len(), 3);
    assert_eq!(out.learning_path.title_key, "advancedSpec");
    assert_eq!(store.load().unwrap().total_assessments, 1);
    assert!(store.load().unwrap().badges.contains(&Badge::SecurityExpert));
  }

  async fn finished_run(state: &AppState) -> Report {
    let mut s = start_assessment(state, "incident-response").await.unwrap();
    while s.status == SessionStatus::InProgress {
      let (next, _) = submit_answer(state, s, 0, 3, 6.0);
      s = next_question(state, next);
    }
    s.finalize().unwrap()
  }

  #[tokio::test]
  async fn conclude_attaches_ai_feedback() {
    let (state, _) = app_state(None);
    let state = state.with_feedback(Some(Arc::new(StaticFeedback(sample()))));
    let report = finished_run(&state).await;
    let out = conclude(&state, report).await;
    assert_eq!(out.ai_feedback, Some(sample()));
    assert_eq!(out.progress.total_assessments, 1);
  }

  #[tokio::test]
  async fn conclude_survives_failing_or_malformed_feedback() {
    let failing = Arc::new(FailingFeedback::default());
    let (state, store) = app_state(None);
    let state = state.with_feedback(Some(failing.clone()));
    let out = conclude(&state, finished_run(&state).await).await;
    assert!(out.ai_feedback.is_none());
    assert_eq!(failing.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(store.load().unwrap().total_assessments, 1);

    let blank = AiFeedback { feedback_summary: String::new(), ..sample() };
    let state = state.with_feedback(Some(Arc::new(StaticFeedback(blank))));
    let out = conclude(&state, finished_run(&state).await).await;
    assert!(out.ai_feedback.is_none());
    assert_eq!(out.progress.total_assessments, 2);
  }

  #[tokio::test]
  async fn finalize_stored_keeps_session_until_complete() {
    let (state, store) = app_state(None);
    let s = start_assessment(&state, "secure-coding").await.unwrap();
    let id = s.id;
    state.insert_session(s).await;

    assert!(matches!(finalize_stored(&state, id).await, Err(AssessmentError::EmptyLog)));
    assert!(state.get_session(id).await.is_some());

    with_session(&state, id, |s| submit_answer(&state, s, 1, 5, 2.0)).await.unwrap();
    assert!(matches!(finalize_stored(&state, id).await, Err(AssessmentError::NotFinished)));
    assert!(state.get_session(id).await.is_some());
    assert_eq!(state.progress.snapshot().await.total_assessments, 0);
    assert_eq!(store.saves.load(std::sync::atomic::Ordering::SeqCst), 0);

    loop {
      let status = with_session(&state, id, |s| {
        let s = next_question(&state, s);
        let status = s.status;
        let correct = s.current_question().map(|q| q.correct());
        let s = match correct {
          Some(correct) => submit_answer(&state, s, (correct + 1) % 4, 2, 9.0).0,
          None => s,
        };
        (s, status)
      })
      .await
      .unwrap();
      if status == SessionStatus::Complete {
        break;
      }
    }

    let out = finalize_stored(&state, id).await.unwrap();
    assert_eq!(out.report.total_questions, 4);
    assert_eq!(out.progress.total_assessments, 1);
    assert!(state.get_session(id).await.is_none());
    assert!(matches!(finalize_stored(&state, id).await, Err(AssessmentError::SessionNotFound(_))));
  }
}
