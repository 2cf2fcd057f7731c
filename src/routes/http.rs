//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs ids and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Path, Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::Domain;
use crate::error::AssessmentError;
use crate::learning_path::recommend;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

impl IntoResponse for AssessmentError {
  fn into_response(self) -> Response {
    let status = match self {
      AssessmentError::DomainNotFound(_) | AssessmentError::SessionNotFound(_) => StatusCode::NOT_FOUND,
      AssessmentError::EmptyLog | AssessmentError::NotFinished => StatusCode::CONFLICT,
    };
    (status, Json(ErrorOut { error: self.to_string() })).into_response()
  }
}

fn conflict(message: &str) -> Response {
  (StatusCode::CONFLICT, Json(ErrorOut { error: message.into() })).into_response()
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, provider: state.provider.as_ref().map(|p| p.name()) })
}

#[instrument(level = "info")]
pub async fn http_domains() -> impl IntoResponse {
  Json(Domain::ALL.into_iter().map(DomainOut::from).collect::<Vec<_>>())
}

#[instrument(level = "info", skip(state))]
pub async fn http_progress(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(ProgressOut::from(&state.progress.snapshot().await))
}

#[instrument(level = "info", skip(q), fields(domain = %q.domain, score = q.score))]
pub async fn http_learning_path(Query(q): Query<LearningPathQuery>) -> Result<impl IntoResponse, AssessmentError> {
  let domain: Domain = q.domain.parse()?;
  Ok(Json(recommend(domain, q.score.min(100))))
}

#[instrument(level = "info", skip(state, body), fields(domain = %body.domain))]
pub async fn http_start_assessment(
  State(state): State<Arc<AppState>>,
  Json(body): Json<StartIn>,
) -> Result<impl IntoResponse, AssessmentError> {
  let session = start_assessment(&state, &body.domain).await?;
  let out = SessionOut::from(&session);
  info!(target: "assessment", id = %session.id, queued = session.questions.len(), "HTTP assessment started");
  state.insert_session(session).await;
  Ok((StatusCode::CREATED, Json(out)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_assessment(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AssessmentError> {
  let session = state.get_session(id).await.ok_or(AssessmentError::SessionNotFound(id))?;
  Ok(Json(SessionOut::from(&session)))
}

#[instrument(level = "info", skip(state, body), fields(selected = body.selected_index, confidence = body.confidence))]
pub async fn http_submit_answer(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
  Json(body): Json<AnswerIn>,
) -> Result<Response, AssessmentError> {
  let feedback = with_session(&state, id, |s| {
    submit_answer(&state, s, body.selected_index, body.confidence, body.response_time)
  })
  .await?;
  Ok(match feedback {
    Some(fb) => Json(fb).into_response(),
    None => conflict("no question is awaiting an answer"),
  })
}

#[instrument(level = "info", skip(state))]
pub async fn http_next_question(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AssessmentError> {
  let out = with_session(&state, id, |s| {
    let s = next_question(&state, s);
    let out = SessionOut::from(&s);
    (s, out)
  })
  .await?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_finalize(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AssessmentError> {
  let out = finalize_stored(&state, id).await?;
  info!(target: "assessment", %id, score = out.report.score, "HTTP assessment finalized");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_abandon_assessment(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AssessmentError> {
  state.remove_session(id).await.ok_or(AssessmentError::SessionNotFound(id))?;
  info!(target: "assessment", %id, "HTTP assessment abandoned");
  Ok(StatusCode::NO_CONTENT)
}
