//! WebSocket upgrade + message loop. Each connection owns at most one assessment;
//! client messages are parsed as JSON, applied to it, and answered with a single
//! JSON message. Closing the socket abandons the assessment.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::logic::*;
use crate::protocol::{ClientWsMessage, FinalizeOut, ServerWsMessage, SessionOut};
use crate::session::SessionState;
use crate::state::AppState;

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "cyberhubs_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "cyberhubs_backend", "WebSocket connected");
  let mut session: Option<SessionState> = None;

  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "cyberhubs_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state, &mut session).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "cyberhubs_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }

  if let Some(s) = session {
    info!(target: "assessment", id = %s.id, answered = s.answers.len(), "Connection closed mid-assessment; discarded");
  }
  info!(target: "cyberhubs_backend", "WebSocket disconnected");
}

fn no_session() -> ServerWsMessage {
  ServerWsMessage::Error { message: "No active assessment; send start_assessment first.".into() }
}

/// Dispatch one client message against the connection's assessment slot.
#[instrument(level = "info", skip(state, slot))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState, slot: &mut Option<SessionState>) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::StartAssessment { domain } => match start_assessment(state, &domain).await {
      Ok(s) => {
        if let Some(old) = slot.take() {
          info!(target: "assessment", id = %old.id, "Replacing unfinished assessment");
        }
        info!(target: "assessment", id = %s.id, queued = s.questions.len(), "WS assessment started");
        let out = SessionOut::from(&s);
        *slot = Some(s);
        ServerWsMessage::Session { session: out }
      }
      Err(e) => ServerWsMessage::Error { message: e.to_string() },
    },

    ClientWsMessage::SubmitAnswer { selected_index, confidence, response_time } => {
      let Some(s) = slot.take() else { return no_session() };
      let (s, feedback) = submit_answer(state, s, selected_index, confidence, response_time);
      *slot = Some(s);
      match feedback {
        Some(feedback) => ServerWsMessage::AnswerResult { feedback },
        None => ServerWsMessage::Error { message: "No question is awaiting an answer.".into() },
      }
    }

    ClientWsMessage::NextQuestion => {
      let Some(s) = slot.take() else { return no_session() };
      let s = next_question(state, s);
      let out = SessionOut::from(&s);
      *slot = Some(s);
      ServerWsMessage::Session { session: out }
    }

    ClientWsMessage::Finalize => {
      let Some(s) = slot.as_ref() else { return no_session() };
      match s.finalize() {
        Ok(report) => {
          *slot = None;
          let result: FinalizeOut = conclude(state, report).await;
          ServerWsMessage::Result { result }
        }
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::Abandon => {
      if let Some(s) = slot.take() {
        info!(target: "assessment", id = %s.id, "WS assessment abandoned");
      }
      ServerWsMessage::Abandoned
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::Value;

  use super::*;
  use crate::logic::testing::app_state;

  async fn send(state: &AppState, slot: &mut Option<SessionState>, raw: &str) -> Value {
    let msg: ClientWsMessage = serde_json::from_str(raw).unwrap();
    serde_json::to_value(handle_client_ws(msg, state, slot).await).unwrap()
  }

  #[tokio::test]
  async fn messages_drive_one_assessment() {
    let (state, _) = app_state(None);
    let mut slot = None;

    assert_eq!(send(&state, &mut slot, r#"{"type":"ping"}"#).await["type"], "pong");
    assert_eq!(send(&state, &mut slot, r#"{"type":"next_question"}"#).await["type"], "error");

    let v = send(&state, &mut slot, r#"{"type":"start_assessment","domain":"secure-coding"}"#).await;
    assert_eq!(v["type"], "session");
    assert_eq!(v["session"]["question"]["id"], "sc1");

    let v = send(&state, &mut slot, r#"{"type":"submit_answer","selectedIndex":1,"confidence":4,"responseTime":6.5}"#).await;
    assert_eq!(v["type"], "answer_result");
    assert_eq!(v["feedback"]["correct"], true);

    let v = send(&state, &mut slot, r#"{"type":"next_question"}"#).await;
    assert_eq!(v["session"]["question"]["id"], "sc2");

    let v = send(&state, &mut slot, r#"{"type":"finalize"}"#).await;
    assert_eq!(v["type"], "error");
    assert_eq!(v["message"], "assessment is still in progress");
    assert!(slot.is_some());
    assert_eq!(state.progress.snapshot().await.total_assessments, 0);

    loop {
      let v = send(&state, &mut slot, r#"{"type":"submit_answer","selectedIndex":9,"confidence":2,"responseTime":12}"#).await;
      assert_eq!(v["type"], "answer_result");
      let v = send(&state, &mut slot, r#"{"type":"next_question"}"#).await;
      if v["session"]["status"] == "complete" {
        break;
      }
    }

    let v = send(&state, &mut slot, r#"{"type":"finalize"}"#).await;
    assert_eq!(v["type"], "result");
    assert_eq!(v["result"]["report"]["totalQuestions"], 4);
    assert_eq!(v["result"]["progress"]["totalAssessments"], 1);
    assert!(slot.is_none());
  }

  #[tokio::test]
  async fn abandon_persists_nothing() {
    let (state, _) = app_state(None);
    let mut slot = None;
    send(&state, &mut slot, r#"{"type":"start_assessment","domain":"network-security"}"#).await;
    send(&state, &mut slot, r#"{"type":"submit_answer","selectedIndex":1,"confidence":5}"#).await;
    assert_eq!(send(&state, &mut slot, r#"{"type":"abandon"}"#).await["type"], "abandoned");
    assert!(slot.is_none());
    assert_eq!(state.progress.snapshot().await.total_assessments, 0);
  }

  #[tokio::test]
  async fn finalize_before_answering_reports_error_and_keeps_session() {
    let (state, _) = app_state(None);
    let mut slot = None;
    send(&state, &mut slot, r#"{"type":"start_assessment","domain":"incident-response"}"#).await;
    let v = send(&state, &mut slot, r#"{"type":"finalize"}"#).await;
    assert_eq!(v["type"], "error");
    assert!(slot.is_some());
  }
}
