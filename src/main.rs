//! CyberHubs · Adaptive Cybersecurity Assessment Backend
//!
//! - Axum HTTP + WebSocket API
//! - Adaptive question sequencing with confidence-weighted scoring
//! - Optional Gemini question generation and result feedback (via environment variables)
//! - Badges and assessment count persisted to a JSON file
//!
//! Important env variables:
//!   PORT                   : u16 (default 3000)
//!   ASSESSMENT_CONFIG_PATH : path to TOML config (prompts, adaptive policy, session expiry, extra questions)
//!   PROGRESS_PATH          : progress JSON file (default "./cyberhubs-progress.json")
//!   GEMINI_API_KEY         : enables Gemini question generation and feedback if present
//!   GEMINI_BASE_URL        : default "https://generativelanguage.googleapis.com/v1beta/models"
//!   GEMINI_MODEL           : default "gemini-2.5-pro"
//!   GEMINI_TIMEOUT_SECS    : default 20
//!   LOG_LEVEL              : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT             : "pretty" (default) or "json"

mod telemetry;
mod util;
mod error;
mod domain;
mod config;
mod seeds;
mod bank;
mod provider;
mod feedback;
mod gemini;
mod session;
mod scoring;
mod badges;
mod learning_path;
mod progress;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::{spawn_session_sweeper, AppState};

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared state: question bank, progress store, optional Gemini client.
  let state = Arc::new(AppState::new());
  spawn_session_sweeper(state.clone());

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "cyberhubs_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
