//! Application state: question bank, adaptive policy, optional external
//! providers, persisted progress and the table of active HTTP sessions.
//!
//! WebSocket sessions are owned by their connection and never enter the table.
//! HTTP sessions nobody touches for `sessions.idle_timeout_secs` are swept.

use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{sync::RwLock, task::JoinHandle, time::Instant};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::bank::QuestionBank;
use crate::config::{load_app_config_from_env, AdaptiveConfig, SessionsConfig};
use crate::feedback::FeedbackProvider;
use crate::gemini::Gemini;
use crate::progress::{JsonFileStore, ProgressStore, ProgressTracker};
use crate::provider::QuestionProvider;
use crate::session::SessionState;

/// A stored HTTP session and the time of its last transition.
pub struct TrackedSession {
    pub session: SessionState,
    pub touched: Instant,
}

impl TrackedSession {
    pub fn new(session: SessionState) -> Self {
        Self { session, touched: Instant::now() }
    }
}

pub struct AppState {
    pub bank: QuestionBank,
    pub adaptive: AdaptiveConfig,
    pub provider: Option<Arc<dyn QuestionProvider>>,
    pub feedback: Option<Arc<dyn FeedbackProvider>>,
    pub progress: ProgressTracker,
    pub session_policy: SessionsConfig,
    pub sessions: RwLock<HashMap<Uuid, TrackedSession>>,
}

impl AppState {
    /// Build state from env: load config, build the bank, open the progress file, init Gemini.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_app_config_from_env().unwrap_or_default();
        let bank = QuestionBank::new(&cfg.questions);

        let gemini: Option<Arc<Gemini>> = match Gemini::from_env(cfg.prompts.clone()) {
            Ok(Some(g)) => {
                info!(target: "cyberhubs_backend", base_url = %g.base_url, model = %g.model, "Gemini enabled (questions and feedback).");
                Some(Arc::new(g))
            }
            Ok(None) => {
                info!(target: "cyberhubs_backend", "Gemini disabled (no GEMINI_API_KEY). Using built-in questions only.");
                None
            }
            Err(e) => {
                error!(target: "cyberhubs_backend", error = %e, "Gemini disabled: client could not be built. Using built-in questions only.");
                None
            }
        };
        let provider = gemini.clone().map(|g| g as Arc<dyn QuestionProvider>);
        let feedback = gemini.map(|g| g as Arc<dyn FeedbackProvider>);

        let store = JsonFileStore::from_env();
        info!(target: "cyberhubs_backend", path = %store.path().display(), "Progress store");
        info!(target: "cyberhubs_backend", idle_secs = cfg.sessions.idle_timeout_secs, sweep_secs = cfg.sessions.sweep_interval_secs, "HTTP session expiry");

        Self::with_parts(bank, cfg.adaptive, provider, Arc::new(store))
            .with_feedback(feedback)
            .with_session_policy(cfg.sessions)
    }

    pub fn with_parts(
        bank: QuestionBank,
        adaptive: AdaptiveConfig,
        provider: Option<Arc<dyn QuestionProvider>>,
        store: Arc<dyn ProgressStore>,
    ) -> Self {
        Self {
            bank,
            adaptive,
            provider,
            feedback: None,
            progress: ProgressTracker::load(store),
            session_policy: SessionsConfig::default(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_feedback(mut self, feedback: Option<Arc<dyn FeedbackProvider>>) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn with_session_policy(mut self, policy: SessionsConfig) -> Self {
        self.session_policy = policy;
        self
    }

    /// Upper bound on every external provider call made on a learner's behalf.
    pub fn augment_limit(&self) -> Duration {
        Duration::from_secs(self.adaptive.augment_timeout_secs)
    }

    #[instrument(level = "debug", skip(self, s), fields(id = %s.id))]
    pub async fn insert_session(&self, s: SessionState) {
        self.sessions.write().await.insert(s.id, TrackedSession::new(s));
    }

    /// Read-only copy of a session by id.
    pub async fn get_session(&self, id: Uuid) -> Option<SessionState> {
        self.sessions.read().await.get(&id).map(|t| t.session.clone())
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn remove_session(&self, id: Uuid) -> Option<SessionState> {
        self.sessions.write().await.remove(&id).map(|t| t.session)
    }

    /// Drop sessions idle for longer than the configured timeout. Returns how many went.
    pub async fn sweep_idle_sessions(&self) -> usize {
        let max_idle = self.session_policy.idle_timeout();
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, t| now.duration_since(t.touched) < max_idle);
        let dropped = before - sessions.len();
        if dropped > 0 {
            info!(target: "assessment", dropped, remaining = sessions.len(), "Expired idle HTTP sessions");
        } else {
            debug!(target: "assessment", remaining = sessions.len(), "No idle HTTP sessions");
        }
        dropped
    }
}

/// Background task sweeping idle HTTP sessions on a fixed interval.
pub fn spawn_session_sweeper(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(state.session_policy.sweep_interval());
        loop {
            interval.tick().await;
            state.sweep_idle_sessions().await;
        }
    })
}
