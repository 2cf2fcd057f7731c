//! Persistent progress (badges + completed-assessment count).
//!
//! `ProgressStore` is the persistence seam; `JsonFileStore` is the production
//! backend. `ProgressTracker` keeps the in-memory copy and serializes every
//! read-modify-write through one lock, so two finalizations can never both see
//! the same prior total.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use crate::domain::Progress;
use crate::error::StoreError;

pub trait ProgressStore: Send + Sync {
  fn load(&self) -> Result<Progress, StoreError>;
  fn save(&self, progress: &Progress) -> Result<(), StoreError>;
}

/// Progress as one pretty-printed JSON document. Writes go to a sibling temp
/// file that is then renamed over the target.
pub struct JsonFileStore {
  path: PathBuf,
}

impl JsonFileStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  /// PROGRESS_PATH or ./cyberhubs-progress.json.
  pub fn from_env() -> Self {
    let path = std::env::var("PROGRESS_PATH")
      .ok()
      .filter(|p| !p.trim().is_empty())
      .unwrap_or_else(|| "./cyberhubs-progress.json".into());
    Self::new(path)
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn temp_path(&self) -> PathBuf {
    let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    self.path.with_file_name(name)
  }
}

impl ProgressStore for JsonFileStore {
  fn load(&self) -> Result<Progress, StoreError> {
    match fs::read_to_string(&self.path) {
      Ok(s) => Ok(serde_json::from_str(&s)?),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Progress::default()),
      Err(e) => Err(e.into()),
    }
  }

  fn save(&self, progress: &Progress) -> Result<(), StoreError> {
    if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
      fs::create_dir_all(dir)?;
    }
    let body = serde_json::to_string_pretty(progress)?;
    let tmp = self.temp_path();
    fs::write(&tmp, body)?;
    fs::rename(&tmp, &self.path)?;
    Ok(())
  }
}

pub struct ProgressTracker {
  store: Arc<dyn ProgressStore>,
  current: Mutex<Progress>,
}

impl ProgressTracker {
  /// Load persisted progress; an unreadable store starts from empty progress.
  #[instrument(level = "info", skip_all)]
  pub fn load(store: Arc<dyn ProgressStore>) -> Self {
    let current = match store.load() {
      Ok(p) => {
        info!(target: "assessment", total = p.total_assessments, badges = p.badges.len(), "Progress loaded");
        p
      }
      Err(e) => {
        warn!(target: "assessment", error = %e, "Could not load progress; starting fresh");
        Progress::default()
      }
    };
    Self { store, current: Mutex::new(current) }
  }

  pub async fn snapshot(&self) -> Progress {
    self.current.lock().await.clone()
  }

  /// Compute the next progress from the current one and persist it while the
  /// lock is held. The file write runs on the blocking pool. A failed save is
  /// logged and the in-memory value still moves.
  pub async fn commit_with<R>(&self, f: impl FnOnce(&Progress) -> (Progress, R)) -> R {
    let mut current = self.current.lock().await;
    let (next, out) = f(&current);

    let store = Arc::clone(&self.store);
    let snapshot = next.clone();
    let joined = tokio::task::spawn_blocking(move || store.save(&snapshot)).await;
    match joined {
      Ok(Ok(())) => {}
      Ok(Err(e)) => error!(target: "assessment", error = %e, "Failed to persist progress"),
      Err(e) => error!(target: "assessment", error = %e, "Progress save task did not complete"),
    }

    *current = next;
    out
  }
}
