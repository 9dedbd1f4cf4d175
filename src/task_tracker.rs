//! Bookkeeping of in-flight fetches and place lookups.

use std::{
  collections::HashMap,
  fmt::Display,
  sync::{
    Arc, Mutex, MutexGuard, OnceLock, PoisonError,
    atomic::{AtomicU64, Ordering},
  },
  time::{Duration, Instant},
};

use itertools::Itertools;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskCategory {
  TripFetch,
  TraceFetch,
  Enrichment,
}

impl Display for TaskCategory {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      TaskCategory::TripFetch => "trip fetch",
      TaskCategory::TraceFetch => "trace fetch",
      TaskCategory::Enrichment => "place lookup",
    })
  }
}

#[derive(Clone, Debug)]
pub struct InFlight {
  pub label: String,
  pub category: TaskCategory,
  pub since: Instant,
}

impl InFlight {
  #[must_use]
  pub fn age(&self) -> Duration {
    self.since.elapsed()
  }
}

#[derive(Default)]
pub struct TaskTracker {
  running: Mutex<HashMap<u64, InFlight>>,
  ids: AtomicU64,
}

impl TaskTracker {
  fn running(&self) -> MutexGuard<'_, HashMap<u64, InFlight>> {
    self.running.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn start(&self, category: TaskCategory, label: String) -> u64 {
    let id = self.ids.fetch_add(1, Ordering::Relaxed);
    log::trace!("{category} {id} started: {label}");
    self.running().insert(
      id,
      InFlight {
        label,
        category,
        since: Instant::now(),
      },
    );
    id
  }

  fn finish(&self, id: u64) {
    if let Some(task) = self.running().remove(&id) {
      log::trace!("{} {id} took {:?}: {}", task.category, task.age(), task.label);
    }
  }

  /// Everything still running, oldest first.
  #[must_use]
  pub fn in_flight(&self) -> Vec<InFlight> {
    self
      .running()
      .iter()
      .sorted_by_key(|(id, _)| **id)
      .map(|(_, task)| task.clone())
      .collect()
  }

  #[must_use]
  pub fn count(&self, category: TaskCategory) -> usize {
    self
      .running()
      .values()
      .filter(|task| task.category == category)
      .count()
  }

  /// One line such as `2 place lookup, 1 trip fetch`, empty when idle.
  #[must_use]
  pub fn summary(&self) -> String {
    self
      .running()
      .values()
      .map(|task| task.category)
      .counts()
      .into_iter()
      .sorted()
      .map(|(category, n)| format!("{n} {category}"))
      .join(", ")
  }
}

static TASK_TRACKER: OnceLock<Arc<TaskTracker>> = OnceLock::new();

/// The process wide tracker.
pub fn task_tracker() -> Arc<TaskTracker> {
  Arc::clone(TASK_TRACKER.get_or_init(Arc::default))
}

/// Marks a task as running until dropped.
pub struct TaskGuard {
  id: u64,
  tracker: Arc<TaskTracker>,
}

impl TaskGuard {
  #[must_use]
  pub fn new(category: TaskCategory, label: impl Into<String>) -> Self {
    let tracker = task_tracker();
    let id = tracker.start(category, label.into());
    Self { id, tracker }
  }
}

impl Drop for TaskGuard {
  fn drop(&mut self) {
    self.tracker.finish(self.id);
  }
}
