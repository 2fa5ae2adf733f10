use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::watch;


/// An error that occurs when the wait group counter is misused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WaitGroupError {
  #[error("wait group counter underflow: more completions reported than outstanding work")]
  CounterUnderflow,
}

struct State {
  count: usize,
  // Broadcast signal for the current cycle. `true` means the cycle has
  // completed; every subscriber observes the value without consuming it.
  done_tx: watch::Sender<bool>,
}

/// Tracks completion of a dynamic set of concurrent tasks.
///
/// [`add`](WaitGroup::add) registers outstanding work, [`done`](WaitGroup::done)
/// reports one unit complete, and [`wait`](WaitGroup::wait) returns a future
/// that resolves once the counter next reaches zero. Clones share one counter.
#[derive(Clone)]
pub struct WaitGroup {
  state: Arc<Mutex<State>>,
}

impl Debug for WaitGroup {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("WaitGroup").field("count", &self.count()).finish()
  }
}

impl Eq for WaitGroup {}

impl PartialEq for WaitGroup {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.state, &other.state)
  }
}

impl Default for WaitGroup {
  fn default() -> Self {
    Self::new()
  }
}

impl WaitGroup {
  /// Creates a wait group with no outstanding work. `wait` futures resolve
  /// immediately until work is registered.
  pub fn new() -> Self {
    Self::with_count(0)
  }

  /// Creates a wait group that already has `count` outstanding units.
  pub fn with_count(count: usize) -> Self {
    let (done_tx, _) = watch::channel(count == 0);
    Self {
      state: Arc::new(Mutex::new(State { count, done_tx })),
    }
  }

  /// Adds `delta`, which may be negative, to the counter.
  ///
  /// If the counter reaches zero, every outstanding and every later-created
  /// `wait` future resolves, until the counter is raised above zero again.
  /// Raising it above zero starts a new cycle with a fresh signal.
  ///
  /// # Panics
  ///
  /// Panics with [`WaitGroupError::CounterUnderflow`] if the counter would go
  /// negative. That means `done` was called more times than work was added,
  /// which is an accounting bug in the caller; it is not clamped or ignored.
  pub fn add(&self, delta: isize) {
    let mut state = self.state.lock().unwrap();
    let prev = state.count;
    let next = if delta >= 0 {
      prev + delta as usize
    } else {
      match prev.checked_sub(delta.unsigned_abs()) {
        Some(next) => next,
        None => {
          drop(state);
          panic!("{}", WaitGroupError::CounterUnderflow);
        }
      }
    };
    if prev == 0 && next > 0 {
      // A fired one-shot signal cannot be reused; arm a fresh cycle so
      // late waiters bind to the new zero-crossing, not the stale one.
      let (done_tx, _) = watch::channel(false);
      state.done_tx = done_tx;
    }
    state.count = next;
    tracing::debug!("add: delta={} count={}", delta, next);
    if prev > 0 && next == 0 {
      state.done_tx.send_replace(true);
    }
  }

  /// Decrements the counter by one. Called by a worker when it finishes.
  pub fn done(&self) {
    self.add(-1);
  }

  /// Returns a future that resolves once the counter reaches zero, counted
  /// from the moment of this call. Resolves immediately if the counter is
  /// already zero.
  ///
  /// The future is a first-class value: race it with `tokio::select!`, wrap
  /// it in `tokio::time::timeout`, or drop it to stop waiting. Any number of
  /// waiters observe the same zero-crossing; none of them consumes it.
  pub fn wait(&self) -> impl Future<Output = ()> + Send + 'static {
    let mut done_rx = self.state.lock().unwrap().done_tx.subscribe();
    async move {
      // Err means every handle was dropped; the wait must not hang forever
      // on a group that no longer exists.
      let _ = done_rx.wait_for(|done| *done).await;
    }
  }

  /// Returns the current number of outstanding work units.
  pub fn count(&self) -> usize {
    self.state.lock().unwrap().count
  }
}
