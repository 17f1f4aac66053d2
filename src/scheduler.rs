//! Execution contexts.
//!
//! A [`Scheduler`] creates [`Worker`]s; a worker runs the actions submitted
//! to it, one at a time, now, later or periodically. Cancelling a worker
//! drops its pending actions and wakes any action sleeping on it.
//!
//! | scheduler                  | where actions run                                  |
//! |----------------------------|----------------------------------------------------|
//! | [`ImmediateScheduler`]     | synchronously, nested actions depth-first          |
//! | [`TrampolineScheduler`]    | on the calling thread, nested actions queued       |
//! | [`NewThreadScheduler`]     | on one dedicated thread per worker                 |
//! | [`VirtualTimeScheduler`]   | when the test advances its clock                   |
//! | `TokioScheduler`           | on a tokio runtime (`tokio-scheduler` feature)     |

use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

use crate::subscription::{Subscription, SubscriptionHandle};

mod immediate;
mod new_thread;
mod parker;
mod periodic;
mod timed_queue;
mod trampoline;
mod virtual_time;

#[cfg(feature = "tokio-scheduler")]
mod tokio_scheduler;

pub use immediate::{ImmediateScheduler, ImmediateWorker};
pub use new_thread::{NewThreadScheduler, NewThreadWorker};
#[cfg(feature = "tokio-scheduler")]
pub use tokio_scheduler::{TokioScheduler, TokioWorker};
pub use trampoline::{TrampolineScheduler, TrampolineWorker};
pub use virtual_time::{VirtualTimeScheduler, VirtualWorker};

/// A factory of workers sharing one notion of time.
pub trait Scheduler: Clone + Send + Sync + 'static {
  type Worker: Worker;

  fn create_worker(&self) -> Self::Worker;

  /// Current time of this scheduler's clock.
  fn now(&self) -> Duration;
}

/// A serial execution context.
///
/// Every scheduling method returns a handle that cancels that one action; it
/// closes by itself once a one-shot action has run. Unsubscribing the worker
/// cancels everything scheduled on it, and scheduling on a cancelled worker
/// is a no-op returning a closed handle.
pub trait Worker: Subscription + Clone + Send + Sync + 'static {
  fn now(&self) -> Duration;

  /// Run `task` as soon as the worker gets to it.
  fn schedule<F>(&self, task: F) -> SubscriptionHandle
  where
    F: FnOnce() + Send + 'static,
  {
    self.schedule_delayed(task, Duration::ZERO)
  }

  /// Run `task` no earlier than `delay` from now.
  fn schedule_delayed<F>(&self, task: F, delay: Duration) -> SubscriptionHandle
  where
    F: FnOnce() + Send + 'static;

  /// Run `task` after `initial_delay`, then every `period` until cancelled.
  ///
  /// Due times are computed from the first due time, so a slow run does not
  /// shift the runs after it.
  fn schedule_periodically<F>(
    &self, task: F, initial_delay: Duration, period: Duration,
  ) -> SubscriptionHandle
  where
    F: FnMut() + Send + 'static,
  {
    periodic::schedule_periodically(self, task, initial_delay, period)
  }

  /// Block the current thread for `duration`, waking early when the worker
  /// is cancelled. Returns `false` when woken by cancellation.
  fn sleep(&self, duration: Duration) -> bool;
}

static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// Time elapsed since the process-wide epoch shared by all real-time
/// schedulers.
pub(crate) fn real_now() -> Duration { EPOCH.elapsed() }

/// The instant a `real_now()` timestamp refers to.
pub(crate) fn instant_at(at: Duration) -> Instant {
  EPOCH.checked_add(at).unwrap_or_else(parker::far_future)
}
