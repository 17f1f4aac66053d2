//! Virtual-time scheduler for deterministic tests of time-based code.
//!
//! Time only moves when the test says so, and due actions run synchronously
//! on the thread that advances the clock. Nothing here reads the wall clock
//! or sleeps.

use std::{
  sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
  },
  time::Duration,
};

use parking_lot::Mutex;

use crate::{
  scheduler::{timed_queue::TimedQueue, Scheduler, Worker},
  subscription::{Subscription, SubscriptionHandle},
};

/// A scheduler driven by a manually advanced clock.
///
/// Clones share the clock and the queue.
///
/// ```
/// use std::{sync::{Arc, Mutex}, time::Duration};
///
/// use rxcore::prelude::*;
///
/// let scheduler = VirtualTimeScheduler::new();
/// let fired = Arc::new(Mutex::new(vec![]));
/// let c_fired = fired.clone();
/// observable::timer(Duration::from_secs(5), scheduler.clone())
///   .subscribe(move |v| c_fired.lock().unwrap().push(v));
///
/// scheduler.advance_time_by(Duration::from_secs(4));
/// assert!(fired.lock().unwrap().is_empty());
/// scheduler.advance_time_to(Duration::from_secs(5));
/// assert_eq!(*fired.lock().unwrap(), vec![0]);
/// ```
#[derive(Clone, Default)]
pub struct VirtualTimeScheduler {
  state: Arc<Mutex<VirtualState>>,
  next_worker: Arc<AtomicU64>,
}

#[derive(Default)]
struct VirtualState {
  now: Duration,
  queue: TimedQueue<VirtualJob>,
}

struct VirtualJob {
  worker: u64,
  task: Box<dyn FnOnce() + Send>,
  handle: SubscriptionHandle,
}

impl VirtualTimeScheduler {
  pub fn new() -> Self { Self::default() }

  /// The virtual clock.
  pub fn now(&self) -> Duration { self.state.lock().now }

  /// Move the clock to `target`, running every action due at or before it.
  ///
  /// Actions run in due-time order, ties in submission order, and the clock
  /// reads each action's due time while it runs. Actions scheduled by those
  /// actions run in the same call when they fall due before `target`. The
  /// clock never moves backwards: a `target` in the past only runs what is
  /// due now.
  pub fn advance_time_to(&self, target: Duration) {
    loop {
      let job = {
        let mut state = self.state.lock();
        let target = target.max(state.now);
        match state.queue.pop_due(target) {
          Some((due, job)) => {
            state.now = state.now.max(due);
            job
          }
          None => {
            state.now = target;
            return;
          }
        }
      };
      if !job.handle.is_closed() {
        (job.task)();
        job.handle.unsubscribe();
      }
    }
  }

  /// Move the clock forward by `delta`.
  pub fn advance_time_by(&self, delta: Duration) {
    let target = self.now().saturating_add(delta);
    self.advance_time_to(target);
  }

  /// Run the actions due at the current time without moving the clock.
  pub fn trigger_actions(&self) { self.advance_time_to(self.now()) }

  /// Number of queued actions that are still live.
  pub fn pending_count(&self) -> usize {
    self.state.lock().queue.iter().filter(|job| !job.handle.is_closed()).count()
  }

  fn purge_worker(&self, worker: u64) {
    let mut removed = vec![];
    self.state.lock().queue.retain(|job| {
      let keep = job.worker != worker;
      if !keep {
        removed.push(job.handle.clone());
      }
      keep
    });
    for handle in removed {
      handle.unsubscribe();
    }
  }
}

impl Scheduler for VirtualTimeScheduler {
  type Worker = VirtualWorker;

  fn create_worker(&self) -> Self::Worker {
    VirtualWorker {
      id: self.next_worker.fetch_add(1, Ordering::Relaxed),
      scheduler: self.clone(),
      token: SubscriptionHandle::new(),
    }
  }

  fn now(&self) -> Duration { VirtualTimeScheduler::now(self) }
}

#[derive(Clone)]
pub struct VirtualWorker {
  id: u64,
  scheduler: VirtualTimeScheduler,
  token: SubscriptionHandle,
}

impl Subscription for VirtualWorker {
  fn unsubscribe(&self) {
    if !self.token.is_closed() {
      self.token.unsubscribe();
      self.scheduler.purge_worker(self.id);
    }
  }

  fn is_closed(&self) -> bool { self.token.is_closed() }
}

impl Worker for VirtualWorker {
  fn now(&self) -> Duration { self.scheduler.now() }

  fn schedule_delayed<F>(&self, task: F, delay: Duration) -> SubscriptionHandle
  where
    F: FnOnce() + Send + 'static,
  {
    if self.is_closed() {
      return SubscriptionHandle::closed();
    }
    let handle = SubscriptionHandle::new();
    let job = VirtualJob { worker: self.id, task: Box::new(task), handle: handle.clone() };
    let mut state = self.scheduler.state.lock();
    let due = state.now.saturating_add(delay);
    state.queue.push(due, job);
    handle
  }

  /// Virtual workers never block: returns at once, `false` if cancelled.
  fn sleep(&self, _: Duration) -> bool { !self.is_closed() }
}

#[cfg(test)]
mod tests {
  use parking_lot::Mutex;

  use super::*;

  fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Box<dyn FnOnce() + Send>) {
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    let make = move |name: &str| -> Box<dyn FnOnce() + Send> {
      let (log, name) = (c_log.clone(), name.to_owned());
      Box::new(move || log.lock().push(name))
    };
    (log, make)
  }

  #[test]
  fn ties_run_in_submission_order() {
    let scheduler = VirtualTimeScheduler::new();
    let worker = scheduler.create_worker();
    let (log, task) = recorder();

    worker.schedule_delayed(task("b"), Duration::from_millis(20));
    worker.schedule_delayed(task("a1"), Duration::from_millis(10));
    worker.schedule_delayed(task("a2"), Duration::from_millis(10));

    scheduler.advance_time_by(Duration::from_millis(20));
    assert_eq!(*log.lock(), vec!["a1", "a2", "b"]);
    assert_eq!(scheduler.now(), Duration::from_millis(20));
  }

  #[test]
  fn advance_runs_actions_scheduled_during_the_advance() {
    let scheduler = VirtualTimeScheduler::new();
    let worker = scheduler.create_worker();
    let (log, task) = recorder();

    let c_worker = worker.clone();
    let nested = task("nested");
    let c_log = log.clone();
    worker.schedule_delayed(
      move || {
        c_log.lock().push("outer".to_owned());
        c_worker.schedule_delayed(nested, Duration::from_millis(5));
      },
      Duration::from_millis(10),
    );

    scheduler.advance_time_to(Duration::from_millis(15));
    assert_eq!(*log.lock(), vec!["outer", "nested"]);
  }

  #[test]
  fn advance_to_same_time_twice_is_a_noop() {
    let scheduler = VirtualTimeScheduler::new();
    let worker = scheduler.create_worker();
    let count = Arc::new(Mutex::new(0));
    let c_count = count.clone();
    worker.schedule_delayed(move || *c_count.lock() += 1, Duration::from_millis(10));

    scheduler.advance_time_to(Duration::from_millis(10));
    scheduler.advance_time_to(Duration::from_millis(10));
    assert_eq!(*count.lock(), 1);
  }

  #[test]
  fn clock_never_moves_backwards() {
    let scheduler = VirtualTimeScheduler::new();
    scheduler.advance_time_to(Duration::from_secs(3));
    scheduler.advance_time_to(Duration::from_secs(1));
    assert_eq!(scheduler.now(), Duration::from_secs(3));
  }

  #[test]
  fn trigger_actions_runs_only_what_is_due() {
    let scheduler = VirtualTimeScheduler::new();
    let worker = scheduler.create_worker();
    let (log, task) = recorder();
    worker.schedule(task("now"));
    worker.schedule_delayed(task("later"), Duration::from_millis(1));

    scheduler.trigger_actions();
    assert_eq!(*log.lock(), vec!["now"]);
    assert_eq!(scheduler.now(), Duration::ZERO);
    assert_eq!(scheduler.pending_count(), 1);
  }

  #[test]
  fn cancelling_a_worker_purges_its_actions() {
    let scheduler = VirtualTimeScheduler::new();
    let (w1, w2) = (scheduler.create_worker(), scheduler.create_worker());
    let (log, task) = recorder();
    let h1 = w1.schedule_delayed(task("w1"), Duration::from_millis(1));
    w2.schedule_delayed(task("w2"), Duration::from_millis(1));

    w1.unsubscribe();
    assert!(h1.is_closed());
    assert_eq!(scheduler.pending_count(), 1);
    scheduler.advance_time_by(Duration::from_millis(1));
    assert_eq!(*log.lock(), vec!["w2"]);
    assert!(w1.schedule(|| {}).is_closed());
  }

  #[test]
  fn unbounded_delay_stays_pending() {
    let scheduler = VirtualTimeScheduler::new();
    let worker = scheduler.create_worker();
    let (log, task) = recorder();
    scheduler.advance_time_by(Duration::from_millis(1));
    worker.schedule_delayed(task("never"), Duration::MAX);
    worker.schedule_periodically(|| {}, Duration::MAX, Duration::MAX);

    scheduler.advance_time_by(Duration::from_secs(3600));
    assert!(log.lock().is_empty());
    assert_eq!(scheduler.pending_count(), 2);
  }
}
