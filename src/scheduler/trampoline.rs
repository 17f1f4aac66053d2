use std::{cell::RefCell, time::Duration};

use crate::{
  scheduler::{instant_at, parker, real_now, timed_queue::TimedQueue, Scheduler, Worker},
  subscription::{Subscription, SubscriptionHandle},
};

/// Runs actions on the calling thread, one at a time.
///
/// The outermost `schedule` call runs its action and then drains a
/// thread-local queue; actions scheduled while that happens are queued and
/// run after the current action returns, in due-time order (ties in
/// submission order). Deep recursion through the scheduler thus becomes a
/// loop.
///
/// ```
/// use std::sync::{Arc, Mutex};
///
/// use rxcore::prelude::*;
///
/// let worker = TrampolineScheduler.create_worker();
/// let log = Arc::new(Mutex::new(vec![]));
/// let (c_log, c_worker) = (log.clone(), worker.clone());
/// worker.schedule(move || {
///   c_log.lock().unwrap().push("outer-start");
///   let inner = c_log.clone();
///   c_worker.schedule(move || inner.lock().unwrap().push("inner"));
///   c_log.lock().unwrap().push("outer-end");
/// });
/// assert_eq!(*log.lock().unwrap(), vec!["outer-start", "outer-end", "inner"]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TrampolineScheduler;

impl Scheduler for TrampolineScheduler {
  type Worker = TrampolineWorker;

  fn create_worker(&self) -> Self::Worker { TrampolineWorker::default() }

  fn now(&self) -> Duration { real_now() }
}

#[derive(Debug, Clone, Default)]
pub struct TrampolineWorker {
  token: SubscriptionHandle,
}

struct Job {
  task: Box<dyn FnOnce()>,
  handle: SubscriptionHandle,
  worker: SubscriptionHandle,
}

thread_local! {
  static QUEUE: RefCell<Option<TimedQueue<Job>>> = const { RefCell::new(None) };
}

/// Clears the queue when the drain loop ends, also by panic, so the next
/// `schedule` on this thread starts a fresh drain.
struct DrainGuard;

impl Drop for DrainGuard {
  fn drop(&mut self) { QUEUE.with(|q| q.borrow_mut().take()); }
}

impl Subscription for TrampolineWorker {
  fn unsubscribe(&self) { self.token.unsubscribe() }

  fn is_closed(&self) -> bool { self.token.is_closed() }
}

impl Worker for TrampolineWorker {
  fn now(&self) -> Duration { real_now() }

  fn schedule_delayed<F>(&self, task: F, delay: Duration) -> SubscriptionHandle
  where
    F: FnOnce() + Send + 'static,
  {
    if self.is_closed() {
      return SubscriptionHandle::closed();
    }
    let handle = SubscriptionHandle::new();
    let job = Job { task: Box::new(task), handle: handle.clone(), worker: self.token.clone() };
    let due = real_now().saturating_add(delay);

    let must_drain = QUEUE.with(|q| {
      let mut q = q.borrow_mut();
      let is_outermost = q.is_none();
      q.get_or_insert_with(TimedQueue::default).push(due, job);
      is_outermost
    });
    if must_drain {
      drain();
    }
    handle
  }

  fn sleep(&self, duration: Duration) -> bool { parker::sleep_for(&[&self.token], duration) }
}

fn drain() {
  let _guard = DrainGuard;
  while let Some((due, job)) = QUEUE.with(|q| q.borrow_mut().as_mut().and_then(TimedQueue::pop)) {
    let runnable = !job.handle.is_closed()
      && !job.worker.is_closed()
      && (due <= real_now() || parker::sleep_until(&[&job.worker, &job.handle], instant_at(due)));
    if runnable {
      (job.task)();
    }
    job.handle.unsubscribe();
  }
}
