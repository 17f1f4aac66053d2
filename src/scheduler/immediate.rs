use std::time::Duration;

use crate::{
  scheduler::{instant_at, parker, real_now, Scheduler, Worker},
  subscription::{Subscription, SubscriptionHandle},
};

/// Runs every action synchronously, before `schedule` returns.
///
/// Actions scheduled from inside an action run right away as well, so
/// nesting is depth-first. A delayed action blocks the calling thread until
/// it is due, and a periodic action loops on the calling thread until it or
/// the worker is cancelled.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
  type Worker = ImmediateWorker;

  fn create_worker(&self) -> Self::Worker { ImmediateWorker::default() }

  fn now(&self) -> Duration { real_now() }
}

#[derive(Debug, Clone, Default)]
pub struct ImmediateWorker {
  token: SubscriptionHandle,
}

impl Subscription for ImmediateWorker {
  fn unsubscribe(&self) { self.token.unsubscribe() }

  fn is_closed(&self) -> bool { self.token.is_closed() }
}

impl Worker for ImmediateWorker {
  fn now(&self) -> Duration { real_now() }

  fn schedule_delayed<F>(&self, task: F, delay: Duration) -> SubscriptionHandle
  where
    F: FnOnce() + Send + 'static,
  {
    if self.is_closed() || (!delay.is_zero() && !self.sleep(delay)) {
      return SubscriptionHandle::closed();
    }
    task();
    SubscriptionHandle::closed()
  }

  fn schedule_periodically<F>(
    &self, mut task: F, initial_delay: Duration, period: Duration,
  ) -> SubscriptionHandle
  where
    F: FnMut() + Send + 'static,
  {
    let handle = SubscriptionHandle::new();
    let start = real_now().saturating_add(initial_delay);
    let mut runs: u32 = 0;
    loop {
      let due = start.saturating_add(period.saturating_mul(runs));
      if !parker::sleep_until(&[&self.token, &handle], instant_at(due)) {
        break;
      }
      task();
      runs = runs.saturating_add(1);
    }
    handle.unsubscribe();
    handle
  }

  fn sleep(&self, duration: Duration) -> bool { parker::sleep_for(&[&self.token], duration) }
}
