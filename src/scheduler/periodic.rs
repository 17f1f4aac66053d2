use std::time::Duration;

use crate::{
  scheduler::Worker,
  subscription::{Subscription, SubscriptionHandle},
};

/// Periodic scheduling built from one-shot `schedule_delayed` calls.
///
/// Each run schedules the next one at `start + runs * period`, so the
/// schedule does not drift when a run is late.
pub(crate) fn schedule_periodically<W, F>(
  worker: &W, task: F, initial_delay: Duration, period: Duration,
) -> SubscriptionHandle
where
  W: Worker,
  F: FnMut() + Send + 'static,
{
  let handle = SubscriptionHandle::new();
  let start = worker.now().saturating_add(initial_delay);
  Periodic { worker: worker.clone(), task, handle: handle.clone(), start, period, runs: 0 }
    .schedule_next();
  handle
}

struct Periodic<W, F> {
  worker: W,
  task: F,
  handle: SubscriptionHandle,
  start: Duration,
  period: Duration,
  runs: u32,
}

impl<W, F> Periodic<W, F>
where
  W: Worker,
  F: FnMut() + Send + 'static,
{
  fn due(&self) -> Duration { self.start.saturating_add(self.period.saturating_mul(self.runs)) }

  fn schedule_next(self) {
    let delay = self.due().saturating_sub(self.worker.now());
    let handle = self.handle.clone();
    let worker = self.worker.clone();
    let step = worker.schedule_delayed(move || self.run(), delay);
    handle.add(step);
  }

  fn run(mut self) {
    if self.handle.is_closed() {
      return;
    }
    (self.task)();
    self.runs = self.runs.saturating_add(1);
    self.schedule_next();
  }
}
