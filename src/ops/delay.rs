use std::time::Duration;

use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  ops::observe_on::ScheduledObserver,
  scheduler::Scheduler,
  subscription::SubscriptionHandle,
};

#[derive(Clone)]
pub struct DelayOp<S, Sch> {
  source: S,
  delay: Duration,
  scheduler: Sch,
}

impl<S, Sch> DelayOp<S, Sch> {
  pub(crate) fn new(source: S, delay: Duration, scheduler: Sch) -> Self {
    Self { source, delay, scheduler }
  }
}

impl<Item, Err, O, S, Sch> Observable<Item, Err, O> for DelayOp<S, Sch>
where
  O: Observer<Item, Err> + Send + 'static,
  S: Observable<Item, Err, ScheduledObserver<O, Sch::Worker>>,
  Sch: Scheduler,
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Unsub = SubscriptionHandle;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let worker = self.scheduler.create_worker();
    ScheduledObserver::subscribe(self.source, observer, worker, self.delay)
  }
}

impl<Item, Err, S, Sch> ObservableExt<Item, Err> for DelayOp<S, Sch>
where
  S: ObservableExt<Item, Err>,
  Sch: Scheduler,
{
}

#[cfg(test)]
mod tests {
  use std::{sync::Arc, time::Duration};

  use parking_lot::Mutex;

  use crate::prelude::*;

  #[test]
  fn shifts_items_and_completion() {
    let scheduler = VirtualTimeScheduler::new();
    let seen = Arc::new(Mutex::new(vec![]));
    let (c_next, c_done) = (seen.clone(), seen.clone());
    let (c_clock, c_clock2) = (scheduler.clone(), scheduler.clone());

    observable::from_iter(1..=2).delay(Duration::from_millis(50), scheduler.clone()).subscribe_all(
      move |v| c_next.lock().push(format!("{v} at {}ms", c_clock.now().as_millis())),
      |_| {},
      move || c_done.lock().push(format!("complete at {}ms", c_clock2.now().as_millis())),
    );

    scheduler.advance_time_by(Duration::from_millis(49));
    assert!(seen.lock().is_empty());
    scheduler.advance_time_by(Duration::from_millis(1));
    assert_eq!(*seen.lock(), vec!["1 at 50ms", "2 at 50ms", "complete at 50ms"]);
  }

  #[test]
  fn errors_are_not_delayed() {
    let scheduler = VirtualTimeScheduler::new();
    let errors = Arc::new(Mutex::new(vec![]));
    let c_errors = errors.clone();

    observable::throw_err::<i32, _>("early")
      .delay(Duration::from_secs(10), scheduler.clone())
      .subscribe_err(|_| {}, move |e| c_errors.lock().push(e));

    scheduler.trigger_actions();
    assert_eq!(*errors.lock(), vec!["early"]);
  }
}
