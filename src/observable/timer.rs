use std::{convert::Infallible, time::Duration};

use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  scheduler::{Scheduler, Worker},
  subscription::Subscription,
};

/// Creates an observable that emits `0` once `delay` has elapsed on
/// `scheduler`, then completes.
pub fn timer<Sch: Scheduler>(delay: Duration, scheduler: Sch) -> Timer<Sch> {
  Timer { delay, scheduler }
}

#[derive(Clone)]
pub struct Timer<Sch> {
  delay: Duration,
  scheduler: Sch,
}

impl<Sch, O> Observable<usize, Infallible, O> for Timer<Sch>
where
  Sch: Scheduler,
  O: Observer<usize, Infallible> + Send + 'static,
{
  type Unsub = Sch::Worker;

  fn actual_subscribe(self, mut observer: O) -> Self::Unsub {
    let worker = self.scheduler.create_worker();
    let c_worker = worker.clone();
    worker.schedule_delayed(
      move || {
        observer.next(0);
        observer.complete();
        c_worker.unsubscribe();
      },
      self.delay,
    );
    worker
  }
}

impl<Sch: Scheduler> ObservableExt<usize, Infallible> for Timer<Sch> {}

/// Creates an observable emitting `0, 1, 2, ...` every `period` on
/// `scheduler`, the first one after one `period`. It never completes.
///
/// ```
/// use std::time::Duration;
///
/// use rxcore::prelude::*;
///
/// let scheduler = VirtualTimeScheduler::new();
/// let seen = std::sync::Arc::new(std::sync::Mutex::new(vec![]));
/// let c_seen = seen.clone();
/// observable::interval(Duration::from_secs(1), scheduler.clone())
///   .subscribe(move |v| c_seen.lock().unwrap().push(v));
///
/// scheduler.advance_time_by(Duration::from_millis(3500));
/// assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
/// ```
pub fn interval<Sch: Scheduler>(period: Duration, scheduler: Sch) -> Interval<Sch> {
  Interval { period, scheduler }
}

#[derive(Clone)]
pub struct Interval<Sch> {
  period: Duration,
  scheduler: Sch,
}

impl<Sch, O> Observable<usize, Infallible, O> for Interval<Sch>
where
  Sch: Scheduler,
  O: Observer<usize, Infallible> + Send + 'static,
{
  type Unsub = Sch::Worker;

  fn actual_subscribe(self, mut observer: O) -> Self::Unsub {
    let worker = self.scheduler.create_worker();
    let c_worker = worker.clone();
    let mut count = 0;
    worker.schedule_periodically(
      move || {
        if observer.is_closed() {
          c_worker.unsubscribe();
          return;
        }
        observer.next(count);
        count += 1;
      },
      self.period,
      self.period,
    );
    worker
  }
}

impl<Sch: Scheduler> ObservableExt<usize, Infallible> for Interval<Sch> {}
