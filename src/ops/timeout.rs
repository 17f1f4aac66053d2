use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;

use crate::{
  error::RxError,
  observable::{Observable, ObservableExt},
  observer::Observer,
  scheduler::{Scheduler, Worker},
  subscription::{Subscription, SubscriptionHandle},
};

#[derive(Clone)]
pub struct TimeoutOp<S, Sch> {
  source: S,
  after: Duration,
  scheduler: Sch,
}

impl<S, Sch> TimeoutOp<S, Sch> {
  pub(crate) fn new(source: S, after: Duration, scheduler: Sch) -> Self {
    Self { source, after, scheduler }
  }
}

impl<Item, Err, O, S, Sch> Observable<Item, Err, O> for TimeoutOp<S, Sch>
where
  O: Observer<Item, Err> + Send + 'static,
  S: Observable<Item, Err, TimeoutObserver<O, Sch::Worker>>,
  Sch: Scheduler,
  Err: From<RxError> + 'static,
{
  type Unsub = SubscriptionHandle;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let handle = SubscriptionHandle::new();
    let worker = self.scheduler.create_worker();
    handle.add(worker.clone());

    let state = Arc::new(Mutex::new(TimeoutState { observer: Some(observer), generation: 0 }));
    let mut timeout = TimeoutObserver { state, worker, after: self.after, handle: handle.clone() };
    timeout.arm::<Item, Err>(0);
    handle.add(self.source.actual_subscribe(timeout));
    handle
  }
}

impl<Item, Err, S, Sch> ObservableExt<Item, Err> for TimeoutOp<S, Sch>
where
  S: ObservableExt<Item, Err>,
  Sch: Scheduler,
{
}

struct TimeoutState<O> {
  observer: Option<O>,
  generation: u64,
}

pub struct TimeoutObserver<O, W> {
  state: Arc<Mutex<TimeoutState<O>>>,
  worker: W,
  after: Duration,
  handle: SubscriptionHandle,
}

impl<O, W: Worker> TimeoutObserver<O, W> {
  /// Schedule the timer belonging to `generation`. A later item bumps the
  /// generation, which turns this timer into a no-op.
  fn arm<Item, Err>(&mut self, generation: u64)
  where
    O: Observer<Item, Err> + Send + 'static,
    Err: From<RxError> + 'static,
  {
    let state = self.state.clone();
    let handle = self.handle.clone();
    let after = self.after;
    self.worker.schedule_delayed(
      move || {
        let observer = {
          let mut state = state.lock();
          if state.generation != generation {
            return;
          }
          state.observer.take()
        };
        if let Some(mut observer) = observer {
          tracing::debug!(?after, "timeout elapsed");
          observer.error(RxError::Timeout { after }.into());
          handle.unsubscribe();
        }
      },
      after,
    );
  }
}

impl<Item, Err, O, W> Observer<Item, Err> for TimeoutObserver<O, W>
where
  O: Observer<Item, Err> + Send + 'static,
  W: Worker,
  Err: From<RxError> + 'static,
{
  fn next(&mut self, value: Item) {
    let generation = {
      let mut state = self.state.lock();
      if state.observer.is_none() {
        return;
      }
      state.generation += 1;
      state.observer.next(value);
      state.generation
    };
    self.arm::<Item, Err>(generation);
  }

  fn error(&mut self, err: Err) {
    let observer = self.state.lock().observer.take();
    if let Some(mut observer) = observer {
      observer.error(err);
      self.worker.unsubscribe();
    }
  }

  fn complete(&mut self) {
    let observer = self.state.lock().observer.take();
    if let Some(mut observer) = observer {
      observer.complete();
      self.worker.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool {
    self.handle.is_closed() || self.state.lock().observer.as_ref().map_or(true, Observer::is_closed)
  }
}

#[cfg(test)]
mod tests {
  use std::{sync::Arc, time::Duration};

  use parking_lot::Mutex;

  use crate::prelude::*;

  #[test]
  fn silence_turns_into_timeout_error() {
    let scheduler = VirtualTimeScheduler::new();
    let subject = PublishSubject::<i32, RxError>::new();
    let events = Arc::new(Mutex::new(vec![]));
    let (c_next, c_err) = (events.clone(), events.clone());

    subject.clone().timeout(Duration::from_millis(100), scheduler.clone()).subscribe_err(
      move |v| c_next.lock().push(format!("next {v}")),
      move |e: RxError| c_err.lock().push(e.as_label().to_owned()),
    );

    scheduler.advance_time_by(Duration::from_millis(60));
    subject.next(1);
    scheduler.advance_time_by(Duration::from_millis(60));
    subject.next(2);
    scheduler.advance_time_by(Duration::from_millis(100));
    subject.next(3);

    assert_eq!(*events.lock(), vec!["next 1", "next 2", "timeout"]);
    assert_eq!(subject.subscriber_count(), 0);
    assert_eq!(scheduler.pending_count(), 0);
  }

  #[test]
  fn completion_disarms_the_timer() {
    let scheduler = VirtualTimeScheduler::new();
    let events = Arc::new(Mutex::new(vec![]));
    let (c_err, c_done) = (events.clone(), events.clone());

    observable::of(1)
      .map_err(|never| -> RxError { match never {} })
      .timeout(Duration::from_millis(10), scheduler.clone())
      .subscribe_all(
        |_| {},
        move |e: RxError| c_err.lock().push(e.to_string()),
        move || c_done.lock().push("complete".to_owned()),
      );

    scheduler.advance_time_by(Duration::from_secs(1));
    assert_eq!(*events.lock(), vec!["complete"]);
  }
}
