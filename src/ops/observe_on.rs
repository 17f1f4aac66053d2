use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;

use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  scheduler::{Scheduler, Worker},
  subscription::SubscriptionHandle,
};

#[derive(Clone)]
pub struct ObserveOnOp<S, Sch> {
  source: S,
  scheduler: Sch,
}

impl<S, Sch> ObserveOnOp<S, Sch> {
  pub(crate) fn new(source: S, scheduler: Sch) -> Self { Self { source, scheduler } }
}

impl<Item, Err, O, S, Sch> Observable<Item, Err, O> for ObserveOnOp<S, Sch>
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
    ScheduledObserver::subscribe(self.source, observer, worker, Duration::ZERO)
  }
}

impl<Item, Err, S, Sch> ObservableExt<Item, Err> for ObserveOnOp<S, Sch>
where
  S: ObservableExt<Item, Err>,
  Sch: Scheduler,
{
}

/// Forwards every event through a worker, optionally after a delay.
///
/// One worker per subscription keeps the events of that subscription in
/// order. Errors are scheduled without the delay.
pub struct ScheduledObserver<O, W> {
  observer: Arc<Mutex<Option<O>>>,
  worker: W,
  delay: Duration,
}

impl<O, W: Worker> ScheduledObserver<O, W> {
  pub(crate) fn subscribe<Item, Err, S>(
    source: S, observer: O, worker: W, delay: Duration,
  ) -> SubscriptionHandle
  where
    S: Observable<Item, Err, Self>,
    O: Observer<Item, Err> + Send + 'static,
    Item: Send + 'static,
    Err: Send + 'static,
  {
    let handle = SubscriptionHandle::new();
    handle.add(worker.clone());
    let observer = Self { observer: Arc::new(Mutex::new(Some(observer))), worker, delay };
    handle.add(source.actual_subscribe(observer));
    handle
  }
}

impl<Item, Err, O, W> Observer<Item, Err> for ScheduledObserver<O, W>
where
  O: Observer<Item, Err> + Send + 'static,
  W: Worker,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) {
    let observer = self.observer.clone();
    self.worker.schedule_delayed(move || observer.lock().next(value), self.delay);
  }

  fn error(&mut self, err: Err) {
    let observer = self.observer.clone();
    let worker = self.worker.clone();
    self.worker.schedule(move || {
      observer.lock().error(err);
      worker.unsubscribe();
    });
  }

  fn complete(&mut self) {
    let observer = self.observer.clone();
    let worker = self.worker.clone();
    self.worker.schedule_delayed(
      move || {
        observer.lock().complete();
        worker.unsubscribe();
      },
      self.delay,
    );
  }

  fn is_closed(&self) -> bool {
    self.worker.is_closed() || self.observer.lock().as_ref().map_or(true, Observer::is_closed)
  }
}

#[cfg(test)]
mod test {
  use std::{sync::Arc, thread, time::Duration};

  use parking_lot::Mutex;

  use crate::prelude::*;

  #[test]
  fn switch_thread() {
    let emitted_thread = thread::current().id();
    let observed = Arc::new(Mutex::new(vec![]));
    let c_observed = observed.clone();
    let (tx, rx) = std::sync::mpsc::channel();

    observable::from_iter(0..3).observe_on(NewThreadScheduler::default()).subscribe_all(
      move |v| c_observed.lock().push((v, thread::current().id())),
      |_| {},
      move || {
        let _ = tx.send(());
      },
    );

    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    let observed = observed.lock();
    assert_eq!(observed.iter().map(|(v, _)| *v).collect::<Vec<_>>(), vec![0, 1, 2]);
    assert!(observed.iter().all(|(_, id)| *id != emitted_thread));
  }

  #[test]
  fn virtual_time_defers_until_triggered() {
    let scheduler = VirtualTimeScheduler::new();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();

    observable::from_iter(0..3)
      .observe_on(scheduler.clone())
      .subscribe(move |v| c_seen.lock().push(v));

    assert!(seen.lock().is_empty());
    scheduler.trigger_actions();
    assert_eq!(*seen.lock(), vec![0, 1, 2]);
  }

  #[test]
  fn cancel_drops_pending_events() {
    let scheduler = VirtualTimeScheduler::new();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();

    let handle = observable::from_iter(0..3)
      .observe_on(scheduler.clone())
      .subscribe(move |v| c_seen.lock().push(v));
    handle.unsubscribe();
    scheduler.trigger_actions();

    assert!(seen.lock().is_empty());
    assert_eq!(scheduler.pending_count(), 0);
  }
}
