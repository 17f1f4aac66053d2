//! Demand-driven streams.
//!
//! A [`Flowable`] emits only what its consumer asked for. The consumer is a
//! [`FlowObserver`]: before any item it receives a [`FlowSubscription`] and
//! grants demand through [`FlowSubscription::request`]. Demand starts at
//! zero, so nothing is emitted until the first request. Requests add up, and
//! requesting [`UNBOUNDED`] turns the subscription into plain push.
//!
//! Push sources that cannot slow down, like timers or subjects, are adapted
//! with `ObservableExt::on_backpressure_buffer` or
//! `ObservableExt::on_backpressure_drop`.
//!
//! ```
//! use std::sync::{Arc, Mutex};
//!
//! use rxcore::prelude::*;
//!
//! let seen = Arc::new(Mutex::new(vec![]));
//! let c_seen = seen.clone();
//! // keeps two items outstanding
//! flowable::from_iter(1..=5).subscribe_requesting(2, move |v| c_seen.lock().unwrap().push(v));
//! assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 4, 5]);
//! ```

use std::{
  fmt::{Debug, Formatter},
  sync::Arc,
};

use tracing::warn;

use crate::{
  fallback::{self, ErrorSink},
  observable::{Observable, ObservableExt},
  observer::{Observer, SafeObserver},
  subscription::{Subscription, SubscriptionHandle},
};

mod demand;
mod generate;
mod on_backpressure;
mod stream;

pub use demand::{DemandCounter, UNBOUNDED};
pub use generate::{from_iter, generate, Generate, Generated};
pub use on_backpressure::{BackpressureObserver, BackpressureStrategy, OnBackpressure};
pub use stream::{FlowStream, StreamObserver};

/// An observer that receives its subscription first and pulls items through
/// it.
pub trait FlowObserver<Item, Err>: Observer<Item, Err> {
  /// Called once, before any other event.
  fn on_subscribe(&mut self, subscription: FlowSubscription);
}

impl<Item, Err, O> FlowObserver<Item, Err> for SafeObserver<O>
where
  O: FlowObserver<Item, Err>,
  Err: Send + 'static,
{
  fn on_subscribe(&mut self, subscription: FlowSubscription) {
    if let Some(observer) = self.inner_mut() {
      observer.on_subscribe(subscription);
    }
  }
}

/// The consumer's side of a demand-driven subscription.
///
/// Clones refer to the same subscription.
#[derive(Clone)]
pub struct FlowSubscription {
  demand: Arc<DemandCounter>,
  handle: SubscriptionHandle,
  on_request: Arc<dyn Fn() + Send + Sync>,
}

impl FlowSubscription {
  /// `on_request` runs after every accepted request; producers use it to
  /// resume emission.
  pub(crate) fn new<F>(
    demand: Arc<DemandCounter>, handle: SubscriptionHandle, on_request: F,
  ) -> Self
  where
    F: Fn() + Send + Sync + 'static,
  {
    Self { demand, handle, on_request: Arc::new(on_request) }
  }

  /// Allow `n` more items. `n == 0` is a consumer bug and is ignored.
  pub fn request(&self, n: u64) {
    if n == 0 {
      warn!("request(0) ignored; demand must be positive");
      return;
    }
    if self.handle.is_closed() {
      return;
    }
    self.demand.add(n);
    (self.on_request)();
  }

  /// Stop the producer. Pending and future items are discarded.
  pub fn cancel(&self) { self.handle.unsubscribe() }

  /// Outstanding demand.
  pub fn requested(&self) -> u64 { self.demand.get() }
}

impl Subscription for FlowSubscription {
  fn unsubscribe(&self) { self.cancel() }

  fn is_closed(&self) -> bool { self.handle.is_closed() }
}

impl Debug for FlowSubscription {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("FlowSubscription")
      .field("requested", &self.requested())
      .field("is_closed", &self.is_closed())
      .finish()
  }
}

/// A producer that honours consumer demand.
pub trait Flowable<Item, Err, O>
where
  O: FlowObserver<Item, Err>,
{
  /// Hand `observer` its [`FlowSubscription`] and start serving requests.
  fn actual_subscribe(self, observer: O) -> SubscriptionHandle;
}

pub trait FlowableExt<Item, Err>: Sized {
  /// Subscribe a demand-aware observer, wrapped in a [`SafeObserver`].
  fn subscribe_with<O>(self, observer: O) -> SubscriptionHandle
  where
    O: FlowObserver<Item, Err>,
    Err: Send + 'static,
    Self: Flowable<Item, Err, SafeObserver<O>>,
  {
    let handle = SubscriptionHandle::new();
    let safe = SafeObserver::new(observer, handle.clone(), fallback::current());
    handle.add(self.actual_subscribe(safe));
    handle
  }

  /// Request `prefetch` items up front and one more after each item.
  ///
  /// Errors go to the fallback sink.
  fn subscribe_requesting<N>(self, prefetch: u64, next: N) -> SubscriptionHandle
  where
    N: FnMut(Item),
    Err: Send + 'static,
    Self: Flowable<Item, Err, SafeObserver<Requesting<N>>>,
  {
    self.subscribe_with(Requesting::new(prefetch, next))
  }

  /// Request everything up front and continue as a plain observable.
  fn to_observable(self) -> ToObservable<Self> { ToObservable(self) }

  /// Bridge to a `futures::Stream` requesting one item per poll.
  fn into_stream(self) -> FlowStream<Item, Err>
  where
    Self: Flowable<Item, Err, StreamObserver<Item, Err>>,
  {
    FlowStream::new(self)
  }
}

/// Observer behind [`FlowableExt::subscribe_requesting`].
pub struct Requesting<N> {
  next: N,
  prefetch: u64,
  subscription: Option<FlowSubscription>,
  sink: ErrorSink,
}

impl<N> Requesting<N> {
  fn new(prefetch: u64, next: N) -> Self {
    Self { next, prefetch, subscription: None, sink: fallback::current() }
  }
}

impl<Item, Err, N> Observer<Item, Err> for Requesting<N>
where
  N: FnMut(Item),
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) {
    (self.next)(value);
    if self.prefetch != UNBOUNDED {
      if let Some(subscription) = &self.subscription {
        subscription.request(1);
      }
    }
  }

  fn error(&mut self, err: Err) { self.sink.report_error(err) }

  fn complete(&mut self) {}

  fn is_closed(&self) -> bool { false }
}

impl<Item, Err, N> FlowObserver<Item, Err> for Requesting<N>
where
  N: FnMut(Item),
  Err: Send + 'static,
{
  fn on_subscribe(&mut self, subscription: FlowSubscription) {
    subscription.request(self.prefetch);
    self.subscription = Some(subscription);
  }
}

/// A flowable consumed with unbounded demand.
#[derive(Clone)]
pub struct ToObservable<F>(F);

impl<Item, Err, O, F> Observable<Item, Err, O> for ToObservable<F>
where
  O: Observer<Item, Err>,
  F: Flowable<Item, Err, Unbounded<O>>,
{
  type Unsub = SubscriptionHandle;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.0.actual_subscribe(Unbounded(observer))
  }
}

impl<Item, Err, F> ObservableExt<Item, Err> for ToObservable<F> where F: FlowableExt<Item, Err> {}

pub struct Unbounded<O>(O);

impl<Item, Err, O: Observer<Item, Err>> Observer<Item, Err> for Unbounded<O> {
  fn next(&mut self, value: Item) { self.0.next(value) }

  fn error(&mut self, err: Err) { self.0.error(err) }

  fn complete(&mut self) { self.0.complete() }

  fn is_closed(&self) -> bool { self.0.is_closed() }
}

impl<Item, Err, O: Observer<Item, Err>> FlowObserver<Item, Err> for Unbounded<O> {
  fn on_subscribe(&mut self, subscription: FlowSubscription) { subscription.request(UNBOUNDED) }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use parking_lot::Mutex;

  use crate::{fallback::ErrorSink, prelude::*};

  #[test]
  fn zero_request_is_ignored() {
    let slot = Arc::new(Mutex::new(None));
    let c_slot = slot.clone();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    flowable::from_iter(0..3).subscribe_with(Manual::new(c_slot, c_seen));

    let subscription = slot.lock().clone().unwrap();
    subscription.request(0);
    assert!(seen.lock().is_empty());
    assert_eq!(subscription.requested(), 0);
    subscription.request(2);
    assert_eq!(*seen.lock(), vec![0, 1]);
  }

  #[test]
  fn to_observable_pushes_everything() {
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    flowable::from_iter(0..4).to_observable().subscribe(move |v| c_seen.lock().push(v));
    assert_eq!(*seen.lock(), vec![0, 1, 2, 3]);
  }

  #[test]
  fn requesting_reports_errors_to_sink() {
    let orphans = Arc::new(Mutex::new(vec![]));
    let c_orphans = orphans.clone();
    let sink = ErrorSink::new(move |err| c_orphans.lock().push(err.message()));
    fallback::with_sink(sink, || {
      flowable::generate((), |_| Generated::<i32, &str>::Error("broken"))
        .subscribe_requesting(1, |_| {});
    });
    assert_eq!(*orphans.lock(), vec!["broken"]);
  }

  /// Stores its subscription and lets the test drive demand.
  pub(crate) struct Manual {
    slot: Arc<Mutex<Option<FlowSubscription>>>,
    seen: Arc<Mutex<Vec<i32>>>,
  }

  impl Manual {
    pub(crate) fn new(
      slot: Arc<Mutex<Option<FlowSubscription>>>, seen: Arc<Mutex<Vec<i32>>>,
    ) -> Self {
      Self { slot, seen }
    }
  }

  impl<Err> Observer<i32, Err> for Manual {
    fn next(&mut self, value: i32) { self.seen.lock().push(value) }

    fn error(&mut self, _: Err) { self.seen.lock().push(-1) }

    fn complete(&mut self) { self.seen.lock().push(i32::MAX) }

    fn is_closed(&self) -> bool { false }
  }

  impl<Err> FlowObserver<i32, Err> for Manual {
    fn on_subscribe(&mut self, subscription: FlowSubscription) {
      *self.slot.lock() = Some(subscription);
    }
  }
}
