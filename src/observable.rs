//! Observable traits and factory functions.
//!
//! An observable is a value describing how to produce events for one
//! observer. Subscribing consumes the value; clone it to subscribe again.
//! Every subscription is independent of the others.

use std::time::Duration;

use crate::{
  error::RxError,
  fallback::{self, ErrorSink},
  flowable::{BackpressureStrategy, OnBackpressure},
  observer::{AllObserver, ErrObserver, NextObserver, Observer, SafeObserver},
  ops::{
    delay::DelayOp, filter::FilterOp, map::MapOp, map_err::MapErrOp, merge::MergeOp,
    observe_on::ObserveOnOp, subscribe_on::SubscribeOnOp, take::TakeOp, timeout::TimeoutOp,
  },
  scheduler::Scheduler,
  subscription::{Subscription, SubscriptionHandle},
};

mod boxed;
mod create;
mod from_iter;
mod timer;

pub use boxed::*;
pub use create::*;
pub use from_iter::*;
pub use timer::*;

/// A producer of events for an observer of type `O`.
///
/// `actual_subscribe` wires the observer to the producer and returns the
/// subscription releasing the producer's resources. Application code calls
/// the `subscribe*` methods of [`ObservableExt`] instead, which wrap the
/// observer in a [`SafeObserver`].
pub trait Observable<Item, Err, O>
where
  O: Observer<Item, Err>,
{
  type Unsub: Subscription + Send + Sync + 'static;

  fn actual_subscribe(self, observer: O) -> Self::Unsub;
}

/// Subscription entry points and operators available on every observable.
pub trait ObservableExt<Item, Err>: Sized {
  /// Subscribe with a closure receiving each item.
  ///
  /// Errors have nowhere to go and are reported to the fallback error sink.
  fn subscribe<N>(self, next: N) -> SubscriptionHandle
  where
    N: FnMut(Item),
    Err: Send + 'static,
    Self: Observable<Item, Err, SafeObserver<NextObserver<N>>>,
  {
    self.subscribe_with(NextObserver::new(next))
  }

  /// Subscribe with closures for items and errors.
  fn subscribe_err<N, E>(self, next: N, error: E) -> SubscriptionHandle
  where
    N: FnMut(Item),
    E: FnMut(Err),
    Err: Send + 'static,
    Self: Observable<Item, Err, SafeObserver<ErrObserver<N, E>>>,
  {
    self.subscribe_with(ErrObserver::new(next, error))
  }

  /// Subscribe with closures for every event.
  fn subscribe_all<N, E, C>(self, next: N, error: E, complete: C) -> SubscriptionHandle
  where
    N: FnMut(Item),
    E: FnMut(Err),
    C: FnMut(),
    Err: Send + 'static,
    Self: Observable<Item, Err, SafeObserver<AllObserver<N, E, C>>>,
  {
    self.subscribe_with(AllObserver::new(next, error, complete))
  }

  /// Subscribe an observer.
  ///
  /// The observer is wrapped in a [`SafeObserver`] bound to the returned
  /// handle and to the fallback sink in effect on the calling thread.
  fn subscribe_with<O>(self, observer: O) -> SubscriptionHandle
  where
    O: Observer<Item, Err>,
    Err: Send + 'static,
    Self: Observable<Item, Err, SafeObserver<O>>,
  {
    self.subscribe_with_sink(observer, fallback::current())
  }

  /// Like [`ObservableExt::subscribe_with`], reporting errors nobody can
  /// observe to `sink` instead of the current fallback sink.
  fn subscribe_with_sink<O>(self, observer: O, sink: ErrorSink) -> SubscriptionHandle
  where
    O: Observer<Item, Err>,
    Err: Send + 'static,
    Self: Observable<Item, Err, SafeObserver<O>>,
  {
    let handle = SubscriptionHandle::new();
    let safe = SafeObserver::new(observer, handle.clone(), sink);
    let unsub = self.actual_subscribe(safe);
    handle.add(unsub);
    handle
  }

  /// Transform every item with `f`.
  fn map<B, F>(self, f: F) -> MapOp<Self, F, Item>
  where
    F: FnMut(Item) -> B,
  {
    MapOp::new(self, f)
  }

  /// Transform the error with `f`.
  fn map_err<E, F>(self, f: F) -> MapErrOp<Self, F, Err>
  where
    F: FnOnce(Err) -> E,
  {
    MapErrOp::new(self, f)
  }

  /// Emit only the items for which `f` returns true.
  fn filter<F>(self, f: F) -> FilterOp<Self, F>
  where
    F: FnMut(&Item) -> bool,
  {
    FilterOp::new(self, f)
  }

  /// Emit the first `count` items, then complete.
  fn take(self, count: usize) -> TakeOp<Self> { TakeOp::new(self, count) }

  /// Interleave the items of both observables; completes when both have.
  fn merge<S>(self, other: S) -> MergeOp<Self, S>
  where
    S: ObservableExt<Item, Err>,
  {
    MergeOp::new(self, other)
  }

  /// Deliver every event on a worker of `scheduler`.
  fn observe_on<Sch: Scheduler>(self, scheduler: Sch) -> ObserveOnOp<Self, Sch> {
    ObserveOnOp::new(self, scheduler)
  }

  /// Run the subscription itself on a worker of `scheduler`.
  fn subscribe_on<Sch: Scheduler>(self, scheduler: Sch) -> SubscribeOnOp<Self, Sch> {
    SubscribeOnOp::new(self, scheduler)
  }

  /// Shift items and completion forward in time by `delay`.
  fn delay<Sch: Scheduler>(self, delay: Duration, scheduler: Sch) -> DelayOp<Self, Sch> {
    DelayOp::new(self, delay, scheduler)
  }

  /// Fail with [`RxError::Timeout`] when no item arrives within `after` of
  /// subscribing or of the previous item.
  fn timeout<Sch: Scheduler>(self, after: Duration, scheduler: Sch) -> TimeoutOp<Self, Sch>
  where
    Err: From<RxError>,
  {
    TimeoutOp::new(self, after, scheduler)
  }

  /// Adapt to a demand-driven consumer by queueing up to `capacity` items.
  ///
  /// Exceeding the capacity fails with [`RxError::BufferOverflow`].
  fn on_backpressure_buffer(self, capacity: usize) -> OnBackpressure<Self, Err, fn(Item)>
  where
    Err: From<RxError>,
  {
    OnBackpressure::new(self, BackpressureStrategy::Buffer { capacity }, None)
  }

  /// Adapt to a demand-driven consumer by discarding items it did not ask for.
  fn on_backpressure_drop(self) -> OnBackpressure<Self, Err, fn(Item)> {
    OnBackpressure::dropping(self, None)
  }

  /// Like [`ObservableExt::on_backpressure_drop`], handing every discarded
  /// item to `on_drop`.
  fn on_backpressure_drop_with<F>(self, on_drop: F) -> OnBackpressure<Self, Err, F>
  where
    F: FnMut(Item),
  {
    OnBackpressure::dropping(self, Some(on_drop))
  }

  /// Adapt with an explicitly chosen strategy.
  fn on_backpressure(self, strategy: BackpressureStrategy) -> OnBackpressure<Self, Err, fn(Item)>
  where
    Err: From<RxError>,
  {
    OnBackpressure::new(self, strategy, None)
  }

  /// Erase the concrete type.
  fn box_it(self) -> BoxObservable<Item, Err>
  where
    Item: 'static,
    Err: 'static,
    Self: Observable<Item, Err, crate::observer::BoxedObserver<Item, Err>>
      + Clone
      + Send
      + Sync
      + 'static,
  {
    BoxObservable::new(self)
  }
}
