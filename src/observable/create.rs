use std::{marker::PhantomData, sync::Arc};

use parking_lot::Mutex;

use crate::{
  fallback,
  observable::{Observable, ObservableExt},
  observer::{BoxedObserver, Observer, SafeObserver},
  subscription::{Subscription, SubscriptionHandle},
};

/// Creates an observable from a subscribe function.
///
/// The function receives an [`Emitter`] and may push events through it
/// synchronously, or move clones of it to other threads and emit later.
/// Returning `Err` delivers that error to the observer; when a terminal event
/// was already sent, the error goes to the fallback sink instead.
///
/// ```
/// use std::sync::{Arc, Mutex};
///
/// use rxcore::prelude::*;
///
/// let source = observable::create(|emitter: Emitter<i32, &str>| {
///   emitter.next(1);
///   emitter.next(2);
///   emitter.complete();
///   Ok(())
/// });
///
/// let seen = Arc::new(Mutex::new(vec![]));
/// let c_seen = seen.clone();
/// source.subscribe(move |v| c_seen.lock().unwrap().push(v));
/// assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
/// ```
pub fn create<F, Item, Err>(subscribe: F) -> Create<F, Item, Err>
where
  F: FnOnce(Emitter<Item, Err>) -> Result<(), Err>,
{
  Create { subscribe, _marker: PhantomData }
}

#[derive(Clone)]
pub struct Create<F, Item, Err> {
  subscribe: F,
  _marker: PhantomData<fn() -> (Item, Err)>,
}

impl<F, Item, Err, O> Observable<Item, Err, O> for Create<F, Item, Err>
where
  F: FnOnce(Emitter<Item, Err>) -> Result<(), Err>,
  O: Observer<Item, Err> + Send + 'static,
  Item: 'static,
  Err: Send + 'static,
{
  type Unsub = SubscriptionHandle;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let handle = SubscriptionHandle::new();
    let emitter = Emitter::new(Box::new(observer), handle.clone());
    if let Err(err) = (self.subscribe)(emitter.clone()) {
      emitter.error(err);
    }
    handle
  }
}

impl<F, Item, Err> ObservableExt<Item, Err> for Create<F, Item, Err> where
  F: FnOnce(Emitter<Item, Err>) -> Result<(), Err>
{
}

/// The producer side handed to a [`create`] subscribe function.
///
/// Cloning yields another emitter for the same subscription. Events sent
/// after a terminal event or after the subscriber cancelled are dropped.
/// Emitting from inside the observer's own callbacks is not supported.
pub struct Emitter<Item, Err> {
  observer: Arc<Mutex<SafeObserver<BoxedObserver<Item, Err>>>>,
  handle: SubscriptionHandle,
}

impl<Item, Err> Clone for Emitter<Item, Err> {
  fn clone(&self) -> Self { Self { observer: self.observer.clone(), handle: self.handle.clone() } }
}

impl<Item, Err: Send + 'static> Emitter<Item, Err> {
  fn new(observer: BoxedObserver<Item, Err>, handle: SubscriptionHandle) -> Self {
    let safe = SafeObserver::new(observer, handle.clone(), fallback::current());
    Self { observer: Arc::new(Mutex::new(safe)), handle }
  }

  pub fn next(&self, value: Item) { self.observer.lock().next(value) }

  pub fn error(&self, err: Err) { self.observer.lock().error(err) }

  pub fn complete(&self) { self.observer.lock().complete() }

  /// True once the subscriber cancelled or a terminal event was sent.
  pub fn is_closed(&self) -> bool { self.handle.is_closed() }

  /// Run `f` when the subscription ends, by cancellation or terminal event.
  pub fn add_teardown<F: FnOnce() + Send + 'static>(&self, f: F) { self.handle.add_teardown(f) }

  /// Tie `subscription` to the lifetime of this subscription.
  pub fn add<S: Subscription + Send + Sync + 'static>(&self, subscription: S) {
    self.handle.add(subscription)
  }
}

/// An emitter is itself an observer, so another observable can feed it.
impl<Item, Err: Send + 'static> Observer<Item, Err> for Emitter<Item, Err> {
  fn next(&mut self, value: Item) { Emitter::next(self, value) }

  fn error(&mut self, err: Err) { Emitter::error(self, err) }

  fn complete(&mut self) { Emitter::complete(self) }

  fn is_closed(&self) -> bool { Emitter::is_closed(self) }
}
