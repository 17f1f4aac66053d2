use std::{
  convert::Infallible,
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Weak,
  },
};

use parking_lot::Mutex;

use crate::{
  flowable::{DemandCounter, FlowObserver, FlowSubscription, Flowable, FlowableExt},
  subscription::{Subscription, SubscriptionHandle},
};

/// One step of a [`generate`] producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generated<Item, Err> {
  Next(Item),
  Complete,
  Error(Err),
}

/// A demand-driven producer stepping `state` with `step`.
///
/// `step` runs once per requested item, never more often than requested,
/// and never after it returned a terminal step.
///
/// ```
/// use std::sync::{Arc, Mutex};
///
/// use rxcore::prelude::*;
///
/// let fibonacci = flowable::generate((0u64, 1u64), |(a, b)| {
///   let current = *a;
///   (*a, *b) = (*b, *a + *b);
///   Generated::<_, ()>::Next(current)
/// });
///
/// let seen = Arc::new(Mutex::new(vec![]));
/// let c_seen = seen.clone();
/// fibonacci.to_observable().take(6).subscribe(move |v| c_seen.lock().unwrap().push(v));
/// assert_eq!(*seen.lock().unwrap(), vec![0, 1, 1, 2, 3, 5]);
/// ```
pub fn generate<S, F, Item, Err>(state: S, step: F) -> Generate<S, F>
where
  F: FnMut(&mut S) -> Generated<Item, Err>,
{
  Generate { state, step }
}

/// A demand-driven producer of the iterator's items.
pub fn from_iter<I>(iter: I) -> Generate<I::IntoIter, IterStep<I::IntoIter>>
where
  I: IntoIterator,
{
  generate(iter.into_iter(), next_of::<I::IntoIter> as IterStep<I::IntoIter>)
}

pub type IterStep<I> = fn(&mut I) -> Generated<<I as Iterator>::Item, Infallible>;

fn next_of<I: Iterator>(iter: &mut I) -> Generated<I::Item, Infallible> {
  iter.next().map_or(Generated::Complete, Generated::Next)
}

#[derive(Clone)]
pub struct Generate<S, F> {
  state: S,
  step: F,
}

impl<S, F, Item, Err, O> Flowable<Item, Err, O> for Generate<S, F>
where
  S: Send + 'static,
  F: FnMut(&mut S) -> Generated<Item, Err> + Send + 'static,
  O: FlowObserver<Item, Err> + Send + 'static,
{
  fn actual_subscribe(self, mut observer: O) -> SubscriptionHandle {
    let handle = SubscriptionHandle::new();
    let drain = Arc::new(Drain {
      wip: AtomicUsize::new(0),
      demand: Arc::new(DemandCounter::new()),
      handle: handle.clone(),
      inner: Mutex::new(None),
    });

    // Requests reach the drain weakly; the handle owns it until cancelled.
    let weak: Weak<Drain<S, F, O>> = Arc::downgrade(&drain);
    let subscription = FlowSubscription::new(drain.demand.clone(), handle.clone(), move || {
      if let Some(drain) = weak.upgrade() {
        drain.run();
      }
    });
    observer.on_subscribe(subscription);

    *drain.inner.lock() = Some(Inner { state: self.state, step: self.step, observer });
    let keep = drain.clone();
    handle.add_teardown(move || drop(keep));
    drain.run();
    handle
  }
}

impl<S, F, Item, Err> FlowableExt<Item, Err> for Generate<S, F> where
  F: FnMut(&mut S) -> Generated<Item, Err>
{
}

struct Drain<S, F, O> {
  wip: AtomicUsize,
  demand: Arc<DemandCounter>,
  handle: SubscriptionHandle,
  inner: Mutex<Option<Inner<S, F, O>>>,
}

struct Inner<S, F, O> {
  state: S,
  step: F,
  observer: O,
}

impl<S, F, O> Drain<S, F, O> {
  /// Emit while there is demand. Only one thread drains at a time; a call
  /// arriving meanwhile, including a `request` from inside `next`, makes the
  /// running drain loop once more instead of recursing.
  fn run<Item, Err>(&self)
  where
    F: FnMut(&mut S) -> Generated<Item, Err>,
    O: FlowObserver<Item, Err>,
  {
    if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
      return;
    }
    let mut missed = 1;
    loop {
      self.emit_available();
      missed = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
      if missed == 0 {
        break;
      }
    }
  }

  fn emit_available<Item, Err>(&self)
  where
    F: FnMut(&mut S) -> Generated<Item, Err>,
    O: FlowObserver<Item, Err>,
  {
    let mut guard = self.inner.lock();
    while let Some(inner) = guard.as_mut() {
      if self.handle.is_closed() || inner.observer.is_closed() {
        *guard = None;
        self.handle.unsubscribe();
        return;
      }
      if !self.demand.try_take() {
        return;
      }
      match (inner.step)(&mut inner.state) {
        Generated::Next(value) => inner.observer.next(value),
        Generated::Complete => {
          if let Some(mut inner) = guard.take() {
            inner.observer.complete();
          }
          self.handle.unsubscribe();
        }
        Generated::Error(err) => {
          if let Some(mut inner) = guard.take() {
            inner.observer.error(err);
          }
          self.handle.unsubscribe();
        }
      }
    }
  }
}
