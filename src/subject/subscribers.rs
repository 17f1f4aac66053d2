use std::{cell::RefCell, sync::Arc};

use parking_lot::ReentrantMutex;

use crate::{observer::BoxedObserver, subscription::IdSlots};

/// One subscriber of a subject.
///
/// The re-entrant lock serializes deliveries from different threads; the
/// `RefCell` detects a delivery nested inside another delivery on the same
/// thread.
pub(crate) type Slot<Item, Err> = Arc<ReentrantMutex<RefCell<BoxedObserver<Item, Err>>>>;

const REENTRANT_EMISSION: &str = "re-entrant Subject emissions are not supported \
                                  (next/error/complete). Use an explicit async boundary (e.g. \
                                  delay(0)) if you need feedback loops.";

/// The live subscribers of a subject, keyed by subscription id.
pub(crate) struct Subscribers<Item, Err> {
  inner: IdSlots<Slot<Item, Err>>,
}

impl<Item, Err> Default for Subscribers<Item, Err> {
  fn default() -> Self { Self { inner: IdSlots::default() } }
}

impl<Item, Err> Subscribers<Item, Err> {
  pub fn add(&mut self, observer: BoxedObserver<Item, Err>) -> (usize, Slot<Item, Err>) {
    let slot = Arc::new(ReentrantMutex::new(RefCell::new(observer)));
    (self.inner.add(slot.clone()), slot)
  }

  #[inline]
  pub fn remove(&mut self, id: usize) -> Option<Slot<Item, Err>> { self.inner.remove(id) }

  #[inline]
  pub fn contains(&self, id: usize) -> bool { self.inner.contains(id) }

  #[inline]
  pub fn len(&self) -> usize { self.inner.len() }

  /// The subscribers an emission pass visits.
  pub fn snapshot(&self) -> Vec<Slot<Item, Err>> { self.inner.iter().cloned().collect() }

  /// Remove every subscriber, for a terminal event.
  pub fn take_all(&mut self) -> Vec<Slot<Item, Err>> { self.inner.drain().collect() }
}

/// Run `f` against the observer in `slot`.
///
/// # Panics
///
/// When called from inside a callback of the same observer.
pub(crate) fn with_observer<Item, Err, R>(
  slot: &Slot<Item, Err>, f: impl FnOnce(&mut BoxedObserver<Item, Err>) -> R,
) -> R {
  let guard = slot.lock();
  let result = match guard.try_borrow_mut() {
    Ok(mut observer) => f(&mut observer),
    Err(_) => panic!("{}", REENTRANT_EMISSION),
  };
  result
}

/// Deliver `value` to every slot; the last one receives the moved value.
pub(crate) fn broadcast_value<Item: Clone, Err>(slots: Vec<Slot<Item, Err>>, value: Item) {
  let mut iter = slots.into_iter().peekable();
  while let Some(slot) = iter.next() {
    if iter.peek().is_some() {
      with_observer(&slot, |o| o.next(value.clone()));
    } else {
      with_observer(&slot, |o| o.next(value));
      break;
    }
  }
}

pub(crate) fn broadcast_error<Item, Err: Clone>(slots: Vec<Slot<Item, Err>>, err: Err) {
  let mut iter = slots.into_iter().peekable();
  while let Some(slot) = iter.next() {
    if iter.peek().is_some() {
      with_observer(&slot, |o| o.error(err.clone()));
    } else {
      with_observer(&slot, |o| o.error(err));
      break;
    }
  }
}

/// Complete every slot, handing `last` to each one first when present.
pub(crate) fn broadcast_complete<Item: Clone, Err>(
  slots: Vec<Slot<Item, Err>>, last: Option<Item>,
) {
  for slot in slots {
    with_observer(&slot, |o| {
      if let Some(last) = &last {
        o.next(last.clone());
      }
      o.complete();
    });
  }
}
