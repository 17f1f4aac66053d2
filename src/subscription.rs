//! Cancellation handles.
//!
//! A [`Subscription`] represents a live subscription. Cancelling it is
//! idempotent and monotonic: once closed it stays closed, and every teardown
//! registered with it runs exactly once.

use std::{
  any::Any,
  fmt::{Debug, Formatter},
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
};

use parking_lot::Mutex;
use smallvec::SmallVec;

mod dynamic;
pub(crate) use dynamic::IdSlots;

/// Handle returned from `subscribe` that allows cancelling the subscription
/// before it has finished receiving all events.
pub trait Subscription {
  /// Cancel the subscription. Calling this more than once is a no-op.
  fn unsubscribe(&self);

  fn is_closed(&self) -> bool;
}

/// A boxed subscription that can cross threads.
pub type BoxedSubscription = Box<dyn Subscription + Send + Sync>;

impl<T: ?Sized + Subscription> Subscription for Box<T> {
  #[inline]
  fn unsubscribe(&self) { (**self).unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { (**self).is_closed() }
}

impl<T: ?Sized + Subscription> Subscription for Arc<T> {
  #[inline]
  fn unsubscribe(&self) { (**self).unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { (**self).is_closed() }
}

/// The unit subscription: nothing to cancel, and always closed.
impl Subscription for () {
  #[inline]
  fn unsubscribe(&self) {}

  #[inline]
  fn is_closed(&self) -> bool { true }
}

/// `None` has nothing to cancel and counts as closed.
impl<T: Subscription> Subscription for Option<T> {
  #[inline]
  fn unsubscribe(&self) {
    if let Some(inner) = self {
      inner.unsubscribe();
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.as_ref().map_or(true, Subscription::is_closed) }
}

impl Debug for dyn Subscription + Send + Sync {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("dyn Subscription")
      .field("is_closed", &self.is_closed())
      .finish()
  }
}

// ============================================================================
// SubscriptionHandle
// ============================================================================

/// The cancellation handle shared between a subscriber and the producer.
///
/// Cloning yields another handle to the same subscription. Teardown logic is
/// attached with [`SubscriptionHandle::add`]; it runs when the handle is
/// unsubscribed, or immediately if the handle is already closed.
#[derive(Clone, Default)]
pub struct SubscriptionHandle(Arc<Inner>);

#[derive(Default)]
struct Inner {
  closed: AtomicBool,
  teardown: Mutex<SmallVec<[BoxedSubscription; 1]>>,
}

impl SubscriptionHandle {
  pub fn new() -> Self { Self::default() }

  /// A handle that is already closed.
  pub fn closed() -> Self {
    let handle = Self::default();
    handle.unsubscribe();
    handle
  }

  /// Attach `subscription` so it is cancelled together with this handle.
  ///
  /// Subscriptions that are already closed are not retained.
  pub fn add<S: Subscription + Send + Sync + 'static>(&self, subscription: S) {
    if self.is_same(&subscription) || subscription.is_closed() {
      return;
    }
    let mut teardown = self.0.teardown.lock();
    if self.0.closed.load(Ordering::Acquire) {
      drop(teardown);
      subscription.unsubscribe();
    } else {
      teardown.retain(|s| !s.is_closed());
      teardown.push(Box::new(subscription));
    }
  }

  /// Attach a closure that runs when this handle is cancelled.
  pub fn add_teardown<F: FnOnce() + Send + 'static>(&self, f: F) {
    self.add(ClosureSubscription::new(f));
  }

  /// Number of teardowns currently attached.
  pub fn teardown_size(&self) -> usize { self.0.teardown.lock().len() }

  /// Convert into an RAII guard which unsubscribes when dropped.
  pub fn unsubscribe_when_dropped(self) -> SubscriptionGuard<Self> { SubscriptionGuard(self) }

  fn is_same(&self, other: &dyn Any) -> bool {
    other
      .downcast_ref::<Self>()
      .is_some_and(|other| Arc::ptr_eq(&self.0, &other.0))
  }
}

impl Subscription for SubscriptionHandle {
  fn unsubscribe(&self) {
    let teardown = {
      let mut teardown = self.0.teardown.lock();
      if self.0.closed.swap(true, Ordering::AcqRel) {
        return;
      }
      std::mem::take(&mut *teardown)
    };
    for s in teardown {
      s.unsubscribe();
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.0.closed.load(Ordering::Acquire) }
}

impl Debug for SubscriptionHandle {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SubscriptionHandle")
      .field("is_closed", &self.is_closed())
      .field("teardown_count", &self.teardown_size())
      .finish()
  }
}

// ============================================================================
// ClosureSubscription
// ============================================================================

/// A subscription that runs a closure once when cancelled.
pub struct ClosureSubscription<F>(Mutex<Option<F>>);

impl<F: FnOnce()> ClosureSubscription<F> {
  pub fn new(f: F) -> Self { Self(Mutex::new(Some(f))) }
}

impl<F: FnOnce()> Subscription for ClosureSubscription<F> {
  fn unsubscribe(&self) {
    let f = self.0.lock().take();
    if let Some(f) = f {
      f();
    }
  }

  fn is_closed(&self) -> bool { self.0.lock().is_none() }
}

// ============================================================================
// SubscriptionGuard
// ============================================================================

/// An RAII implementation of a "scoped subscribed" of a subscription.
/// When this structure is dropped (falls out of scope), the subscription will
/// be unsubscribed.
///
/// If you want to drop it immediately, wrap it in its own scope.
#[derive(Debug)]
#[must_use]
pub struct SubscriptionGuard<T: Subscription>(T);

impl<T: Subscription> SubscriptionGuard<T> {
  pub fn new(subscription: T) -> Self { SubscriptionGuard(subscription) }

  pub fn get(&self) -> &T { &self.0 }
}

impl<T: Subscription> Drop for SubscriptionGuard<T> {
  #[inline]
  fn drop(&mut self) { self.0.unsubscribe() }
}
