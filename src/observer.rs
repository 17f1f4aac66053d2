//! Observer trait and implementations
//!
//! The Observer trait defines the consumer side of the protocol: zero or more
//! `next` calls followed by at most one terminal event (`error` or
//! `complete`).

use crate::fallback::{self, ErrorSink};

mod safe;
pub use safe::SafeObserver;

// ============================================================================
// Observer Trait
// ============================================================================

/// Observer trait: The consumer of data in reactive programming
///
/// Implementations may assume they are driven by a well-behaved producer;
/// subscriptions made through `ObservableExt::subscribe*` are wrapped in a
/// [`SafeObserver`] which enforces the one-terminal-event rule.
pub trait Observer<Item, Err> {
  /// Receive the next value from the observable
  fn next(&mut self, value: Item);

  /// Handle an error from the observable. No event follows an error.
  fn error(&mut self, err: Err);

  /// Handle completion of the observable. No event follows completion.
  fn complete(&mut self);

  /// Checks if the observer is closed.
  ///
  /// Sources (like `from_iter`) use this to stop emitting early, e.g. after
  /// the subscription was cancelled or a `take` is satisfied.
  fn is_closed(&self) -> bool;
}

/// Boxed observer that can be moved across threads.
pub type BoxedObserver<Item, Err> = Box<dyn Observer<Item, Err> + Send>;

impl<Item, Err, O> Observer<Item, Err> for Box<O>
where
  O: ?Sized + Observer<Item, Err>,
{
  #[inline]
  fn next(&mut self, value: Item) { (**self).next(value) }

  #[inline]
  fn error(&mut self, err: Err) { (**self).error(err) }

  #[inline]
  fn complete(&mut self) { (**self).complete() }

  #[inline]
  fn is_closed(&self) -> bool { (**self).is_closed() }
}

/// Option observer - None ignores all events, Some delegates to inner.
///
/// Terminal events take the inner observer, so the option doubles as a
/// "done" flag for operators that keep their downstream in shared state.
impl<O, Item, Err> Observer<Item, Err> for Option<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if let Some(inner) = self {
      inner.next(value);
    }
  }

  fn error(&mut self, err: Err) {
    if let Some(mut inner) = self.take() {
      inner.error(err);
    }
  }

  fn complete(&mut self) {
    if let Some(mut inner) = self.take() {
      inner.complete();
    }
  }

  fn is_closed(&self) -> bool { self.as_ref().map_or(true, Observer::is_closed) }
}

// ============================================================================
// Closure adapters
// ============================================================================

/// Observer built from a `next` closure only.
///
/// It has no error handler: an error reaching it is reported to the
/// fallback sink captured when the observer was created.
pub struct NextObserver<N> {
  next: N,
  sink: ErrorSink,
}

impl<N> NextObserver<N> {
  pub fn new(next: N) -> Self { Self { next, sink: fallback::current() } }
}

impl<Item, Err, N> Observer<Item, Err> for NextObserver<N>
where
  N: FnMut(Item),
  Err: Send + 'static,
{
  #[inline]
  fn next(&mut self, value: Item) { (self.next)(value) }

  fn error(&mut self, err: Err) { self.sink.report_error(err) }

  #[inline]
  fn complete(&mut self) {}

  #[inline]
  fn is_closed(&self) -> bool { false }
}

/// Observer built from `next` and `error` closures.
pub struct ErrObserver<N, E> {
  next: N,
  error: E,
}

impl<N, E> ErrObserver<N, E> {
  pub fn new(next: N, error: E) -> Self { Self { next, error } }
}

impl<Item, Err, N, E> Observer<Item, Err> for ErrObserver<N, E>
where
  N: FnMut(Item),
  E: FnMut(Err),
{
  #[inline]
  fn next(&mut self, value: Item) { (self.next)(value) }

  #[inline]
  fn error(&mut self, err: Err) { (self.error)(err) }

  #[inline]
  fn complete(&mut self) {}

  #[inline]
  fn is_closed(&self) -> bool { false }
}

/// Observer built from `next`, `error` and `complete` closures.
pub struct AllObserver<N, E, C> {
  next: N,
  error: E,
  complete: C,
}

impl<N, E, C> AllObserver<N, E, C> {
  pub fn new(next: N, error: E, complete: C) -> Self { Self { next, error, complete } }
}

impl<Item, Err, N, E, C> Observer<Item, Err> for AllObserver<N, E, C>
where
  N: FnMut(Item),
  E: FnMut(Err),
  C: FnMut(),
{
  #[inline]
  fn next(&mut self, value: Item) { (self.next)(value) }

  #[inline]
  fn error(&mut self, err: Err) { (self.error)(err) }

  #[inline]
  fn complete(&mut self) { (self.complete)() }

  #[inline]
  fn is_closed(&self) -> bool { false }
}
