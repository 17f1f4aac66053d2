use crate::{
  fallback::ErrorSink,
  observer::Observer,
  subscription::{Subscription, SubscriptionHandle},
};

/// Wrapper enforcing the observer contract on behalf of the subscriber.
///
/// - Nothing is delivered after a terminal event or after the handle was
///   cancelled; such events are swallowed.
/// - A terminal event unsubscribes the handle, which releases whatever the
///   producer attached to it.
/// - An error that can no longer be delivered goes to the fallback sink.
pub struct SafeObserver<O> {
  observer: Option<O>,
  handle: SubscriptionHandle,
  sink: ErrorSink,
}

impl<O> SafeObserver<O> {
  pub fn new(observer: O, handle: SubscriptionHandle, sink: ErrorSink) -> Self {
    Self { observer: Some(observer), handle, sink }
  }

  pub fn handle(&self) -> &SubscriptionHandle { &self.handle }

  /// True once a terminal event passed through this wrapper.
  pub fn is_terminated(&self) -> bool { self.observer.is_none() }

  /// The wrapped observer, until a terminal event passed through.
  pub fn inner_mut(&mut self) -> Option<&mut O> { self.observer.as_mut() }
}

impl<Item, Err, O> Observer<Item, Err> for SafeObserver<O>
where
  O: Observer<Item, Err>,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) {
    if self.handle.is_closed() {
      tracing::trace!("item after cancellation swallowed");
      return;
    }
    match &mut self.observer {
      Some(observer) => observer.next(value),
      None => tracing::trace!("item after terminal event swallowed"),
    }
  }

  fn error(&mut self, err: Err) {
    if self.handle.is_closed() {
      self.sink.report_error(err);
      return;
    }
    match self.observer.take() {
      Some(mut observer) => {
        observer.error(err);
        self.handle.unsubscribe();
      }
      None => self.sink.report_error(err),
    }
  }

  fn complete(&mut self) {
    if self.handle.is_closed() {
      tracing::trace!("completion after cancellation swallowed");
      return;
    }
    if let Some(mut observer) = self.observer.take() {
      observer.complete();
      self.handle.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool {
    self.handle.is_closed() || self.observer.as_ref().map_or(true, Observer::is_closed)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use parking_lot::Mutex;

  use super::*;

  #[derive(Default)]
  struct Recorder(Arc<Mutex<Vec<String>>>);

  impl Observer<i32, &'static str> for Recorder {
    fn next(&mut self, value: i32) { self.0.lock().push(format!("next {value}")); }

    fn error(&mut self, err: &'static str) { self.0.lock().push(format!("error {err}")); }

    fn complete(&mut self) { self.0.lock().push("complete".to_owned()); }

    fn is_closed(&self) -> bool { false }
  }

  fn sink() -> (ErrorSink, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    (ErrorSink::new(move |err| c_seen.lock().push(err.message())), seen)
  }

  #[test]
  fn nothing_after_terminal() {
    let log = Arc::new(Mutex::new(vec![]));
    let (sink, orphans) = sink();
    let handle = SubscriptionHandle::new();
    let mut safe = SafeObserver::new(Recorder(log.clone()), handle.clone(), sink);

    safe.next(1);
    safe.complete();
    safe.next(2);
    safe.complete();
    safe.error("late");

    assert_eq!(*log.lock(), vec!["next 1", "complete"]);
    assert_eq!(*orphans.lock(), vec!["late"]);
    assert!(handle.is_closed());
    assert!(Observer::<i32, &str>::is_closed(&safe));
  }

  #[test]
  fn error_after_cancel_goes_to_sink() {
    let log = Arc::new(Mutex::new(vec![]));
    let (sink, orphans) = sink();
    let handle = SubscriptionHandle::new();
    let mut safe = SafeObserver::new(Recorder(log.clone()), handle.clone(), sink);

    handle.unsubscribe();
    safe.next(1);
    safe.error("orphan");

    assert!(log.lock().is_empty());
    assert_eq!(*orphans.lock(), vec!["orphan"]);
  }

  #[test]
  fn terminal_event_runs_teardown() {
    let (sink, _) = sink();
    let handle = SubscriptionHandle::new();
    let released = Arc::new(Mutex::new(false));
    let c_released = released.clone();
    handle.add_teardown(move || *c_released.lock() = true);

    let mut safe = SafeObserver::new(Recorder::default(), handle, sink);
    safe.error("boom");
    assert!(*released.lock());
  }
}
