use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use parking_lot::Mutex;

use crate::{
  subject::SubjectState,
  subscription::Subscription,
};

/// Subscription of one subscriber to a subject.
///
/// Unsubscribing removes only this subscriber; the other subscribers keep
/// receiving events.
pub struct SubjectSubscription<Item, Err, P> {
  state: Arc<Mutex<SubjectState<Item, Err, P>>>,
  id: Option<usize>,
  closed: AtomicBool,
}

impl<Item, Err, P> SubjectSubscription<Item, Err, P> {
  pub(crate) fn new(state: Arc<Mutex<SubjectState<Item, Err, P>>>, id: usize) -> Self {
    Self { state, id: Some(id), closed: AtomicBool::new(false) }
  }

  /// For a subscriber that joined after termination.
  pub(crate) fn finished(state: Arc<Mutex<SubjectState<Item, Err, P>>>) -> Self {
    Self { state, id: None, closed: AtomicBool::new(true) }
  }
}

impl<Item, Err, P> Subscription for SubjectSubscription<Item, Err, P> {
  fn unsubscribe(&self) {
    if self.closed.swap(true, Ordering::AcqRel) {
      return;
    }
    if let Some(id) = self.id {
      let removed = self.state.lock().observers.remove(id);
      drop(removed);
    }
  }

  fn is_closed(&self) -> bool {
    if self.closed.load(Ordering::Acquire) {
      return true;
    }
    let state = self.state.lock();
    state.terminal.is_some() || self.id.map_or(true, |id| !state.observers.contains(id))
  }
}
