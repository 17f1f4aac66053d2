use std::{cell::RefCell, sync::Arc};

use parking_lot::ReentrantMutex;

use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  subscription::{Subscription, SubscriptionHandle},
};

const REENTRANT_MERGE: &str = "re-entrant merge delivery: a merge subscriber emitted into one of \
                               the merged sources from its own callback";

#[derive(Clone)]
pub struct MergeOp<S1, S2> {
  source1: S1,
  source2: S2,
}

impl<S1, S2> MergeOp<S1, S2> {
  pub(crate) fn new(source1: S1, source2: S2) -> Self { Self { source1, source2 } }
}

impl<Item, Err, O, S1, S2> Observable<Item, Err, O> for MergeOp<S1, S2>
where
  O: Observer<Item, Err>,
  S1: Observable<Item, Err, MergeObserver<O>>,
  S2: Observable<Item, Err, MergeObserver<O>>,
{
  type Unsub = SubscriptionHandle;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let handle = SubscriptionHandle::new();
    let state = MergeState { observer: Some(observer), completed: 0 };
    let state = Arc::new(ReentrantMutex::new(RefCell::new(state)));

    let merge = MergeObserver { state: state.clone(), handle: handle.clone() };
    handle.add(self.source1.actual_subscribe(merge));
    let merge = MergeObserver { state, handle: handle.clone() };
    handle.add(self.source2.actual_subscribe(merge));
    handle
  }
}

impl<Item, Err, S1, S2> ObservableExt<Item, Err> for MergeOp<S1, S2>
where
  S1: ObservableExt<Item, Err>,
  S2: ObservableExt<Item, Err>,
{
}

struct MergeState<O> {
  observer: Option<O>,
  completed: u8,
}

/// Both sources deliver through one lock, so the downstream sees one event
/// at a time. The lock is re-entrant only to detect a callback feeding a
/// merged source on the same thread, which panics.
pub struct MergeObserver<O> {
  state: Arc<ReentrantMutex<RefCell<MergeState<O>>>>,
  handle: SubscriptionHandle,
}

impl<O> MergeObserver<O> {
  fn with_state<R>(&self, f: impl FnOnce(&mut MergeState<O>) -> R) -> R {
    let guard = self.state.lock();
    let result = match guard.try_borrow_mut() {
      Ok(mut state) => f(&mut state),
      Err(_) => panic!("{}", REENTRANT_MERGE),
    };
    result
  }
}

impl<Item, Err, O> Observer<Item, Err> for MergeObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) { self.with_state(|state| state.observer.next(value)) }

  fn error(&mut self, err: Err) {
    let observer = self.with_state(|state| state.observer.take());
    if let Some(mut observer) = observer {
      observer.error(err);
      self.handle.unsubscribe();
    }
  }

  fn complete(&mut self) {
    let observer = self.with_state(|state| {
      state.completed += 1;
      if state.completed == 2 {
        state.observer.take()
      } else {
        None
      }
    });
    if let Some(mut observer) = observer {
      observer.complete();
    }
  }

  fn is_closed(&self) -> bool {
    if self.handle.is_closed() {
      return true;
    }
    let guard = self.state.lock();
    // Borrowed means a delivery is in progress on this thread.
    let closed = guard.try_borrow().map_or(false, |state| state.observer.is_closed());
    closed
  }
}
