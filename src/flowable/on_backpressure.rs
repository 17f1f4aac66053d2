use std::{
  collections::VecDeque,
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  },
};

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::{
  error::RxError,
  flowable::{DemandCounter, FlowObserver, FlowSubscription, Flowable, FlowableExt},
  observable::{Observable, ObservableExt},
  observer::Observer,
  subscription::{Subscription, SubscriptionHandle},
};

/// What to do with items a push source emits beyond consumer demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackpressureStrategy {
  /// Queue up to `capacity` undelivered items; one more fails the
  /// subscription with [`RxError::BufferOverflow`].
  Buffer { capacity: usize },
  /// Discard items nobody asked for.
  Drop,
}

enum Mode<Err> {
  Buffer { capacity: usize, overflow: fn(RxError) -> Err },
  Drop,
}

impl<Err> Clone for Mode<Err> {
  fn clone(&self) -> Self {
    match self {
      Mode::Buffer { capacity, overflow } => {
        Mode::Buffer { capacity: *capacity, overflow: *overflow }
      }
      Mode::Drop => Mode::Drop,
    }
  }
}

/// A push observable adapted to demand-driven consumers.
///
/// Items are delivered in upstream order. With [`BackpressureStrategy::Buffer`]
/// completion waits until the buffered items were requested, while an
/// upstream error is delivered at once and discards them. Emitting into the
/// upstream from inside the consumer's callbacks is not supported.
///
/// ```
/// use std::sync::{Arc, Mutex};
///
/// use rxcore::prelude::*;
///
/// let subject = PublishSubject::<i32, RxError>::new();
/// let seen = Arc::new(Mutex::new(vec![]));
/// let c_seen = seen.clone();
/// subject
///   .clone()
///   .on_backpressure_buffer(16)
///   .subscribe_requesting(1, move |v| c_seen.lock().unwrap().push(v));
///
/// (0..4).for_each(|v| subject.next(v));
/// assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3]);
/// ```
pub struct OnBackpressure<S, Err, F> {
  source: S,
  mode: Mode<Err>,
  on_drop: Option<F>,
}

impl<S: Clone, Err, F: Clone> Clone for OnBackpressure<S, Err, F> {
  fn clone(&self) -> Self {
    Self { source: self.source.clone(), mode: self.mode.clone(), on_drop: self.on_drop.clone() }
  }
}

impl<S, Err, F> OnBackpressure<S, Err, F> {
  pub(crate) fn new(source: S, strategy: BackpressureStrategy, on_drop: Option<F>) -> Self
  where
    Err: From<RxError>,
  {
    let mode = match strategy {
      BackpressureStrategy::Buffer { capacity } => {
        Mode::Buffer { capacity, overflow: <Err as From<RxError>>::from }
      }
      BackpressureStrategy::Drop => Mode::Drop,
    };
    Self { source, mode, on_drop }
  }

  /// Drop strategy, for sources whose error type cannot carry an overflow.
  pub(crate) fn dropping(source: S, on_drop: Option<F>) -> Self {
    Self { source, mode: Mode::Drop, on_drop }
  }
}

impl<Item, Err, O, S, F> Flowable<Item, Err, O> for OnBackpressure<S, Err, F>
where
  O: FlowObserver<Item, Err> + Send + 'static,
  S: Observable<Item, Err, BackpressureObserver<Item, Err, O, F>>,
  Item: Send + 'static,
  Err: Send + 'static,
  F: FnMut(Item) + Send + 'static,
{
  fn actual_subscribe(self, mut observer: O) -> SubscriptionHandle {
    let handle = SubscriptionHandle::new();
    let shared = Arc::new(Shared {
      mode: self.mode,
      demand: Arc::new(DemandCounter::new()),
      wip: AtomicUsize::new(0),
      handle: handle.clone(),
      state: Mutex::new(State {
        queue: VecDeque::new(),
        observer: None,
        upstream_done: false,
        on_drop: self.on_drop,
      }),
    });

    let weak = Arc::downgrade(&shared);
    let subscription = FlowSubscription::new(shared.demand.clone(), handle.clone(), move || {
      if let Some(shared) = weak.upgrade() {
        shared.drain();
      }
    });
    observer.on_subscribe(subscription);
    shared.state.lock().observer = Some(observer);

    let keep = shared.clone();
    handle.add_teardown(move || drop(keep));
    let upstream = self.source.actual_subscribe(BackpressureObserver(shared));
    handle.add(upstream);
    handle
  }
}

impl<Item, Err, S, F> FlowableExt<Item, Err> for OnBackpressure<S, Err, F> where
  S: ObservableExt<Item, Err>
{
}

struct Shared<Item, Err, O, F> {
  mode: Mode<Err>,
  demand: Arc<DemandCounter>,
  wip: AtomicUsize,
  handle: SubscriptionHandle,
  state: Mutex<State<Item, O, F>>,
}

struct State<Item, O, F> {
  queue: VecDeque<Item>,
  observer: Option<O>,
  upstream_done: bool,
  on_drop: Option<F>,
}

impl<Item, Err, O, F> Shared<Item, Err, O, F>
where
  O: FlowObserver<Item, Err>,
  F: FnMut(Item),
{
  fn drain(&self) {
    if matches!(self.mode, Mode::Drop) {
      return;
    }
    if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
      return;
    }
    let mut missed = 1;
    loop {
      self.emit_buffered();
      missed = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
      if missed == 0 {
        break;
      }
    }
  }

  fn emit_buffered(&self) {
    let mut state = self.state.lock();
    loop {
      if self.handle.is_closed() {
        state.queue.clear();
        state.observer = None;
        return;
      }
      if state.queue.is_empty() {
        if state.upstream_done {
          if let Some(mut observer) = state.observer.take() {
            observer.complete();
          }
          drop(state);
          self.handle.unsubscribe();
        }
        return;
      }
      if !self.demand.try_take() {
        return;
      }
      let Some(value) = state.queue.pop_front() else { return };
      match state.observer.as_mut() {
        Some(observer) => observer.next(value),
        None => return,
      }
    }
  }

  fn terminate_with(&self, err: Err) {
    let observer = {
      let mut state = self.state.lock();
      state.queue.clear();
      state.observer.take()
    };
    if let Some(mut observer) = observer {
      observer.error(err);
    }
    self.handle.unsubscribe();
  }
}

/// Upstream side of [`OnBackpressure`].
pub struct BackpressureObserver<Item, Err, O, F>(Arc<Shared<Item, Err, O, F>>);

impl<Item, Err, O, F> Observer<Item, Err> for BackpressureObserver<Item, Err, O, F>
where
  O: FlowObserver<Item, Err>,
  F: FnMut(Item),
{
  fn next(&mut self, value: Item) {
    let shared = &self.0;
    if shared.handle.is_closed() {
      return;
    }
    match shared.mode {
      Mode::Buffer { capacity, overflow } => {
        let overflowed = {
          let mut state = shared.state.lock();
          let outstanding = usize::try_from(shared.demand.get()).unwrap_or(usize::MAX);
          if state.queue.len() >= capacity.saturating_add(outstanding) {
            true
          } else {
            state.queue.push_back(value);
            false
          }
        };
        if overflowed {
          warn!(capacity, "backpressure buffer overflow");
          shared.terminate_with(overflow(RxError::BufferOverflow { capacity }));
        } else {
          shared.drain();
        }
      }
      Mode::Drop => {
        let mut state = shared.state.lock();
        if shared.demand.try_take() {
          if let Some(observer) = state.observer.as_mut() {
            observer.next(value);
          }
        } else {
          trace!("item beyond demand dropped");
          if let Some(on_drop) = state.on_drop.as_mut() {
            on_drop(value);
          }
        }
      }
    }
  }

  fn error(&mut self, err: Err) { self.0.terminate_with(err) }

  fn complete(&mut self) {
    let shared = &self.0;
    match shared.mode {
      Mode::Buffer { .. } => {
        shared.state.lock().upstream_done = true;
        shared.drain();
      }
      Mode::Drop => {
        let observer = shared.state.lock().observer.take();
        if let Some(mut observer) = observer {
          observer.complete();
        }
        shared.handle.unsubscribe();
      }
    }
  }

  fn is_closed(&self) -> bool { self.0.handle.is_closed() }
}
