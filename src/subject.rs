//! Subjects: observers that re-broadcast to their own subscribers.
//!
//! A subject is [`Active`](Subject::is_terminated) until its first `error` or
//! `complete`, and terminated afterwards, remembering the terminal event for
//! later subscribers. The [`RetentionPolicy`] decides what else it remembers:
//!
//! | alias              | policy             | new subscriber receives                    |
//! |--------------------|--------------------|--------------------------------------------|
//! | [`PublishSubject`] | [`Publish`]        | live items only                            |
//! | [`BehaviorSubject`]| [`Latest`]         | the latest item while active               |
//! | [`AsyncSubject`]   | [`LastOnComplete`] | the last item, once completed              |
//! | [`ReplaySubject`]  | [`ReplayBuffer`]   | every retained item, then live items       |
//!
//! Subscribers are held in id-keyed slots. An emission snapshots the slots
//! and delivers with the subject unlocked, so subscribing and unsubscribing
//! from inside a callback is fine; a subscriber added that way does not
//! receive the emission in progress.
//!
//! Emissions are not re-entrant: calling `next`/`error`/`complete` on a
//! subject from inside one of its own subscribers' callbacks panics.

use std::{fmt, sync::Arc};

use parking_lot::Mutex;

use crate::{
  fallback::{self, ErrorSink},
  observable::{Observable, ObservableExt},
  observer::{BoxedObserver, Observer},
};

mod policy;
mod replay;
mod subject_subscription;
mod subscribers;

pub use policy::*;
pub use replay::*;
pub use subject_subscription::SubjectSubscription;
use subscribers::{broadcast_complete, broadcast_error, broadcast_value, with_observer, Subscribers};

pub type PublishSubject<Item, Err> = Subject<Item, Err, Publish>;
pub type BehaviorSubject<Item, Err> = Subject<Item, Err, Latest<Item>>;
pub type AsyncSubject<Item, Err> = Subject<Item, Err, LastOnComplete<Item>>;
pub type ReplaySubject<Item, Err> = Subject<Item, Err, ReplayBuffer<Item>>;

#[derive(Clone)]
pub(crate) enum Terminal<Err> {
  Completed,
  Errored(Err),
}

pub(crate) struct SubjectState<Item, Err, P> {
  pub(crate) observers: Subscribers<Item, Err>,
  pub(crate) terminal: Option<Terminal<Err>>,
  policy: P,
}

/// A multicast point: an observer for upstream and an observable for any
/// number of subscribers. Clones share the same state.
pub struct Subject<Item, Err, P> {
  state: Arc<Mutex<SubjectState<Item, Err, P>>>,
  sink: ErrorSink,
}

impl<Item, Err, P> Clone for Subject<Item, Err, P> {
  fn clone(&self) -> Self { Self { state: self.state.clone(), sink: self.sink.clone() } }
}

impl<Item, Err, P> Subject<Item, Err, P> {
  /// A subject with a custom retention policy.
  ///
  /// Errors that arrive after termination go to the fallback sink in effect
  /// now.
  pub fn with_policy(policy: P) -> Self {
    Self::with_policy_and_sink(policy, fallback::current())
  }

  /// A subject reporting errors that arrive after termination to `sink`.
  pub fn with_policy_and_sink(policy: P, sink: ErrorSink) -> Self {
    let state = SubjectState { observers: Subscribers::default(), terminal: None, policy };
    Self { state: Arc::new(Mutex::new(state)), sink }
  }

  pub fn subscriber_count(&self) -> usize { self.state.lock().observers.len() }

  pub fn is_terminated(&self) -> bool { self.state.lock().terminal.is_some() }
}

impl<Item, Err, P> Subject<Item, Err, P>
where
  Item: Clone,
  Err: Clone + Send + 'static,
  P: RetentionPolicy<Item>,
{
  pub fn next(&self, value: Item) {
    let slots = {
      let mut state = self.state.lock();
      if state.terminal.is_some() {
        tracing::trace!("item after termination swallowed");
        return;
      }
      if !state.policy.record(&value) {
        return;
      }
      state.observers.snapshot()
    };
    broadcast_value(slots, value);
  }

  pub fn error(&self, err: Err) {
    let slots = {
      let mut state = self.state.lock();
      if state.terminal.is_some() {
        drop(state);
        self.sink.report_error(err);
        return;
      }
      state.terminal = Some(Terminal::Errored(err.clone()));
      state.observers.take_all()
    };
    broadcast_error(slots, err);
  }

  pub fn complete(&self) {
    let (slots, last) = {
      let mut state = self.state.lock();
      if state.terminal.is_some() {
        tracing::trace!("completion after termination swallowed");
        return;
      }
      state.terminal = Some(Terminal::Completed);
      let last = state.policy.on_complete();
      (state.observers.take_all(), last)
    };
    broadcast_complete(slots, last);
  }
}

impl<Item, Err> PublishSubject<Item, Err> {
  pub fn new() -> Self { Self::with_policy(Publish) }
}

impl<Item, Err> Default for PublishSubject<Item, Err> {
  fn default() -> Self { Self::new() }
}

impl<Item: Clone, Err> BehaviorSubject<Item, Err> {
  /// A behavior subject seeded with `value`.
  pub fn new(value: Item) -> Self { Self::with_policy(Latest(Some(value))) }

  /// A behavior subject without a seed value.
  pub fn empty() -> Self { Self::with_policy(Latest(None)) }

  /// The latest item, if any.
  pub fn value(&self) -> Option<Item> { self.state.lock().policy.value().cloned() }
}

impl<Item: Clone, Err> AsyncSubject<Item, Err> {
  pub fn new() -> Self { Self::with_policy(LastOnComplete(None)) }

  /// The last item received so far, if any.
  pub fn value(&self) -> Option<Item> { self.state.lock().policy.value().cloned() }
}

impl<Item: Clone, Err> Default for AsyncSubject<Item, Err> {
  fn default() -> Self { Self::new() }
}

impl<Item: Clone, Err> ReplaySubject<Item, Err> {
  pub fn new(config: ReplayConfig) -> Self { Self::with_policy(ReplayBuffer::new(config)) }

  /// The items a new subscriber would receive right now.
  pub fn values(&self) -> Vec<Item> { self.state.lock().policy.snapshot() }
}

impl<Item, Err, P, O> Observable<Item, Err, O> for Subject<Item, Err, P>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
  P: RetentionPolicy<Item>,
{
  type Unsub = SubjectSubscription<Item, Err, P>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub { self.subscribe_boxed(Box::new(observer)) }
}

impl<Item, Err, P> ObservableExt<Item, Err> for Subject<Item, Err, P> {}

impl<Item, Err, P> Subject<Item, Err, P>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
  P: RetentionPolicy<Item>,
{
  fn subscribe_boxed(
    &self, mut observer: BoxedObserver<Item, Err>,
  ) -> SubjectSubscription<Item, Err, P> {
    let mut state = self.state.lock();
    if let Some(terminal) = state.terminal.clone() {
      let completed = matches!(terminal, Terminal::Completed);
      let replay = state.policy.replay_terminated(completed);
      drop(state);
      for value in replay {
        observer.next(value);
      }
      match terminal {
        Terminal::Completed => observer.complete(),
        Terminal::Errored(err) => observer.error(err),
      }
      return SubjectSubscription::finished(self.state.clone());
    }

    let replay = state.policy.replay_active();
    let (id, slot) = state.observers.add(observer);
    // The slot stays locked until the replay is delivered, so no live item
    // can overtake it.
    let guard = slot.lock();
    drop(state);
    if !replay.is_empty() {
      with_observer(&slot, |o| {
        for value in replay {
          o.next(value);
        }
      });
    }
    drop(guard);
    SubjectSubscription::new(self.state.clone(), id)
  }
}

/// A subject can itself subscribe to an observable.
impl<Item, Err, P> Observer<Item, Err> for Subject<Item, Err, P>
where
  Item: Clone,
  Err: Clone + Send + 'static,
  P: RetentionPolicy<Item>,
{
  fn next(&mut self, value: Item) { Subject::next(self, value) }

  fn error(&mut self, err: Err) { Subject::error(self, err) }

  fn complete(&mut self) { Subject::complete(self) }

  fn is_closed(&self) -> bool { self.is_terminated() }
}

impl<Item, Err, P> fmt::Debug for Subject<Item, Err, P> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.state.lock();
    f.debug_struct("Subject")
      .field("subscribers", &state.observers.len())
      .field("terminated", &state.terminal.is_some())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use parking_lot::Mutex;

  use super::*;
  use crate::{fallback::ErrorSink, prelude::*};

  type Log = Arc<Mutex<Vec<String>>>;

  fn record<P>(subject: &Subject<i32, &'static str, P>, log: &Log) -> SubscriptionHandle
  where
    P: RetentionPolicy<i32>,
  {
    let (n, e, c) = (log.clone(), log.clone(), log.clone());
    subject.clone().subscribe_all(
      move |v| n.lock().push(format!("next {v}")),
      move |err| e.lock().push(format!("error {err}")),
      move || c.lock().push("complete".to_owned()),
    )
  }

  fn log() -> Log { Arc::new(Mutex::new(vec![])) }

  #[test]
  fn publish_only_live_items() {
    let subject = PublishSubject::new();
    let early = log();
    record(&subject, &early);
    subject.next(1);
    let late = log();
    record(&subject, &late);
    subject.next(2);
    subject.complete();

    assert_eq!(*early.lock(), vec!["next 1", "next 2", "complete"]);
    assert_eq!(*late.lock(), vec!["next 2", "complete"]);
  }

  #[test]
  fn publish_after_termination_gets_terminal_only() {
    let subject = PublishSubject::new();
    subject.next(1);
    subject.error("boom");
    let late = log();
    let handle = record(&subject, &late);
    assert_eq!(*late.lock(), vec!["error boom"]);
    assert!(handle.is_closed());
  }

  #[test]
  fn behavior_replays_latest_while_active() {
    let subject = BehaviorSubject::empty();
    subject.next(0);
    subject.next(1);
    subject.next(2);
    let seen = log();
    record(&subject, &seen);
    subject.next(3);
    assert_eq!(*seen.lock(), vec!["next 2", "next 3"]);
    assert_eq!(subject.value(), Some(3));
  }

  #[test]
  fn behavior_seed_then_nothing_after_termination() {
    let subject = BehaviorSubject::new(10);
    let first = log();
    record(&subject, &first);
    subject.complete();
    let late = log();
    record(&subject, &late);

    assert_eq!(*first.lock(), vec!["next 10", "complete"]);
    assert_eq!(*late.lock(), vec!["complete"]);
  }

  #[test]
  fn async_delivers_last_on_completion() {
    let subject = AsyncSubject::new();
    let early = log();
    record(&subject, &early);
    subject.next(1);
    subject.next(2);
    assert!(early.lock().is_empty());
    assert_eq!(subject.value(), Some(2));

    subject.complete();
    let late = log();
    record(&subject, &late);
    assert_eq!(*early.lock(), vec!["next 2", "complete"]);
    assert_eq!(*late.lock(), vec!["next 2", "complete"]);
  }

  #[test]
  fn async_error_delivers_no_item() {
    let subject = AsyncSubject::new();
    let early = log();
    record(&subject, &early);
    subject.next(1);
    subject.error("failed");
    let late = log();
    record(&subject, &late);
    assert_eq!(*early.lock(), vec!["error failed"]);
    assert_eq!(*late.lock(), vec!["error failed"]);
  }

  #[test]
  fn replay_capacity_then_live() {
    let subject = ReplaySubject::new(ReplayConfig::unbounded().with_capacity(2));
    for i in 0..3 {
      subject.next(i);
    }
    let seen = log();
    record(&subject, &seen);
    subject.next(3);
    assert_eq!(*seen.lock(), vec!["next 1", "next 2", "next 3"]);
    assert_eq!(subject.values(), vec![2, 3]);
  }

  #[test]
  fn replay_after_completion() {
    let subject = ReplaySubject::new(ReplayConfig::unbounded());
    subject.next(1);
    subject.next(2);
    subject.complete();
    let seen = log();
    record(&subject, &seen);
    assert_eq!(*seen.lock(), vec!["next 1", "next 2", "complete"]);
  }

  #[test]
  fn unsubscribe_affects_only_that_subscriber() {
    let subject = PublishSubject::new();
    let (a, b) = (log(), log());
    let handle_a = record(&subject, &a);
    record(&subject, &b);
    subject.next(1);
    handle_a.unsubscribe();
    subject.next(2);

    assert_eq!(*a.lock(), vec!["next 1"]);
    assert_eq!(*b.lock(), vec!["next 1", "next 2"]);
    assert_eq!(subject.subscriber_count(), 1);
  }

  #[test]
  fn subscribe_inside_callback_misses_current_item() {
    let subject = PublishSubject::<i32, ()>::new();
    let inner = Arc::new(Mutex::new(vec![]));
    let (c_subject, c_inner) = (subject.clone(), inner.clone());
    let mut subscribed = false;
    subject.clone().subscribe(move |_| {
      if !subscribed {
        subscribed = true;
        let c_inner = c_inner.clone();
        c_subject.clone().subscribe(move |v| c_inner.lock().push(v));
      }
    });

    subject.next(1);
    subject.next(2);
    assert_eq!(*inner.lock(), vec![2]);
  }

  #[test]
  fn error_after_termination_reaches_sink() {
    let orphans = Arc::new(Mutex::new(vec![]));
    let c_orphans = orphans.clone();
    let sink = ErrorSink::new(move |err| c_orphans.lock().push(err.message()));
    let subject = fallback::with_sink(sink, PublishSubject::<i32, &str>::new);

    subject.complete();
    subject.next(1);
    subject.error("late");
    assert_eq!(*orphans.lock(), vec!["late"]);
  }

  #[test]
  #[should_panic(expected = "re-entrant Subject emissions are not supported")]
  fn reentrant_emission_panics() {
    let subject = PublishSubject::<i32, ()>::new();
    let c_subject = subject.clone();
    subject.clone().subscribe(move |v| c_subject.next(v + 1));
    subject.next(0);
  }
}
