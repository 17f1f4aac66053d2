use std::{
  collections::VecDeque,
  pin::Pin,
  sync::Arc,
  task::{Context, Poll},
};

use futures::{task::AtomicWaker, Stream};
use parking_lot::Mutex;

use crate::{
  flowable::{FlowObserver, FlowSubscription, Flowable},
  observer::Observer,
  subscription::{Subscription, SubscriptionHandle},
};

/// A flowable consumed as a `futures::Stream`.
///
/// Each poll that finds nothing buffered requests one item, so the producer
/// never runs ahead of the consumer. An error is yielded as `Err` and ends
/// the stream. Dropping the stream cancels the subscription.
///
/// ```
/// use futures::{executor::block_on, StreamExt};
/// use rxcore::prelude::*;
///
/// let items: Vec<_> = block_on(flowable::from_iter(1..=3).into_stream().collect());
/// assert_eq!(items, vec![Ok(1), Ok(2), Ok(3)]);
/// ```
pub struct FlowStream<Item, Err> {
  shared: Arc<StreamShared<Item, Err>>,
  handle: SubscriptionHandle,
}

struct StreamShared<Item, Err> {
  waker: AtomicWaker,
  state: Mutex<StreamState<Item, Err>>,
}

struct StreamState<Item, Err> {
  ready: VecDeque<Result<Item, Err>>,
  done: bool,
  requested: bool,
  subscription: Option<FlowSubscription>,
}

impl<Item, Err> FlowStream<Item, Err> {
  pub(crate) fn new<F>(flowable: F) -> Self
  where
    F: Flowable<Item, Err, StreamObserver<Item, Err>>,
  {
    let shared = Arc::new(StreamShared {
      waker: AtomicWaker::new(),
      state: Mutex::new(StreamState {
        ready: VecDeque::new(),
        done: false,
        requested: false,
        subscription: None,
      }),
    });
    let handle = flowable.actual_subscribe(StreamObserver(shared.clone()));
    Self { shared, handle }
  }
}

impl<Item, Err> Stream for FlowStream<Item, Err> {
  type Item = Result<Item, Err>;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    self.shared.waker.register(cx.waker());
    let request = {
      let mut state = self.shared.state.lock();
      if let Some(item) = state.ready.pop_front() {
        return Poll::Ready(Some(item));
      }
      if state.done {
        return Poll::Ready(None);
      }
      if state.requested {
        None
      } else {
        state.requested = true;
        state.subscription.clone()
      }
    };
    // The request may deliver synchronously, so it runs without the lock.
    if let Some(subscription) = request {
      subscription.request(1);
      let mut state = self.shared.state.lock();
      if let Some(item) = state.ready.pop_front() {
        return Poll::Ready(Some(item));
      }
      if state.done {
        return Poll::Ready(None);
      }
    }
    Poll::Pending
  }
}

impl<Item, Err> Drop for FlowStream<Item, Err> {
  fn drop(&mut self) { self.handle.unsubscribe() }
}

/// Feeds a [`FlowStream`].
pub struct StreamObserver<Item, Err>(Arc<StreamShared<Item, Err>>);

impl<Item, Err> Observer<Item, Err> for StreamObserver<Item, Err> {
  fn next(&mut self, value: Item) {
    {
      let mut state = self.0.state.lock();
      state.ready.push_back(Ok(value));
      state.requested = false;
    }
    self.0.waker.wake();
  }

  fn error(&mut self, err: Err) {
    {
      let mut state = self.0.state.lock();
      state.ready.push_back(Err(err));
      state.done = true;
    }
    self.0.waker.wake();
  }

  fn complete(&mut self) {
    self.0.state.lock().done = true;
    self.0.waker.wake();
  }

  fn is_closed(&self) -> bool { self.0.state.lock().done }
}

impl<Item, Err> FlowObserver<Item, Err> for StreamObserver<Item, Err> {
  fn on_subscribe(&mut self, subscription: FlowSubscription) {
    self.0.state.lock().subscription = Some(subscription);
  }
}

#[cfg(test)]
mod tests {
  use std::{thread, time::Duration};

  use futures::{executor::block_on, StreamExt};

  use crate::prelude::*;

  #[test]
  fn stream_pulls_one_at_a_time() {
    let produced = std::sync::Arc::new(parking_lot::Mutex::new(0));
    let c_produced = produced.clone();
    let source = flowable::generate(0, move |n: &mut i32| {
      *c_produced.lock() += 1;
      *n += 1;
      Generated::<_, ()>::Next(*n)
    });

    let mut stream = source.into_stream();
    block_on(async {
      assert_eq!(stream.next().await, Some(Ok(1)));
      assert_eq!(stream.next().await, Some(Ok(2)));
    });
    assert_eq!(*produced.lock(), 2);
  }

  #[test]
  fn error_ends_the_stream() {
    let source = flowable::generate(0, |n: &mut i32| {
      *n += 1;
      if *n < 3 {
        Generated::Next(*n)
      } else {
        Generated::Error("stop")
      }
    });
    let items: Vec<_> = block_on(source.into_stream().collect());
    assert_eq!(items, vec![Ok(1), Ok(2), Err("stop")]);
  }

  #[test]
  fn wakes_when_an_item_arrives_later() {
    let subject = PublishSubject::<i32, RxError>::new();
    let mut stream = subject.clone().on_backpressure_buffer(4).into_stream();
    let producer = thread::spawn(move || {
      thread::sleep(Duration::from_millis(20));
      subject.next(7);
      subject.complete();
    });
    let items: Vec<_> = block_on(async {
      let mut items = vec![];
      while let Some(item) = stream.next().await {
        items.push(item);
      }
      items
    });
    producer.join().unwrap();
    assert_eq!(items, vec![Ok(7)]);
  }
}
