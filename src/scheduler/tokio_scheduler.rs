use std::time::Duration;

use tokio::{
  runtime::Handle,
  sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
  time::{timeout_at, Instant},
};
use tracing::debug;

use crate::{
  scheduler::{instant_at, parker, real_now, timed_queue::TimedQueue, Scheduler, Worker},
  subscription::{Subscription, SubscriptionHandle},
};

/// Runs workers as tasks on a tokio runtime.
///
/// Each worker is one task draining its own queue, so actions of one worker
/// never overlap. Actions run inline on the runtime and should not block for
/// long.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
  handle: Handle,
}

impl TokioScheduler {
  pub fn new(handle: Handle) -> Self { Self { handle } }

  /// The runtime the caller is running on, if any.
  pub fn try_current() -> Option<Self> { Handle::try_current().ok().map(Self::new) }
}

impl Scheduler for TokioScheduler {
  type Worker = TokioWorker;

  fn create_worker(&self) -> Self::Worker {
    let (tx, rx) = unbounded_channel();
    let token = SubscriptionHandle::new();
    let task = self.handle.spawn(run_worker(rx));
    token.add_teardown(move || task.abort());
    TokioWorker { tx, token }
  }

  fn now(&self) -> Duration { real_now() }
}

struct Job {
  task: Box<dyn FnOnce() + Send>,
  handle: SubscriptionHandle,
}

async fn run_worker(mut rx: UnboundedReceiver<(Duration, Job)>) {
  let mut queue = TimedQueue::default();
  loop {
    while let Some((_, job)) = queue.pop_due(real_now()) {
      let Job { task, handle } = job;
      if !handle.is_closed() {
        task();
        handle.unsubscribe();
      }
    }
    let received = match queue.next_due() {
      Some(due) => match timeout_at(Instant::from_std(instant_at(due)), rx.recv()).await {
        Ok(received) => received,
        Err(_) => continue,
      },
      None => rx.recv().await,
    };
    match received {
      Some((due, job)) => queue.push(due, job),
      None if queue.is_empty() => break,
      None => {
        if let Some(due) = queue.next_due() {
          tokio::time::sleep_until(Instant::from_std(instant_at(due))).await;
        }
      }
    }
  }
  debug!("tokio worker stopped");
}

#[derive(Clone)]
pub struct TokioWorker {
  tx: UnboundedSender<(Duration, Job)>,
  token: SubscriptionHandle,
}

impl Subscription for TokioWorker {
  fn unsubscribe(&self) { self.token.unsubscribe() }

  fn is_closed(&self) -> bool { self.token.is_closed() }
}

impl Worker for TokioWorker {
  fn now(&self) -> Duration { real_now() }

  fn schedule_delayed<F>(&self, task: F, delay: Duration) -> SubscriptionHandle
  where
    F: FnOnce() + Send + 'static,
  {
    if self.is_closed() {
      return SubscriptionHandle::closed();
    }
    let handle = SubscriptionHandle::new();
    let job = Job { task: Box::new(task), handle: handle.clone() };
    if self.tx.send((real_now().saturating_add(delay), job)).is_err() {
      handle.unsubscribe();
    }
    handle
  }

  fn sleep(&self, duration: Duration) -> bool { parker::sleep_for(&[&self.token], duration) }
}

impl std::fmt::Debug for TokioWorker {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TokioWorker").field("is_closed", &self.is_closed()).finish()
  }
}
