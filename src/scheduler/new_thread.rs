use std::{
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  },
  thread,
  time::Duration,
};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error};

use crate::{
  scheduler::{
    instant_at,
    parker::{self, Parker},
    real_now,
    timed_queue::TimedQueue,
    Scheduler, Worker,
  },
  subscription::{Subscription, SubscriptionHandle},
};

/// Gives every worker its own OS thread.
///
/// Actions submitted to one worker run on that worker's thread in due-time
/// order, ties in submission order. Cancelling the worker stops the thread
/// and wakes an action blocked in [`Worker::sleep`].
#[derive(Debug, Clone)]
pub struct NewThreadScheduler {
  name_prefix: Arc<str>,
  spawned: Arc<AtomicUsize>,
}

impl Default for NewThreadScheduler {
  fn default() -> Self { Self::with_name_prefix("rx-worker") }
}

impl NewThreadScheduler {
  /// Worker threads are named `{prefix}-{n}`.
  pub fn with_name_prefix(prefix: impl Into<Arc<str>>) -> Self {
    Self { name_prefix: prefix.into(), spawned: Arc::new(AtomicUsize::new(0)) }
  }
}

impl Scheduler for NewThreadScheduler {
  type Worker = NewThreadWorker;

  fn create_worker(&self) -> Self::Worker {
    let n = self.spawned.fetch_add(1, Ordering::Relaxed);
    let name = format!("{}-{n}", self.name_prefix);
    let (tx, rx) = unbounded();
    let token = SubscriptionHandle::new();
    let stop = Parker::default();

    let c_stop = stop.clone();
    let c_name = name.clone();
    let spawned =
      thread::Builder::new().name(name.clone()).spawn(move || run_worker(rx, c_stop, c_name));
    if let Err(err) = spawned {
      error!(worker = %name, %err, "failed to spawn worker thread");
      token.unsubscribe();
    }

    // The thread only holds the receiver: once every worker handle is gone
    // the channel disconnects and the thread exits after its queue drains.
    let c_tx = tx.clone();
    token.add_teardown(move || {
      stop.cancel();
      let _ = c_tx.send(Command::Shutdown);
    });
    NewThreadWorker { tx, token }
  }

  fn now(&self) -> Duration { real_now() }
}

enum Command {
  Run { due: Duration, job: Job },
  Shutdown,
}

struct Job {
  task: Box<dyn FnOnce() + Send>,
  handle: SubscriptionHandle,
}

impl Job {
  fn run(self) {
    if !self.handle.is_closed() {
      (self.task)();
      self.handle.unsubscribe();
    }
  }
}

fn run_worker(rx: Receiver<Command>, stop: Parker, name: String) {
  debug!(worker = %name, "worker started");
  let mut queue = TimedQueue::default();
  let mut connected = true;
  while !stop.is_cancelled() {
    if let Some((_, job)) = queue.pop_due(real_now()) {
      Job::run(job);
      continue;
    }
    let next_due = queue.next_due();
    if !connected {
      match next_due {
        Some(due) => {
          stop.park_until(instant_at(due));
          continue;
        }
        None => break,
      }
    }
    let received = match next_due {
      Some(due) => rx.recv_deadline(instant_at(due)),
      None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
    };
    match received {
      Ok(Command::Run { due, job }) => queue.push(due, job),
      Ok(Command::Shutdown) => break,
      Err(RecvTimeoutError::Timeout) => {}
      Err(RecvTimeoutError::Disconnected) => connected = false,
    }
  }
  // Whatever never ran is cancelled, so its handle reports closed.
  let dropped = queue.len();
  while let Some((_, job)) = queue.pop() {
    job.handle.unsubscribe();
  }
  for command in rx.try_iter() {
    if let Command::Run { job, .. } = command {
      job.handle.unsubscribe();
    }
  }
  debug!(worker = %name, dropped, "worker stopped");
}

#[derive(Clone)]
pub struct NewThreadWorker {
  tx: Sender<Command>,
  token: SubscriptionHandle,
}

impl Subscription for NewThreadWorker {
  fn unsubscribe(&self) { self.token.unsubscribe() }

  fn is_closed(&self) -> bool { self.token.is_closed() }
}

impl Worker for NewThreadWorker {
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
    if self.tx.send(Command::Run { due: real_now().saturating_add(delay), job }).is_err() {
      handle.unsubscribe();
    }
    handle
  }

  fn sleep(&self, duration: Duration) -> bool { parker::sleep_for(&[&self.token], duration) }
}

impl std::fmt::Debug for NewThreadWorker {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("NewThreadWorker").field("is_closed", &self.is_closed()).finish()
  }
}
