use std::{
  sync::Arc,
  time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

use crate::subscription::{Subscription, SubscriptionHandle};

/// Cancellation flag that a sleeping thread waits on.
///
/// As a [`Subscription`] it can be attached to any handle, which then wakes
/// the sleeper when cancelled.
#[derive(Clone, Default)]
pub(crate) struct Parker(Arc<ParkerInner>);

#[derive(Default)]
struct ParkerInner {
  cancelled: Mutex<bool>,
  wakeup: Condvar,
}

impl Parker {
  pub fn cancel(&self) {
    *self.0.cancelled.lock() = true;
    self.0.wakeup.notify_all();
  }

  pub fn is_cancelled(&self) -> bool { *self.0.cancelled.lock() }

  /// Sleep until `deadline`. Returns `false` if cancelled first.
  pub fn park_until(&self, deadline: Instant) -> bool {
    let mut cancelled = self.0.cancelled.lock();
    loop {
      if *cancelled {
        return false;
      }
      if Instant::now() >= deadline {
        return true;
      }
      self.0.wakeup.wait_until(&mut cancelled, deadline);
    }
  }
}

impl Subscription for Parker {
  fn unsubscribe(&self) { self.cancel() }

  fn is_closed(&self) -> bool { self.is_cancelled() }
}

/// Sleep until `deadline` unless one of `tokens` is cancelled first.
/// Returns `false` when woken by cancellation.
pub(crate) fn sleep_until(tokens: &[&SubscriptionHandle], deadline: Instant) -> bool {
  let parker = Parker::default();
  for token in tokens {
    token.add(parker.clone());
  }
  let slept = parker.park_until(deadline);
  // closes the parker, so the tokens drop it on their next add
  parker.cancel();
  slept
}

/// Like [`sleep_until`] for a relative `duration`.
pub(crate) fn sleep_for(tokens: &[&SubscriptionHandle], duration: Duration) -> bool {
  let deadline = Instant::now().checked_add(duration).unwrap_or_else(far_future);
  sleep_until(tokens, deadline)
}

pub(crate) fn far_future() -> Instant { Instant::now() + Duration::from_secs(60 * 60 * 24 * 365 * 30) }

#[cfg(test)]
mod tests {
  use std::thread;

  use super::*;

  #[test]
  fn cancel_wakes_sleeper() {
    let token = SubscriptionHandle::new();
    let c_token = token.clone();
    let sleeper = thread::spawn(move || sleep_for(&[&c_token], Duration::from_secs(30)));
    thread::sleep(Duration::from_millis(20));
    token.unsubscribe();
    assert!(!sleeper.join().unwrap());
  }

  #[test]
  fn short_sleep_elapses() {
    let token = SubscriptionHandle::new();
    assert!(sleep_for(&[&token], Duration::from_millis(1)));
    assert!(!token.is_closed());
  }

  #[test]
  fn cancelled_token_returns_at_once() {
    let token = SubscriptionHandle::closed();
    assert!(!sleep_for(&[&token], Duration::from_secs(30)));
  }
}
