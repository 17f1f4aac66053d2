use std::{collections::VecDeque, fmt, sync::Arc, time::Duration};

use crate::{scheduler::Scheduler, subject::RetentionPolicy};

type Clock = Arc<dyn Fn() -> Duration + Send + Sync>;

/// Bounds of a replay buffer. Both bounds apply when both are set.
///
/// ```
/// use std::time::Duration;
///
/// use rxcore::prelude::*;
///
/// let scheduler = VirtualTimeScheduler::new();
/// let config = ReplayConfig::unbounded()
///   .with_capacity(100)
///   .with_window(Duration::from_secs(1), scheduler);
/// assert_eq!(config.capacity(), Some(100));
/// ```
#[derive(Clone, Default)]
pub struct ReplayConfig {
  capacity: Option<usize>,
  window: Option<(Duration, Clock)>,
}

impl ReplayConfig {
  /// Retain everything.
  pub fn unbounded() -> Self { Self::default() }

  /// Retain at most the last `capacity` items.
  pub fn with_capacity(mut self, capacity: usize) -> Self {
    self.capacity = Some(capacity);
    self
  }

  /// Retain items younger than `window`, measured on `scheduler`'s clock.
  pub fn with_window<Sch: Scheduler>(mut self, window: Duration, scheduler: Sch) -> Self {
    self.window = Some((window, Arc::new(move || scheduler.now())));
    self
  }

  pub fn capacity(&self) -> Option<usize> { self.capacity }

  pub fn window(&self) -> Option<Duration> { self.window.as_ref().map(|(w, _)| *w) }
}

impl fmt::Debug for ReplayConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ReplayConfig")
      .field("capacity", &self.capacity)
      .field("window", &self.window())
      .finish()
  }
}

/// Bounded history of a replay subject.
///
/// Eviction is lazy and happens on every write and every read. An item is
/// visible while its age is strictly below the window; an item whose age
/// equals the window is gone.
pub struct ReplayBuffer<Item> {
  config: ReplayConfig,
  items: VecDeque<(Duration, Item)>,
}

impl<Item> ReplayBuffer<Item> {
  pub fn new(config: ReplayConfig) -> Self { Self { config, items: VecDeque::new() } }

  fn now(&self) -> Duration {
    self.config.window.as_ref().map_or(Duration::ZERO, |(_, clock)| clock())
  }

  fn evict(&mut self) {
    if let Some(capacity) = self.config.capacity {
      while self.items.len() > capacity {
        self.items.pop_front();
      }
    }
    if let Some(window) = self.config.window() {
      let now = self.now();
      while self.items.front().is_some_and(|(at, _)| now.saturating_sub(*at) >= window) {
        self.items.pop_front();
      }
    }
  }

  /// Items currently retained, oldest first.
  pub fn snapshot(&mut self) -> Vec<Item>
  where
    Item: Clone,
  {
    self.evict();
    self.items.iter().map(|(_, item)| item.clone()).collect()
  }

  pub fn len(&mut self) -> usize {
    self.evict();
    self.items.len()
  }

  pub fn is_empty(&mut self) -> bool { self.len() == 0 }
}

impl<Item: Clone + Send + 'static> RetentionPolicy<Item> for ReplayBuffer<Item> {
  fn record(&mut self, item: &Item) -> bool {
    let now = self.now();
    self.items.push_back((now, item.clone()));
    self.evict();
    true
  }

  fn replay_active(&mut self) -> Vec<Item> { self.snapshot() }

  fn replay_terminated(&mut self, _: bool) -> Vec<Item> { self.snapshot() }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::scheduler::VirtualTimeScheduler;

  #[test]
  fn capacity_keeps_newest() {
    let mut buffer = ReplayBuffer::new(ReplayConfig::unbounded().with_capacity(2));
    for i in 0..5 {
      buffer.record(&i);
    }
    assert_eq!(buffer.snapshot(), vec![3, 4]);
  }

  #[test]
  fn window_boundary_is_exclusive() {
    let scheduler = VirtualTimeScheduler::new();
    let config =
      ReplayConfig::unbounded().with_window(Duration::from_millis(100), scheduler.clone());
    let mut buffer = ReplayBuffer::new(config);

    buffer.record(&"a");
    scheduler.advance_time_by(Duration::from_millis(50));
    buffer.record(&"b");

    scheduler.advance_time_by(Duration::from_millis(49));
    assert_eq!(buffer.snapshot(), vec!["a", "b"]);
    scheduler.advance_time_by(Duration::from_millis(1));
    assert_eq!(buffer.snapshot(), vec!["b"]);
    scheduler.advance_time_by(Duration::from_millis(50));
    assert!(buffer.is_empty());
  }

  #[test]
  fn both_bounds_apply() {
    let scheduler = VirtualTimeScheduler::new();
    let config = ReplayConfig::unbounded()
      .with_capacity(2)
      .with_window(Duration::from_millis(100), scheduler.clone());
    let mut buffer = ReplayBuffer::new(config);

    for i in 0..3 {
      buffer.record(&i);
      scheduler.advance_time_by(Duration::from_millis(40));
    }
    // stamped at 0, 40 and 80; capacity already dropped the first one
    assert_eq!(buffer.snapshot(), vec![1, 2]);
    scheduler.advance_time_by(Duration::from_millis(20));
    assert_eq!(buffer.snapshot(), vec![2]);
  }
}
