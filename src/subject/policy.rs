//! What a subject remembers, and what it hands to new subscribers.

/// Retention policy of a [`Subject`](crate::subject::Subject).
pub trait RetentionPolicy<Item>: Send + 'static {
  /// Record an item from upstream. Returns whether subscribers receive it
  /// now.
  fn record(&mut self, item: &Item) -> bool;

  /// Items handed to a subscriber joining an active subject.
  fn replay_active(&mut self) -> Vec<Item>;

  /// Items handed to a subscriber joining a terminated subject, before the
  /// terminal event. `completed` is false when the subject failed.
  fn replay_terminated(&mut self, completed: bool) -> Vec<Item>;

  /// Item delivered to every subscriber right before completion.
  fn on_complete(&mut self) -> Option<Item> { None }
}

/// No history.
#[derive(Debug, Default, Clone, Copy)]
pub struct Publish;

impl<Item> RetentionPolicy<Item> for Publish {
  fn record(&mut self, _: &Item) -> bool { true }

  fn replay_active(&mut self) -> Vec<Item> { vec![] }

  fn replay_terminated(&mut self, _: bool) -> Vec<Item> { vec![] }
}

/// Keeps the latest item and hands it to subscribers while active.
#[derive(Debug, Clone)]
pub struct Latest<Item>(pub(crate) Option<Item>);

impl<Item> Latest<Item> {
  pub fn value(&self) -> Option<&Item> { self.0.as_ref() }
}

impl<Item: Clone + Send + 'static> RetentionPolicy<Item> for Latest<Item> {
  fn record(&mut self, item: &Item) -> bool {
    self.0 = Some(item.clone());
    true
  }

  fn replay_active(&mut self) -> Vec<Item> { self.0.iter().cloned().collect() }

  fn replay_terminated(&mut self, _: bool) -> Vec<Item> { vec![] }
}

/// Keeps the last item and releases it only on completion.
#[derive(Debug, Clone)]
pub struct LastOnComplete<Item>(pub(crate) Option<Item>);

impl<Item> LastOnComplete<Item> {
  pub fn value(&self) -> Option<&Item> { self.0.as_ref() }
}

impl<Item: Clone + Send + 'static> RetentionPolicy<Item> for LastOnComplete<Item> {
  fn record(&mut self, item: &Item) -> bool {
    self.0 = Some(item.clone());
    false
  }

  fn replay_active(&mut self) -> Vec<Item> { vec![] }

  fn replay_terminated(&mut self, completed: bool) -> Vec<Item> {
    if completed {
      self.0.iter().cloned().collect()
    } else {
      vec![]
    }
  }

  fn on_complete(&mut self) -> Option<Item> { self.0.clone() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn last_on_complete_withholds_items() {
    let mut policy = LastOnComplete(None);
    assert!(!policy.record(&1));
    assert!(!policy.record(&2));
    assert!(policy.replay_active().is_empty());
    assert_eq!(policy.on_complete(), Some(2));
    assert_eq!(policy.replay_terminated(true), vec![2]);
    assert!(policy.replay_terminated(false).is_empty());
  }

  #[test]
  fn latest_forgets_on_termination() {
    let mut policy = Latest(Some(0));
    assert_eq!(policy.replay_active(), vec![0]);
    policy.record(&5);
    assert_eq!(policy.replay_active(), vec![5]);
    assert!(policy.replay_terminated(true).is_empty());
  }
}
