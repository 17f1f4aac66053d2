use std::{cmp::Ordering, collections::BinaryHeap, time::Duration};

/// Min-heap of values keyed by due time; equal due times pop in insertion
/// order.
pub(crate) struct TimedQueue<T> {
  heap: BinaryHeap<Entry<T>>,
  next_seq: u64,
}

struct Entry<T> {
  due: Duration,
  seq: u64,
  value: T,
}

impl<T> PartialEq for Entry<T> {
  fn eq(&self, other: &Self) -> bool { self.due == other.due && self.seq == other.seq }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl<T> Ord for Entry<T> {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earlier times first, then FIFO by seq
    other.due.cmp(&self.due).then_with(|| other.seq.cmp(&self.seq))
  }
}

impl<T> Default for TimedQueue<T> {
  fn default() -> Self { Self { heap: BinaryHeap::new(), next_seq: 0 } }
}

impl<T> TimedQueue<T> {
  pub fn push(&mut self, due: Duration, value: T) {
    let seq = self.next_seq;
    self.next_seq += 1;
    self.heap.push(Entry { due, seq, value });
  }

  pub fn next_due(&self) -> Option<Duration> { self.heap.peek().map(|e| e.due) }

  pub fn pop(&mut self) -> Option<(Duration, T)> { self.heap.pop().map(|e| (e.due, e.value)) }

  /// Pop the earliest value if it is due at or before `now`.
  pub fn pop_due(&mut self, now: Duration) -> Option<(Duration, T)> {
    if self.next_due()? <= now {
      self.pop()
    } else {
      None
    }
  }

  pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
    self.heap.retain(|e| keep(&e.value))
  }

  pub fn iter(&self) -> impl Iterator<Item = &T> { self.heap.iter().map(|e| &e.value) }

  pub fn len(&self) -> usize { self.heap.len() }
}
