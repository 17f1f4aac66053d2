use std::sync::atomic::{AtomicU64, Ordering};

/// Demand value that disables accounting.
pub const UNBOUNDED: u64 = u64::MAX;

/// Outstanding demand of one subscription.
///
/// Requests add up and saturate at [`UNBOUNDED`]; once unbounded, taking
/// never decrements.
#[derive(Debug, Default)]
pub struct DemandCounter(AtomicU64);

impl DemandCounter {
  pub fn new() -> Self { Self::default() }

  /// Add `n`, returning the new demand.
  pub fn add(&self, n: u64) -> u64 {
    let previous = self
      .0
      .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
        Some(current.saturating_add(n))
      })
      .unwrap_or(UNBOUNDED);
    previous.saturating_add(n)
  }

  /// Take one unit of demand. Returns `false` when there is none.
  pub fn try_take(&self) -> bool {
    self
      .0
      .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| match current {
        0 => None,
        UNBOUNDED => Some(UNBOUNDED),
        n => Some(n - 1),
      })
      .is_ok()
  }

  pub fn get(&self) -> u64 { self.0.load(Ordering::Acquire) }

  pub fn is_unbounded(&self) -> bool { self.get() == UNBOUNDED }
}
