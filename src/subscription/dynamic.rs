use smallvec::SmallVec;

/// Items in insertion order, each under an id that is never handed out twice.
///
/// Holds the subscriber slots of a subject: a subscriber keeps its id and
/// can leave while emissions iterate over a snapshot.
pub(crate) struct IdSlots<U> {
  next_id: usize,
  items: SmallVec<[(usize, U); 2]>,
}

impl<U> Default for IdSlots<U> {
  fn default() -> Self { Self { next_id: 0, items: SmallVec::new() } }
}

impl<U> IdSlots<U> {
  pub fn add(&mut self, item: U) -> usize {
    let id = self.next_id;
    self.next_id += 1;
    self.items.push((id, item));
    id
  }

  pub fn remove(&mut self, id: usize) -> Option<U> {
    let pos = self.items.iter().position(|(i, _)| *i == id)?;
    Some(self.items.remove(pos).1)
  }

  pub fn contains(&self, id: usize) -> bool { self.items.iter().any(|(i, _)| *i == id) }

  pub fn len(&self) -> usize { self.items.len() }

  pub fn drain(&mut self) -> impl Iterator<Item = U> + '_ {
    self.items.drain(..).map(|(_, item)| item)
  }

  pub fn iter(&self) -> impl Iterator<Item = &U> { self.items.iter().map(|(_, item)| item) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ids_are_never_reused() {
    let mut slots = IdSlots::default();
    let a = slots.add(1);
    assert_eq!(slots.remove(a), Some(1));
    let b = slots.add(2);
    assert_ne!(a, b);
    assert!(!slots.contains(a));
    assert_eq!(slots.remove(a), None);
  }

  #[test]
  fn removal_keeps_the_order_of_the_rest() {
    let mut slots = IdSlots::default();
    let ids: Vec<_> = ["a", "b", "c"].into_iter().map(|v| slots.add(v)).collect();
    slots.remove(ids[1]);
    assert_eq!(slots.iter().copied().collect::<Vec<_>>(), vec!["a", "c"]);
    assert_eq!(slots.drain().count(), 2);
    assert_eq!(slots.len(), 0);
  }
}
