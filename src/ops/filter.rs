use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
};

#[derive(Clone)]
pub struct FilterOp<S, F> {
  source: S,
  filter: F,
}

impl<S, F> FilterOp<S, F> {
  pub(crate) fn new(source: S, filter: F) -> Self { Self { source, filter } }
}

impl<Item, Err, O, S, F> Observable<Item, Err, O> for FilterOp<S, F>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, FilterObserver<O, F>>,
  F: FnMut(&Item) -> bool,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.source.actual_subscribe(FilterObserver { observer, filter: self.filter })
  }
}

impl<Item, Err, S, F> ObservableExt<Item, Err> for FilterOp<S, F>
where
  S: ObservableExt<Item, Err>,
  F: FnMut(&Item) -> bool,
{
}

pub struct FilterObserver<O, F> {
  observer: O,
  filter: F,
}

impl<Item, Err, O, F> Observer<Item, Err> for FilterObserver<O, F>
where
  O: Observer<Item, Err>,
  F: FnMut(&Item) -> bool,
{
  fn next(&mut self, value: Item) {
    if (self.filter)(&value) {
      self.observer.next(value)
    }
  }

  fn error(&mut self, err: Err) { self.observer.error(err) }

  fn complete(&mut self) { self.observer.complete() }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[test]
  fn fork_and_shared() {
    let mut evens = vec![];
    let source = observable::from_iter(0..10).filter(|v| v % 2 == 0);
    source.clone().subscribe(|v| evens.push(v));
    assert_eq!(evens, vec![0, 2, 4, 6, 8]);

    let mut count = 0;
    source.subscribe(|_| count += 1);
    assert_eq!(count, 5);
  }
}
