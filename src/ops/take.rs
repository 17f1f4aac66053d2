use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
};

#[derive(Clone)]
pub struct TakeOp<S> {
  source: S,
  count: usize,
}

impl<S> TakeOp<S> {
  pub(crate) fn new(source: S, count: usize) -> Self { Self { source, count } }
}

impl<Item, Err, O, S> Observable<Item, Err, O> for TakeOp<S>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, TakeObserver<O>>,
{
  type Unsub = Option<S::Unsub>;

  fn actual_subscribe(self, mut observer: O) -> Self::Unsub {
    if self.count == 0 {
      observer.complete();
      return None;
    }
    let observer = TakeObserver { observer: Some(observer), remaining: self.count };
    Some(self.source.actual_subscribe(observer))
  }
}

impl<Item, Err, S> ObservableExt<Item, Err> for TakeOp<S> where S: ObservableExt<Item, Err> {}

pub struct TakeObserver<O> {
  observer: Option<O>,
  remaining: usize,
}

impl<Item, Err, O> Observer<Item, Err> for TakeObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if self.remaining == 0 {
      return;
    }
    self.remaining -= 1;
    self.observer.next(value);
    if self.remaining == 0 {
      self.observer.complete();
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
  fn base_function() {
    let mut completed = false;
    let mut next_count = 0;

    observable::from_iter(0..100).take(5).subscribe_all(
      |_| next_count += 1,
      |_| {},
      || completed = true,
    );

    assert!(completed);
    assert_eq!(next_count, 5);
  }

  #[test]
  fn take_zero_completes_at_once() {
    let mut completed = false;
    let mut next_count = 0;
    observable::from_iter(0..3).take(0).subscribe_all(
      |_| next_count += 1,
      |_| {},
      || completed = true,
    );
    assert!(completed);
    assert_eq!(next_count, 0);
  }

  #[test]
  fn take_more_than_available() {
    let mut seen = vec![];
    observable::from_iter(0..2).take(5).subscribe(|v| seen.push(v));
    assert_eq!(seen, vec![0, 1]);
  }
}
