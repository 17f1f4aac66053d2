use std::marker::PhantomData;

use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
};

pub struct MapErrOp<S, F, Err> {
  source: S,
  func: F,
  _p: PhantomData<fn(Err)>,
}

impl<S, F, Err> MapErrOp<S, F, Err> {
  pub(crate) fn new(source: S, func: F) -> Self { Self { source, func, _p: PhantomData } }
}

impl<S: Clone, F: Clone, Err> Clone for MapErrOp<S, F, Err> {
  fn clone(&self) -> Self { Self::new(self.source.clone(), self.func.clone()) }
}

impl<Item, Err, E, O, S, F> Observable<Item, E, O> for MapErrOp<S, F, Err>
where
  O: Observer<Item, E>,
  S: Observable<Item, Err, MapErrObserver<O, F>>,
  F: FnOnce(Err) -> E,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.source.actual_subscribe(MapErrObserver { observer, func: Some(self.func) })
  }
}

impl<Item, Err, E, S, F> ObservableExt<Item, E> for MapErrOp<S, F, Err>
where
  S: ObservableExt<Item, Err>,
  F: FnOnce(Err) -> E,
{
}

pub struct MapErrObserver<O, F> {
  observer: O,
  func: Option<F>,
}

impl<Item, Err, E, O, F> Observer<Item, Err> for MapErrObserver<O, F>
where
  O: Observer<Item, E>,
  F: FnOnce(Err) -> E,
{
  fn next(&mut self, value: Item) { self.observer.next(value) }

  fn error(&mut self, err: Err) {
    if let Some(func) = self.func.take() {
      self.observer.error(func(err));
    }
  }

  fn complete(&mut self) { self.observer.complete() }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}
