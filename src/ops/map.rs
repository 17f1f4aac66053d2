use std::marker::PhantomData;

use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
};

pub struct MapOp<S, F, Item> {
  source: S,
  func: F,
  _p: PhantomData<fn(Item)>,
}

impl<S, F, Item> MapOp<S, F, Item> {
  pub(crate) fn new(source: S, func: F) -> Self { Self { source, func, _p: PhantomData } }
}

impl<S: Clone, F: Clone, Item> Clone for MapOp<S, F, Item> {
  fn clone(&self) -> Self { Self::new(self.source.clone(), self.func.clone()) }
}

impl<Item, B, Err, O, S, F> Observable<B, Err, O> for MapOp<S, F, Item>
where
  O: Observer<B, Err>,
  S: Observable<Item, Err, MapObserver<O, F>>,
  F: FnMut(Item) -> B,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.source.actual_subscribe(MapObserver { observer, map: self.func })
  }
}

impl<Item, B, Err, S, F> ObservableExt<B, Err> for MapOp<S, F, Item>
where
  S: ObservableExt<Item, Err>,
  F: FnMut(Item) -> B,
{
}

pub struct MapObserver<O, F> {
  observer: O,
  map: F,
}

impl<Item, Err, O, F, B> Observer<Item, Err> for MapObserver<O, F>
where
  O: Observer<B, Err>,
  F: FnMut(Item) -> B,
{
  fn next(&mut self, value: Item) { self.observer.next((self.map)(value)) }

  fn error(&mut self, err: Err) { self.observer.error(err) }

  fn complete(&mut self) { self.observer.complete() }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}
