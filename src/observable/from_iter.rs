use std::{convert::Infallible, marker::PhantomData};

use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  subscription::SubscriptionHandle,
};

/// Creates an observable that produces values from an iterator.
///
/// Completes when all elements have been emitted. Never emits an error.
/// Emission stops early once the observer is closed, so unbounded iterators
/// are fine when something downstream limits them.
///
/// ```
/// use rxcore::prelude::*;
///
/// let mut sum = 0;
/// observable::from_iter(0..).take(4).subscribe(|v| sum += v);
/// assert_eq!(sum, 6);
/// ```
pub fn from_iter<Iter>(iter: Iter) -> ObservableIter<Iter>
where
  Iter: IntoIterator,
{
  ObservableIter(iter)
}

#[derive(Clone)]
pub struct ObservableIter<Iter>(Iter);

impl<O, Iter> Observable<Iter::Item, Infallible, O> for ObservableIter<Iter>
where
  Iter: IntoIterator,
  O: Observer<Iter::Item, Infallible>,
{
  type Unsub = ();

  fn actual_subscribe(self, mut observer: O) -> Self::Unsub {
    for v in self.0 {
      if observer.is_closed() {
        return;
      }
      observer.next(v);
    }
    observer.complete();
  }
}

impl<Iter> ObservableExt<Iter::Item, Infallible> for ObservableIter<Iter> where
  Iter: IntoIterator
{
}

/// Creates an observable producing a single value, then completing.
pub fn of<Item>(v: Item) -> ObservableIter<std::iter::Once<Item>> { from_iter(std::iter::once(v)) }

/// Creates an observable that completes without emitting.
pub fn empty<Item>() -> ObservableIter<std::iter::Empty<Item>> { from_iter(std::iter::empty()) }

/// Creates an observable that never emits and never terminates.
pub fn never<Item>() -> Never<Item> { Never(PhantomData) }

pub struct Never<Item>(PhantomData<fn() -> Item>);

impl<Item> Clone for Never<Item> {
  fn clone(&self) -> Self { Never(PhantomData) }
}

impl<Item, O> Observable<Item, Infallible, O> for Never<Item>
where
  O: Observer<Item, Infallible>,
{
  type Unsub = SubscriptionHandle;

  fn actual_subscribe(self, _: O) -> Self::Unsub { SubscriptionHandle::new() }
}

impl<Item> ObservableExt<Item, Infallible> for Never<Item> {}

/// Creates an observable that fails with `err` as soon as it is subscribed.
pub fn throw_err<Item, Err>(err: Err) -> ThrowErr<Item, Err> { ThrowErr(err, PhantomData) }

pub struct ThrowErr<Item, Err>(Err, PhantomData<fn() -> Item>);

impl<Item, Err: Clone> Clone for ThrowErr<Item, Err> {
  fn clone(&self) -> Self { ThrowErr(self.0.clone(), PhantomData) }
}

impl<Item, Err, O> Observable<Item, Err, O> for ThrowErr<Item, Err>
where
  O: Observer<Item, Err>,
{
  type Unsub = ();

  fn actual_subscribe(self, mut observer: O) -> Self::Unsub { observer.error(self.0) }
}

impl<Item, Err> ObservableExt<Item, Err> for ThrowErr<Item, Err> {}
