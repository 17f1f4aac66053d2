use std::sync::Arc;

use crate::{
  observable::{Observable, ObservableExt},
  observer::{BoxedObserver, Observer},
  subscription::BoxedSubscription,
};

type SubscribeFn<Item, Err> = dyn Fn(BoxedObserver<Item, Err>) -> BoxedSubscription + Send + Sync;

/// A type-erased observable.
///
/// Useful to store observables of different concrete types in one place, or
/// to return them from functions without naming the operator chain.
pub struct BoxObservable<Item, Err>(Arc<SubscribeFn<Item, Err>>);

impl<Item, Err> Clone for BoxObservable<Item, Err> {
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<Item: 'static, Err: 'static> BoxObservable<Item, Err> {
  pub fn new<S>(source: S) -> Self
  where
    S: Observable<Item, Err, BoxedObserver<Item, Err>> + Clone + Send + Sync + 'static,
  {
    Self(Arc::new(move |observer: BoxedObserver<Item, Err>| -> BoxedSubscription {
      Box::new(source.clone().actual_subscribe(observer))
    }))
  }
}

impl<Item, Err, O> Observable<Item, Err, O> for BoxObservable<Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: 'static,
  Err: 'static,
{
  type Unsub = BoxedSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub { (self.0)(Box::new(observer)) }
}

impl<Item, Err> ObservableExt<Item, Err> for BoxObservable<Item, Err> {}
