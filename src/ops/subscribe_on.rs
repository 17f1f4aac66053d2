use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  scheduler::{Scheduler, Worker},
  subscription::SubscriptionHandle,
};

#[derive(Clone)]
pub struct SubscribeOnOp<S, Sch> {
  source: S,
  scheduler: Sch,
}

impl<S, Sch> SubscribeOnOp<S, Sch> {
  pub(crate) fn new(source: S, scheduler: Sch) -> Self { Self { source, scheduler } }
}

impl<Item, Err, O, S, Sch> Observable<Item, Err, O> for SubscribeOnOp<S, Sch>
where
  O: Observer<Item, Err> + Send + 'static,
  S: Observable<Item, Err, O> + Send + 'static,
  Sch: Scheduler,
{
  type Unsub = SubscriptionHandle;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let handle = SubscriptionHandle::new();
    let worker = self.scheduler.create_worker();
    handle.add(worker.clone());

    let c_handle = handle.clone();
    let source = self.source;
    worker.schedule(move || c_handle.add(source.actual_subscribe(observer)));
    handle
  }
}

impl<Item, Err, S, Sch> ObservableExt<Item, Err> for SubscribeOnOp<S, Sch>
where
  S: ObservableExt<Item, Err>,
  Sch: Scheduler,
{
}
