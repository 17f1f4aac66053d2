//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Errors
pub use crate::error::RxError;
pub use crate::fallback;
// Backpressure
pub use crate::flowable::{
  self, BackpressureStrategy, FlowObserver, FlowSubscription, Flowable, FlowableExt, Generated,
  UNBOUNDED,
};
// Core traits and factories
pub use crate::observable::{self, BoxObservable, Emitter, Observable, ObservableExt};
pub use crate::observer::{BoxedObserver, Observer};
// Schedulers
#[cfg(feature = "tokio-scheduler")]
pub use crate::scheduler::{TokioScheduler, TokioWorker};
pub use crate::scheduler::{
  ImmediateScheduler, NewThreadScheduler, Scheduler, TrampolineScheduler, VirtualTimeScheduler,
  Worker,
};
// Subjects
pub use crate::subject::{
  AsyncSubject, BehaviorSubject, PublishSubject, ReplayConfig, ReplaySubject, RetentionPolicy,
  Subject,
};
// Subscriptions
pub use crate::subscription::{Subscription, SubscriptionGuard, SubscriptionHandle};
