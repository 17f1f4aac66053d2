//! # rxcore: a reactive-stream engine
//!
//! The primitives an operator library is built from: observables and the
//! observer protocol, cancellation, multicasting subjects, schedulers with a
//! deterministic virtual clock, and demand-driven backpressure.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//!
//! use rxcore::prelude::*;
//!
//! let seen = Arc::new(Mutex::new(vec![]));
//! let c_seen = seen.clone();
//! observable::from_iter(0..10)
//!   .filter(|v| v % 2 == 0)
//!   .map(|v| v * 2)
//!   .subscribe(move |v| c_seen.lock().unwrap().push(v));
//! assert_eq!(*seen.lock().unwrap(), vec![0, 4, 8, 12, 16]);
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Observable`] | Describes how to produce events for one observer |
//! | [`Observer`] | Consumes `next`, `error`, and `complete` events |
//! | [`Subscription`] | Handle to cancel an active subscription |
//! | [`Subject`] | Multicasts upstream events to many subscribers |
//! | [`Scheduler`] | Decides where and when actions run |
//! | [`Flowable`] | A producer that only emits what its consumer requested |
//!
//! Every subscription delivers at most one terminal event, and nothing
//! after it. Errors that cannot reach a subscriber go to the [`fallback`]
//! sink instead of being dropped.
//!
//! ## Feature Flags
//!
//! - **`tokio-scheduler`**: a [`Scheduler`] running workers as tokio tasks.
//!
//! [`Observable`]: observable::Observable
//! [`Observer`]: observer::Observer
//! [`Subscription`]: subscription::Subscription
//! [`Subject`]: subject::Subject
//! [`Scheduler`]: scheduler::Scheduler
//! [`Flowable`]: flowable::Flowable

pub mod error;
pub mod fallback;
pub mod flowable;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod scheduler;
pub mod subject;
pub mod subscription;

pub use prelude::*;

#[cfg(doctest)]
mod readme {
  #![doc = include_str!("../README.md")]
}
