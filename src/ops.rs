//! Operators an operator author builds on.
//!
//! Each one is a new observable wrapping its source, subscribing through the
//! same [`Observable`](crate::observable::Observable) contract as any other.

pub mod delay;
pub mod filter;
pub mod map;
pub mod map_err;
pub mod merge;
pub mod observe_on;
pub mod subscribe_on;
pub mod take;
pub mod timeout;
