//! Fallback sink for errors nobody is left to observe.
//!
//! An error raised after a subscription was cancelled or already terminated,
//! or delivered to a subscriber that registered no error handler, is never
//! dropped silently: it is reported to an [`ErrorSink`].
//!
//! The sink in effect is captured when a subscription (or a subject) is
//! created, so errors raised later on another thread still reach the sink
//! that was active at subscribe time. The process-wide default logs through
//! `tracing`; tests substitute their own with [`with_sink`].
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//!
//! use rxcore::{fallback::{self, ErrorSink}, prelude::*};
//!
//! let seen = Arc::new(Mutex::new(vec![]));
//! let c_seen = seen.clone();
//! let sink = ErrorSink::new(move |err| {
//!   c_seen.lock().unwrap().push(err.downcast_ref::<&str>().copied());
//! });
//!
//! fallback::with_sink(sink, || {
//!   observable::throw_err::<i32, _>("nobody listens").subscribe(|_| {});
//! });
//! assert_eq!(*seen.lock().unwrap(), vec![Some("nobody listens")]);
//! ```

use std::{
  any::Any,
  cell::RefCell,
  fmt::{Debug, Formatter},
  sync::Arc,
};

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::error::RxError;

/// An error that reached the fallback sink.
pub struct UnhandledError {
  payload: Box<dyn Any + Send>,
  type_name: &'static str,
}

impl UnhandledError {
  pub fn new<E: Send + 'static>(err: E) -> Self {
    Self { payload: Box::new(err), type_name: std::any::type_name::<E>() }
  }

  pub fn downcast_ref<T: 'static>(&self) -> Option<&T> { self.payload.downcast_ref() }

  /// Name of the original error type.
  pub fn type_name(&self) -> &'static str { self.type_name }

  pub fn into_inner(self) -> Box<dyn Any + Send> { self.payload }

  /// Best-effort rendering of the payload for logs.
  pub fn message(&self) -> String {
    if let Some(msg) = self.downcast_ref::<&str>() {
      (*msg).to_owned()
    } else if let Some(msg) = self.downcast_ref::<String>() {
      msg.clone()
    } else if let Some(err) = self.downcast_ref::<RxError>() {
      err.to_string()
    } else {
      format!("<{}>", self.type_name)
    }
  }
}

impl Debug for UnhandledError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("UnhandledError")
      .field("type_name", &self.type_name)
      .field("message", &self.message())
      .finish()
  }
}

/// Destination of unhandled errors.
#[derive(Clone)]
pub struct ErrorSink(Arc<dyn Fn(UnhandledError) + Send + Sync>);

impl ErrorSink {
  pub fn new<F>(f: F) -> Self
  where
    F: Fn(UnhandledError) + Send + Sync + 'static,
  {
    Self(Arc::new(f))
  }

  /// The default sink: log at error level.
  pub fn logging() -> Self {
    Self::new(|err| {
      tracing::error!(
        error.type_name = err.type_name(),
        error.message = %err.message(),
        "unhandled error reached the fallback sink"
      );
    })
  }

  pub fn report(&self, err: UnhandledError) { (self.0)(err) }

  /// Wrap `err` and report it.
  pub fn report_error<E: Send + 'static>(&self, err: E) { self.report(UnhandledError::new(err)) }
}

impl Debug for ErrorSink {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str("ErrorSink") }
}

static GLOBAL_SINK: Lazy<RwLock<ErrorSink>> = Lazy::new(|| RwLock::new(ErrorSink::logging()));

thread_local! {
  static SCOPED_SINK: RefCell<Option<ErrorSink>> = const { RefCell::new(None) };
}

/// Replace the process-wide default sink.
pub fn set_global_sink(sink: ErrorSink) { *GLOBAL_SINK.write() = sink; }

/// The sink in effect on the current thread.
pub fn current() -> ErrorSink {
  SCOPED_SINK
    .with(|scoped| scoped.borrow().clone())
    .unwrap_or_else(|| GLOBAL_SINK.read().clone())
}

/// Run `f` with `sink` installed as the current thread's sink.
pub fn with_sink<R>(sink: ErrorSink, f: impl FnOnce() -> R) -> R {
  struct Restore(Option<ErrorSink>);

  impl Drop for Restore {
    fn drop(&mut self) {
      let previous = self.0.take();
      SCOPED_SINK.with(|scoped| *scoped.borrow_mut() = previous);
    }
  }

  let previous = SCOPED_SINK.with(|scoped| scoped.borrow_mut().replace(sink));
  let _restore = Restore(previous);
  f()
}
