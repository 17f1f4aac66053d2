//! Errors synthesized by the engine itself.
//!
//! Producers and consumers keep their own error type; operators that must
//! create an error of their own (a timer firing, a buffer overflowing) require
//! `Err: From<RxError>`.

use std::time::Duration;

use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RxError {
  /// A backpressure buffer received more items than it can hold.
  #[error("backpressure buffer overflow: capacity {capacity} exceeded")]
  BufferOverflow { capacity: usize },

  /// No event arrived within the allowed time.
  #[error("no event within {after:?}")]
  Timeout { after: Duration },

  #[error("{0}")]
  Custom(String),
}

impl RxError {
  /// Returns a short stable label for logs.
  pub fn as_label(&self) -> &'static str {
    match self {
      RxError::BufferOverflow { .. } => "buffer_overflow",
      RxError::Timeout { .. } => "timeout",
      RxError::Custom(_) => "custom",
    }
  }

  pub fn is_overflow(&self) -> bool { matches!(self, RxError::BufferOverflow { .. }) }
}

impl From<&str> for RxError {
  fn from(msg: &str) -> Self { RxError::Custom(msg.to_owned()) }
}

impl From<String> for RxError {
  fn from(msg: String) -> Self { RxError::Custom(msg) }
}
