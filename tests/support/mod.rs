#![allow(dead_code)]

use std::{fmt::Debug, sync::Arc};

use parking_lot::Mutex;
use rxcore::{
  fallback::ErrorSink,
  flowable::{FlowObserver, FlowSubscription},
  observer::Observer,
};

/// Route `tracing` output to the test harness so it shows up on failure.
pub fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_max_level(tracing::Level::TRACE)
    .with_test_writer()
    .try_init();
}

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn log() -> Log { Arc::new(Mutex::new(vec![])) }

/// Observer writing every event into a shared log.
#[derive(Clone)]
pub struct Recorder {
  log: Log,
  subscription: Arc<Mutex<Option<FlowSubscription>>>,
}

impl Recorder {
  pub fn new(log: &Log) -> Self { Self { log: log.clone(), subscription: Arc::default() } }

  /// The subscription handed over by a flowable.
  pub fn subscription(&self) -> FlowSubscription {
    self.subscription.lock().clone().expect("flowable did not call on_subscribe")
  }
}

impl<Item: Debug, Err: Debug> Observer<Item, Err> for Recorder {
  fn next(&mut self, value: Item) { self.log.lock().push(format!("{value:?}")) }

  fn error(&mut self, err: Err) { self.log.lock().push(format!("error {err:?}")) }

  fn complete(&mut self) { self.log.lock().push("complete".to_owned()) }

  fn is_closed(&self) -> bool { false }
}

impl<Item: Debug, Err: Debug> FlowObserver<Item, Err> for Recorder {
  fn on_subscribe(&mut self, subscription: FlowSubscription) {
    *self.subscription.lock() = Some(subscription);
  }
}

/// A sink collecting the rendered messages of unhandled errors.
pub fn collecting_sink() -> (ErrorSink, Log) {
  let seen = log();
  let c_seen = seen.clone();
  (ErrorSink::new(move |err| c_seen.lock().push(err.message())), seen)
}

pub fn entries(log: &Log) -> Vec<String> { log.lock().clone() }
