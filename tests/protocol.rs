mod support;

use std::{
  sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    mpsc, Arc,
  },
  thread,
  time::Duration,
};

use rxcore::{fallback, prelude::*};
use support::{collecting_sink, entries, init_tracing, log, Recorder};

#[test]
fn cancel_stops_a_producer_on_another_thread() {
  init_tracing();
  let log = log();
  let produced = Arc::new(AtomicUsize::new(0));
  let c_produced = produced.clone();
  let (started_tx, started_rx) = mpsc::channel();
  let (stopped_tx, stopped_rx) = mpsc::channel();

  let handle = observable::create(move |emitter: Emitter<usize, ()>| {
    thread::spawn(move || {
      let _ = started_tx.send(());
      let mut i = 0;
      while !emitter.is_closed() {
        emitter.next(i);
        i += 1;
        c_produced.store(i, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(1));
      }
      let _ = stopped_tx.send(());
    });
    Ok(())
  })
  .subscribe_with(Recorder::new(&log));

  started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
  thread::sleep(Duration::from_millis(10));
  handle.unsubscribe();
  let seen_at_cancel = entries(&log).len();
  stopped_rx.recv_timeout(Duration::from_secs(5)).unwrap();

  // at most the emission racing the cancel slips through
  assert!(entries(&log).len() <= seen_at_cancel + 1);
  assert!(!entries(&log).iter().any(|e| e == "complete"));
}

#[test]
fn unsubscribe_is_idempotent_and_runs_teardown_once() {
  let teardowns = Arc::new(AtomicUsize::new(0));
  let c_teardowns = teardowns.clone();
  let handle = observable::create(move |emitter: Emitter<i32, ()>| {
    emitter.add_teardown(move || {
      c_teardowns.fetch_add(1, Ordering::SeqCst);
    });
    Ok(())
  })
  .subscribe(|_| {});

  handle.unsubscribe();
  handle.unsubscribe();
  handle.clone().unsubscribe();
  assert!(handle.is_closed());
  assert_eq!(teardowns.load(Ordering::SeqCst), 1);
}

#[test]
fn guard_unsubscribes_on_drop() {
  let released = Arc::new(AtomicBool::new(false));
  let c_released = released.clone();
  {
    let _guard = observable::create(move |emitter: Emitter<i32, ()>| {
      emitter.add_teardown(move || c_released.store(true, Ordering::SeqCst));
      Ok(())
    })
    .subscribe(|_| {})
    .unsubscribe_when_dropped();
    assert!(!released.load(Ordering::SeqCst));
  }
  assert!(released.load(Ordering::SeqCst));
}

#[test]
fn exactly_one_terminal_event() {
  let log = log();
  observable::create(|emitter: Emitter<i32, &str>| {
    emitter.next(1);
    emitter.error("first");
    emitter.next(2);
    emitter.complete();
    Ok(())
  })
  .subscribe_with(Recorder::new(&log));
  assert_eq!(entries(&log), vec!["1", "error \"first\""]);
}

#[test]
fn orphaned_errors_reach_the_fallback_sink() {
  let (sink, orphans) = collecting_sink();
  let log = log();
  fallback::with_sink(sink, || {
    // error after completion
    observable::create(|emitter: Emitter<i32, &str>| {
      emitter.complete();
      emitter.error("after complete");
      Err("returned after complete")
    })
    .subscribe_with(Recorder::new(&log));

    // next-only subscriber has no error handler
    observable::throw_err::<i32, _>("unobserved").subscribe(|_| {});
  });

  assert_eq!(entries(&log), vec!["complete"]);
  assert_eq!(entries(&orphans), vec!["after complete", "returned after complete", "unobserved"]);
}

#[test]
fn error_after_cancel_goes_to_the_sink_captured_at_subscribe() {
  let (sink, orphans) = collecting_sink();
  let slot = Arc::new(parking_lot::Mutex::new(None));
  let c_slot = slot.clone();
  let log = log();
  let handle = fallback::with_sink(sink, || {
    observable::create(move |emitter: Emitter<i32, String>| {
      *c_slot.lock() = Some(emitter);
      Ok(())
    })
    .subscribe_with(Recorder::new(&log))
  });

  handle.unsubscribe();
  let emitter = slot.lock().take().unwrap();
  // raised later, on another thread, outside the scoped sink
  thread::spawn(move || emitter.error("late".to_owned())).join().unwrap();

  assert!(entries(&log).is_empty());
  assert_eq!(entries(&orphans), vec!["late"]);
}

#[test]
fn injected_sinks_take_precedence_over_the_ambient_one() {
  let (ambient, ambient_seen) = collecting_sink();
  let (injected, injected_seen) = collecting_sink();
  let log = log();
  fallback::with_sink(ambient, || {
    let handle = observable::create(|emitter: Emitter<i32, &str>| {
      emitter.complete();
      Err("after complete")
    })
    .subscribe_with_sink(Recorder::new(&log), injected.clone());
    assert!(handle.is_closed());

    let subject = Subject::<i32, &str, _>::with_policy_and_sink(
      rxcore::subject::Publish,
      injected.clone(),
    );
    subject.error("first");
    subject.error("second");
  });

  assert_eq!(entries(&log), vec!["complete"]);
  assert!(entries(&ambient_seen).is_empty());
  assert_eq!(entries(&injected_seen), vec!["after complete", "second"]);
}

#[test]
fn merge_completes_after_both_sides() {
  let log = log();
  let left = PublishSubject::<i32, &str>::new();
  let right = PublishSubject::<i32, &str>::new();
  left.clone().merge(right.clone()).subscribe_with(Recorder::new(&log));

  left.next(1);
  right.next(2);
  left.complete();
  right.next(3);
  assert!(!entries(&log).contains(&"complete".to_owned()));
  right.complete();
  assert_eq!(entries(&log), vec!["1", "2", "3", "complete"]);
}

#[test]
fn merge_error_cancels_the_other_side() {
  let log = log();
  let left = PublishSubject::<i32, &str>::new();
  let right = PublishSubject::<i32, &str>::new();
  left.clone().merge(right.clone()).subscribe_with(Recorder::new(&log));

  left.error("left failed");
  right.next(1);
  assert_eq!(entries(&log), vec!["error \"left failed\""]);
  assert_eq!(right.subscriber_count(), 0);
}

#[test]
fn boxed_observables_resubscribe_independently() {
  let source: BoxObservable<i32, std::convert::Infallible> =
    observable::from_iter(1..=3).map(|v| v * 2).box_it();
  let (first, second) = (log(), log());
  source.clone().subscribe_with(Recorder::new(&first));
  source.take(1).subscribe_with(Recorder::new(&second));
  assert_eq!(entries(&first), vec!["2", "4", "6", "complete"]);
  assert_eq!(entries(&second), vec!["2", "complete"]);
}
