//! End-to-end bootstrap scenarios driven through the public coordinator API.

use ddm_core::{BootstrapState, Coordinator, ManualClock, QueueMode};
use ddm_sdk::{CallbackKind, ChangeOp, Completion, Event, Handler, QueuedEvent, RawCommand};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Log = Arc<Mutex<Vec<String>>>;

fn coordinator(data: Value, clock: &ManualClock) -> Coordinator {
    Coordinator::new(data, Vec::new()).with_clock(clock.clone())
}

fn event_log(c: &mut Coordinator) -> Log {
    let log = Log::default();
    let sink = Arc::clone(&log);
    c.subscribe(
        "event",
        Handler::event(move |event| {
            sink.lock().unwrap().push(event.name.to_string());
            Ok(None)
        }),
    )
    .unwrap();
    log
}

#[test]
fn buffered_events_dispatch_in_order_once_gate_arrives() {
    let clock = ManualClock::new(0);
    let mut c = coordinator(json!({}), &clock);
    let log = event_log(&mut c);
    c.initialize();

    c.push_event(Event::new("Clicked Button"));
    assert!(log.lock().unwrap().is_empty());
    assert_eq!(c.events_mode(), QueueMode::Buffering);
    assert!(!c.state().events().get(0).unwrap().event.has_fired);

    c.push_event(Event::new("Viewed Page"));
    assert_eq!(*log.lock().unwrap(), vec!["Clicked Button", "Viewed Page"]);
    assert_eq!(c.events_mode(), QueueMode::Dispatching);

    c.push_event(Event::new("Added Product"));
    assert_eq!(log.lock().unwrap().len(), 3);
    assert_eq!(c.events_mode(), QueueMode::Dispatching);
}

#[test]
fn forced_gate_is_synthesized_and_dispatched_first() {
    let clock = ManualClock::new(0);
    let mut c = coordinator(json!({"events": [{"name": "Clicked Button"}]}), &clock);
    let log = event_log(&mut c);
    c.set_force_gate_synthesis(true);
    assert!(c.force_gate_synthesis());
    c.initialize();

    assert_eq!(*log.lock().unwrap(), vec!["Viewed Page", "Clicked Button"]);
    let gate = &c.state().events().get(0).unwrap().event;
    assert_eq!(gate.field("source"), Some(&json!("Coordinator")));
}

#[test]
fn key_scoped_and_whole_state_change_handlers() {
    let clock = ManualClock::new(0);
    let mut c = coordinator(json!({}), &clock);
    let scoped = Arc::new(Mutex::new(Vec::new()));
    let whole = Arc::new(Mutex::new(Vec::new()));
    let scoped_sink = Arc::clone(&scoped);
    let whole_sink = Arc::clone(&whole);
    c.subscribe(
        "change:user.id",
        Handler::change(move |change| {
            scoped_sink
                .lock()
                .unwrap()
                .push((change.old.cloned(), change.new.cloned()));
            Ok(())
        }),
    )
    .unwrap();
    c.subscribe(
        "change",
        Handler::change(move |change| {
            whole_sink
                .lock()
                .unwrap()
                .push((change.old.cloned(), change.new.cloned()));
            Ok(())
        }),
    )
    .unwrap();
    c.initialize();

    c.push_change(ChangeOp::new("user.id", "42"));
    clock.advance(Duration::from_millis(100));
    assert_eq!(c.poll(), 1);

    assert_eq!(*scoped.lock().unwrap(), vec![(None, Some(json!("42")))]);
    assert_eq!(
        *whole.lock().unwrap(),
        vec![(Some(json!({})), Some(json!({"user": {"id": "42"}})))]
    );

    // No further difference, no further notification.
    clock.advance(Duration::from_millis(100));
    c.poll();
    assert_eq!(scoped.lock().unwrap().len(), 1);
    assert_eq!(whole.lock().unwrap().len(), 1);
}

#[test]
fn vetoed_events_are_marked_fired_without_delivery() {
    let clock = ManualClock::new(0);
    let mut c = coordinator(json!({}), &clock);
    c.set_force_gate_synthesis(true);
    c.subscribe(
        "beforeEvent",
        Handler::before_event(|event| Ok(!event.is_named("Clicked Button"))),
    )
    .unwrap();
    let log = event_log(&mut c);
    c.initialize();

    let completed = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&completed);
    c.push_event(QueuedEvent::with_callback(
        Event::new("Clicked Button"),
        move |_| *flag.lock().unwrap() = true,
    ));
    c.push_event(Event::new("Added Product"));

    assert_eq!(*log.lock().unwrap(), vec!["Viewed Page", "Added Product"]);
    let vetoed = &c.state().events().get(1).unwrap().event;
    assert!(vetoed.is_named("Clicked Button"));
    assert!(vetoed.has_fired);
    assert!(!*completed.lock().unwrap());
}

#[test]
fn throwing_handler_lands_in_errors_and_completion_still_fires() {
    let clock = ManualClock::new(0);
    let mut c = coordinator(json!({}), &clock);
    c.set_force_gate_synthesis(true);
    c.initialize();
    c.subscribe("event", Handler::event(|_| Ok(Some(json!("ok")))))
        .unwrap();
    c.subscribe("event", Handler::event(|_| Err(anyhow::anyhow!("thrown"))))
        .unwrap();

    let completions = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&completions);
    c.push_event(QueuedEvent::with_callback(
        Event::new("Clicked Button"),
        move |completion| sink.lock().unwrap().push(completion),
    ));

    let completions = completions.lock().unwrap();
    assert_eq!(completions.len(), 1);
    match &completions[0] {
        Completion::Delivered { results, errors } => {
            assert_eq!(results, &vec![json!("ok")]);
            assert_eq!(errors.len(), 1);
            assert_eq!(results.len() + errors.len(), 2);
        }
        Completion::Unobserved => panic!("handlers were registered"),
    }
}

#[test]
fn define_fires_exactly_once() {
    let clock = ManualClock::new(0);
    let mut c = coordinator(json!({}), &clock);
    let hits = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&hits);
    c.push_command(RawCommand::on(
        "define:cart.total",
        Handler::define(move |_| {
            *counter.lock().unwrap() += 1;
            Ok(())
        }),
    ));
    c.initialize();

    for total in [0, 10, 20] {
        c.push_change(ChangeOp::new("cart.total", total));
        clock.advance(Duration::from_millis(100));
        c.poll();
    }
    assert_eq!(*hits.lock().unwrap(), 1);
    assert_eq!(c.callback_count(CallbackKind::Define), 0);
}

#[test]
fn reset_then_initialize_behaves_like_first_initialize() {
    fn run(c: &mut Coordinator) -> (Vec<String>, BootstrapState, QueueMode) {
        let log = event_log(c);
        c.initialize();
        c.push_event(Event::new("Clicked Button"));
        let state = c.bootstrap_state();
        let mode = c.events_mode();
        let seen = log.lock().unwrap().clone();
        (seen, state, mode)
    }

    let clock = ManualClock::new(0);
    let mut c = coordinator(json!({}), &clock);
    let first = run(&mut c);
    c.reset();
    let second = run(&mut c);

    assert_eq!(first, (Vec::new(), BootstrapState::Waiting, QueueMode::Buffering));
    assert_eq!(first, second);
}
