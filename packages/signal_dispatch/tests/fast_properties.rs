//! Behavioral tests for `FastDispatcher`, exercised only through its public API.

use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use signal_dispatch::Error;
use signal_dispatch::fast::{FastDispatcher, FixedSignal};
use testing::Recorder;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Op {
    Add,
    Sub,
    Mul,
}

impl FixedSignal for Op {
    const COUNT: usize = 3;

    fn index(self) -> usize {
        self as usize
    }
}

type Calculator = FastDispatcher<Op, (i64, i64), 4, 8>;

fn tagged(
    recorder: &Recorder<(char, i64)>,
    tag: char,
) -> impl Fn((i64, i64)) + Clone + Send + Sync + 'static {
    let recorder = recorder.clone();
    move |(a, _)| recorder.record((tag, a))
}

#[derive(Default)]
struct Accumulator {
    total: AtomicUsize,
}

impl Accumulator {
    fn add(&self, (a, b): (i64, i64)) {
        let sum = usize::try_from(a + b).expect("test only adds positive numbers");
        self.total.fetch_add(sum, Ordering::Relaxed);
    }

    fn add_scaled(&self, scale: &usize, (a, b): (i64, i64)) {
        let sum = usize::try_from(a + b).expect("test only adds positive numbers");
        self.total.fetch_add(scale * sum, Ordering::Relaxed);
    }

    fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }
}

#[test]
fn handlers_fire_in_connection_order_with_recycled_slots() {
    let dispatcher = Calculator::new();
    let recorder = Recorder::new();

    dispatcher.connect(Op::Add, tagged(&recorder, '1')).unwrap();
    let second = dispatcher.connect(Op::Add, tagged(&recorder, '2')).unwrap();
    dispatcher.connect(Op::Add, tagged(&recorder, '3')).unwrap();

    assert!(dispatcher.disconnect(second));
    let reuser = dispatcher.connect(Op::Add, tagged(&recorder, 'r')).unwrap();
    assert_eq!(reuser.index(), second.index());
    assert!(!dispatcher.disconnect(second));

    dispatcher.push_event(Op::Add, (1, 0)).unwrap();
    assert_eq!(dispatcher.respond(0), 1);

    assert_eq!(recorder.take(), [('1', 1), ('r', 1), ('3', 1)]);
}

#[test]
fn events_are_delivered_in_push_order_across_signals() {
    let dispatcher = Calculator::new();
    let recorder = Recorder::new();

    dispatcher.connect(Op::Add, tagged(&recorder, '+')).unwrap();
    dispatcher.connect(Op::Sub, tagged(&recorder, '-')).unwrap();

    dispatcher.push_event(Op::Add, (1, 0)).unwrap();
    dispatcher.push_event(Op::Sub, (2, 0)).unwrap();
    dispatcher.push_event(Op::Add, (3, 0)).unwrap();

    // Events without handlers are consumed too.
    dispatcher.push_event(Op::Mul, (4, 0)).unwrap();

    assert_eq!(dispatcher.respond(0), 4);
    assert_eq!(dispatcher.events_pending(), 0);
    assert_eq!(recorder.take(), [('+', 1), ('-', 2), ('+', 3)]);
}

#[test]
fn limit_leaves_rest_queued_in_order() {
    let dispatcher = Calculator::new();
    let recorder = Recorder::new();

    dispatcher.connect(Op::Mul, tagged(&recorder, '*')).unwrap();

    for value in 1..=5 {
        dispatcher.push_event(Op::Mul, (value, 0)).unwrap();
    }

    assert_eq!(dispatcher.respond(2), 2);
    assert_eq!(dispatcher.events_pending(), 3);
    assert_eq!(dispatcher.respond(0), 3);
    assert_eq!(
        recorder.take(),
        [('*', 1), ('*', 2), ('*', 3), ('*', 4), ('*', 5)]
    );
}

#[test]
fn purge_removes_only_one_signal() {
    let dispatcher = Calculator::new();
    let recorder = Recorder::new();

    dispatcher.connect(Op::Add, tagged(&recorder, '+')).unwrap();
    dispatcher.connect(Op::Sub, tagged(&recorder, '-')).unwrap();

    for value in 1..=3 {
        dispatcher.push_event(Op::Add, (value, 0)).unwrap();
    }
    dispatcher.push_event(Op::Sub, (10, 0)).unwrap();
    dispatcher.push_event(Op::Sub, (20, 0)).unwrap();

    assert_eq!(dispatcher.purge_events(Op::Add), 3);
    assert_eq!(dispatcher.respond(0), 2);
    assert_eq!(recorder.take(), [('-', 10), ('-', 20)]);
}

#[test]
fn queue_rejects_when_full_and_wraps_after_respond() {
    let dispatcher = Calculator::new();
    let recorder = Recorder::new();

    dispatcher.connect(Op::Add, tagged(&recorder, '+')).unwrap();

    for value in 0..8 {
        dispatcher.push_event(Op::Add, (value, 0)).unwrap();
    }

    assert_eq!(
        dispatcher.push_event(Op::Add, (8, 0)),
        Err(Error::QueueFull { capacity: 8 })
    );

    assert_eq!(dispatcher.respond(3), 3);

    for value in 8..11 {
        dispatcher.push_event(Op::Add, (value, 0)).unwrap();
    }

    assert_eq!(dispatcher.respond(0), 8);

    let delivered = recorder
        .take()
        .into_iter()
        .map(|(_, value)| value)
        .collect::<Vec<_>>();
    assert_eq!(delivered, (0..11).collect::<Vec<_>>());
}

#[test]
fn chain_rejects_when_full() {
    let dispatcher = Calculator::new();

    let ids = (0..4)
        .map(|_| dispatcher.connect(Op::Sub, |_| {}).unwrap())
        .collect::<Vec<_>>();

    assert_eq!(
        dispatcher.connect(Op::Sub, |_| {}),
        Err(Error::ChainFull {
            signal_index: 1,
            capacity: 4
        })
    );

    let last = ids.last().copied().unwrap();
    assert!(dispatcher.disconnect(last));
    dispatcher.connect(Op::Sub, |_| {}).unwrap();

    assert_eq!(dispatcher.disconnect_all(Op::Sub), 4);
    assert_eq!(dispatcher.handler_count(Op::Sub), 0);
}

#[test]
fn members_and_bound_values() {
    let dispatcher = Calculator::new();
    let accumulator = Arc::new(Accumulator::default());

    dispatcher
        .connect_member(Op::Add, &accumulator, Accumulator::add)
        .unwrap();
    dispatcher
        .connect_bind_member(Op::Add, &accumulator, Accumulator::add_scaled, 10)
        .unwrap();
    dispatcher
        .connect_bind(
            Op::Mul,
            {
                let accumulator = Arc::clone(&accumulator);
                move |factor: &i64, (a, b): (i64, i64)| accumulator.add((a * b * factor, 0))
            },
            2,
        )
        .unwrap();

    dispatcher.push_event(Op::Add, (1, 2)).unwrap();
    dispatcher.push_event(Op::Mul, (2, 5)).unwrap();
    assert_eq!(dispatcher.respond(0), 2);

    assert_eq!(accumulator.total(), 3 + 30 + 20);
}

#[test]
fn raw_member_reads_borrowed_object() {
    let dispatcher = Calculator::new();
    let accumulator = Accumulator::default();

    // SAFETY: The handler is disconnected before the accumulator goes out of scope.
    let id = unsafe {
        dispatcher.connect_member_raw(Op::Add, NonNull::from(&accumulator), Accumulator::add)
    }
    .unwrap();

    dispatcher.push_event(Op::Add, (4, 4)).unwrap();
    dispatcher.respond(0);
    assert!(dispatcher.disconnect(id));

    assert_eq!(accumulator.total(), 8);
}

#[test]
fn connect_unique_connects_function_once() {
    fn handler(_: (i64, i64)) {}

    let dispatcher = Calculator::new();

    let first = dispatcher.connect_unique(Op::Mul, handler).unwrap();
    let second = dispatcher.connect_unique(Op::Mul, handler).unwrap();

    assert_eq!(first, second);
    assert_eq!(dispatcher.handler_count(Op::Mul), 1);
}

#[test]
fn handler_may_push_during_respond() {
    let dispatcher = Calculator::new();
    let recorder = Recorder::new();

    dispatcher
        .connect(Op::Add, {
            let dispatcher = dispatcher.clone();
            let recorder = recorder.clone();
            move |(a, b)| {
                recorder.record(('+', a));
                if a < 3 {
                    dispatcher.push_event(Op::Add, (a + 1, b)).unwrap();
                }
            }
        })
        .unwrap();

    dispatcher.push_event(Op::Add, (1, 0)).unwrap();

    assert_eq!(dispatcher.respond(0), 1);
    assert_eq!(dispatcher.respond(0), 1);
    assert_eq!(dispatcher.respond(0), 1);
    assert_eq!(dispatcher.respond(0), 0);
    assert_eq!(recorder.take(), [('+', 1), ('+', 2), ('+', 3)]);
}
