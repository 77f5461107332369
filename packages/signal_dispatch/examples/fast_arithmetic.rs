//! A calculator driven by a fixed-capacity dispatcher.
//!
//! Producers on several threads push arithmetic operations; the main thread delivers them in
//! batches. Handler and queue capacities are fixed by the dispatcher's type, so a full queue is
//! reported to the producer instead of growing.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::thread;

use signal_dispatch::Error;
use signal_dispatch::fast::{FastDispatcher, FixedSignal};
use tracing::Level;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Op {
    Add,
    Subtract,
    Multiply,
}

impl FixedSignal for Op {
    const COUNT: usize = 3;

    fn index(self) -> usize {
        self as usize
    }
}

type Calculator = FastDispatcher<Op, i64, 2, 16>;

#[derive(Default)]
struct Register {
    value: AtomicI64,
}

impl Register {
    fn add(&self, operand: i64) {
        self.value.fetch_add(operand, Ordering::Relaxed);
    }

    fn subtract(&self, operand: i64) {
        self.value.fetch_sub(operand, Ordering::Relaxed);
    }

    fn multiply(&self, operand: i64) {
        // Only the main thread delivers events, so there is no concurrent writer to race with.
        let current = self.value.load(Ordering::Relaxed);
        self.value.store(current.wrapping_mul(operand), Ordering::Relaxed);
    }
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    println!("=== Fast Arithmetic Example ===");

    let calculator = Calculator::builder().name("calculator").build();
    let register = Arc::new(Register::default());

    calculator.connect_member(Op::Add, &register, Register::add)?;
    calculator.connect_member(Op::Subtract, &register, Register::subtract)?;
    calculator.connect_member(Op::Multiply, &register, Register::multiply)?;
    calculator.connect(Op::Multiply, |operand| println!("multiplied by {operand}"))?;

    let producers = [Op::Add, Op::Subtract]
        .into_iter()
        .map(|op| {
            let calculator = calculator.clone();

            thread::spawn(move || {
                let mut rejected: usize = 0;

                for operand in 1..=20 {
                    while calculator.push_event(op, operand).is_err() {
                        rejected = rejected.wrapping_add(1);
                        thread::yield_now();
                    }
                }

                rejected
            })
        })
        .collect::<Vec<_>>();

    let mut delivered: usize = 0;

    while producers.iter().any(|producer| !producer.is_finished()) {
        delivered = delivered.wrapping_add(calculator.respond(0));
        thread::yield_now();
    }

    for producer in producers {
        let rejected = producer.join().expect("producer thread panicked");
        println!("A producer retried {rejected} time(s) on a full queue");
    }

    delivered = delivered.wrapping_add(calculator.respond(0));

    // Adds and subtracts of the same operands cancel out.
    println!(
        "Delivered {delivered} events, register = {}",
        register.value.load(Ordering::Relaxed)
    );

    calculator.push_event(Op::Add, 6)?;
    calculator.push_event(Op::Multiply, 7)?;
    calculator.respond(0);

    println!("Register = {}", register.value.load(Ordering::Relaxed));
    println!("Example completed successfully!");

    Ok(())
}
