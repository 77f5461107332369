//! A logger object that reacts to `Open`, `Write` and `Close` events pushed by other code.
//!
//! The logger owns a `Handles` instance, so its handlers are disconnected when it is dropped.
//! The dispatcher's own debug logging is printed by the installed `tracing` subscriber.

use std::fmt::Write as _;
use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;
use signal_dispatch::{Dispatcher, Handles};
use tracing::Level;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
enum LogSignal {
    Open,
    Write,
    Close,
}

type LogBus = Dispatcher<LogSignal, String>;

#[derive(Default)]
struct Journal {
    name: Mutex<Option<String>>,
    buffer: Mutex<String>,
}

impl Journal {
    fn open(&self, name: String) {
        *self.name.lock() = Some(name);
    }

    fn write(&self, line: String) {
        writeln!(self.buffer.lock(), "{line}").expect("writing to a String cannot fail");
    }

    fn close(&self, _: String) {
        let name = self.name.lock().take().unwrap_or_default();
        let contents = mem::take(&mut *self.buffer.lock());

        println!("--- {name} ---");
        print!("{contents}");
        println!("--- end of {name} ---");
    }
}

struct Logger {
    journal: Arc<Journal>,
    _handles: Handles<LogBus>,
}

impl Logger {
    fn new(bus: &LogBus) -> Self {
        let journal = Arc::new(Journal::default());
        let mut handles = Handles::new(bus.clone());

        handles
            .connect_member(LogSignal::Open, &journal, Journal::open)
            .expect("a growable dispatcher always accepts handlers");
        handles
            .connect_member(LogSignal::Write, &journal, Journal::write)
            .expect("a growable dispatcher always accepts handlers");
        handles
            .connect_member(LogSignal::Close, &journal, Journal::close)
            .expect("a growable dispatcher always accepts handlers");

        Self {
            journal,
            _handles: handles,
        }
    }
}

fn main() {
    tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();

    println!("=== Dispatch Logger Example ===");

    let bus = LogBus::builder().name("logger-bus").build();
    let logger = Logger::new(&bus);

    bus.push_event(LogSignal::Open, "session.log".to_string());
    bus.push_event(LogSignal::Write, "hello".to_string());
    bus.push_event(LogSignal::Write, "world".to_string());
    bus.push_event(LogSignal::Close, String::new());

    let remaining = bus.respond(0);
    println!("Events remaining after respond: {remaining}");
    println!(
        "Journal still referenced by {} owner(s)",
        Arc::strong_count(&logger.journal)
    );

    drop(logger);

    // Nobody is listening anymore; the event is consumed without effect.
    bus.push_event(LogSignal::Write, "lost".to_string());
    bus.respond(0);

    println!("Handlers left: {}", bus.handler_count(LogSignal::Write));
    println!("Example completed successfully!");
}
