#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! In-process publish/subscribe dispatch of typed events to chains of handlers.
//!
//! Handlers are connected to a signal value and queued events are delivered to every handler of
//! their signal, in connection order, when the owner of the dispatcher calls `respond()`. Pushing
//! an event never runs a handler, so producers on any thread only pay for a queue insert.
//!
//! Two flavors are available:
//!
//! * [`Dispatcher`] - any hashable signal type, growable handler chains and event queue.
//! * [`fast::FastDispatcher`] - small dense signal types, fixed per-signal handler capacity and a
//!   fixed-size event ring, with no allocation after construction.
//!
//! Both implement [`EventBus`], on top of which [`Handles`] ties the lifetime of a set of
//! connections to the lifetime of the object that owns them.
//!
//! Handlers are stored as [`Callable`]s: plain functions, closures that fit in `CAPACITY` bytes,
//! or methods bound to an object.
//!
//! # Example
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//!
//! use signal_dispatch::Dispatcher;
//!
//! #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
//! enum Signal {
//!     Log,
//!     Shutdown,
//! }
//!
//! let dispatcher = Dispatcher::<Signal, String>::new();
//! let lines = Arc::new(Mutex::new(Vec::new()));
//!
//! dispatcher.connect(Signal::Log, {
//!     let lines = Arc::clone(&lines);
//!     move |line: String| lines.lock().unwrap().push(line)
//! });
//!
//! dispatcher.push_event(Signal::Log, "hello".to_string());
//! dispatcher.push_event(Signal::Shutdown, String::new());
//!
//! // Every queued event has been delivered.
//! assert_eq!(dispatcher.respond(0), 0);
//! assert_eq!(*lines.lock().unwrap(), ["hello"]);
//! ```

mod bind;
mod builder;
mod dispatcher;
mod error;
mod event_bus;
pub mod fast;
mod handler_id;
mod handles;
mod queue;
mod registry;
mod spin_lock;

pub use builder::*;
pub use dispatcher::*;
pub use error::*;
pub use event_bus::*;
pub use handler_id::*;
pub use handles::*;
pub use inline_fn::{Callable, DEFAULT_CAPACITY};
pub use queue::{Event, EventAction};
pub(crate) use queue::EventQueue;
pub(crate) use registry::HandlerRegistry;
pub(crate) use spin_lock::SpinLock;
