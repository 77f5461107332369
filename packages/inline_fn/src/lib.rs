#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Type-erased callables with inline storage.
//!
//! This package provides [`Callable`], a cloneable, thread-safe handle to "something that can be
//! called with arguments `A` and returns `R`". The target can be a free function, a closure or a
//! method bound to an object, and is stored inside the `Callable` itself instead of on the heap.
//!
//! The storage capacity is a const generic parameter. A target that does not fit is rejected at
//! compile time, never silently boxed.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use inline_fn::{Callable, CallableKind};
//!
//! struct Greeter {
//!     greeting: &'static str,
//! }
//!
//! impl Greeter {
//!     fn greet(&self, name: &'static str) -> String {
//!         format!("{}, {name}!", self.greeting)
//!     }
//! }
//!
//! let greeter = Arc::new(Greeter { greeting: "Hello" });
//! let callable = Callable::<&'static str, String>::from_shared_method(greeter, Greeter::greet);
//!
//! assert_eq!(callable.call("world"), "Hello, world!");
//! assert_eq!(
//!     callable.info().map(|info| info.kind()),
//!     Some(CallableKind::SharedMethod)
//! );
//! ```
//!
//! # Identity
//!
//! Function pointers and methods bound to external objects can be compared with
//! [`Callable::same_target()`], which is useful to avoid duplicate registrations. Closures have no
//! identity.

mod callable;
mod error;
mod info;
mod inline;

pub use callable::*;
pub use error::*;
pub use info::*;
