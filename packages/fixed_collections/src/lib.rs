#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Containers with a capacity fixed at compile time.
//!
//! Both [`RingQueue`] and [`BoundedStack`] allocate all their slots when created and never
//! allocate again. Adding to a full container fails and hands the value back to the caller
//! instead of growing or overwriting existing items.
//!
//! ```rust
//! use fixed_collections::RingQueue;
//!
//! let mut queue = RingQueue::<u32, 2>::new();
//!
//! queue.push(1).unwrap();
//! queue.push(2).unwrap();
//!
//! let rejected = queue.push(3).unwrap_err();
//! assert_eq!(rejected.into_inner(), 3);
//!
//! assert_eq!(queue.pop(), Some(1));
//! queue.push(3).unwrap();
//!
//! assert_eq!(queue.iter().copied().collect::<Vec<_>>(), [2, 3]);
//! ```

mod bounded_stack;
mod error;
mod ring_queue;

pub use bounded_stack::*;
pub use error::*;
pub use ring_queue::*;
