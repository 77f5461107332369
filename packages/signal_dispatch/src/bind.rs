//! Builds handler callables for the `connect_*` family of operations.
//!
//! Shared by both dispatcher flavors and by [`Handles`][crate::Handles].

use std::ptr::NonNull;
use std::sync::Arc;

use inline_fn::Callable;

/// A handler that receives a reference to `bound` ahead of the event arguments.
pub(crate) fn with_bound<A, B, F, const CAPACITY: usize>(
    handler: F,
    bound: B,
) -> Callable<A, (), CAPACITY>
where
    A: 'static,
    B: Clone + Send + Sync + 'static,
    F: Fn(&B, A) + Clone + Send + Sync + 'static,
{
    Callable::from_closure(move |args| handler(&bound, args))
}

/// A handler that calls `method` on an object kept alive by the handler.
pub(crate) fn shared_member<A, T, const CAPACITY: usize>(
    object: &Arc<T>,
    method: fn(&T, A),
) -> Callable<A, (), CAPACITY>
where
    A: 'static,
    T: Send + Sync + 'static,
{
    Callable::from_shared_method(Arc::clone(object), method)
}

/// A handler that calls `method` on an object the caller keeps alive.
///
/// # Safety
///
/// The object must remain valid and must not be exclusively borrowed for as long as the handler
/// can be invoked.
pub(crate) unsafe fn raw_member<A, T, const CAPACITY: usize>(
    object: NonNull<T>,
    method: fn(&T, A),
) -> Callable<A, (), CAPACITY>
where
    A: 'static,
    T: Sync + 'static,
{
    // SAFETY: Forwarded to caller.
    unsafe { Callable::from_raw_method(object, method) }
}

/// A handler that calls `method` on an object kept alive by the handler, passing `bound` ahead of
/// the event arguments.
pub(crate) fn bound_shared_member<A, T, B, const CAPACITY: usize>(
    object: &Arc<T>,
    method: fn(&T, &B, A),
    bound: B,
) -> Callable<A, (), CAPACITY>
where
    A: 'static,
    T: Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    let object = Arc::clone(object);

    Callable::from_closure(move |args| method(&object, &bound, args))
}

/// A handler closure that calls `method` on an object for as long as the object is alive
/// elsewhere, and does nothing once the object has been dropped.
///
/// Returned as a plain closure so it can be connected through [`EventBus`][crate::EventBus].
pub(crate) fn weak_member<A, T>(
    object: &Arc<T>,
    method: fn(&T, A),
) -> impl Fn(A) + Clone + Send + Sync + 'static
where
    A: 'static,
    T: Send + Sync + 'static,
{
    let object = Arc::downgrade(object);

    move |args| {
        if let Some(object) = object.upgrade() {
            method(&object, args);
        }
    }
}

/// Like [`weak_member()`] but passing `bound` ahead of the event arguments.
pub(crate) fn bound_weak_member<A, T, B>(
    object: &Arc<T>,
    method: fn(&T, &B, A),
    bound: B,
) -> impl Fn(A) + Clone + Send + Sync + 'static
where
    A: 'static,
    T: Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    let object = Arc::downgrade(object);

    move |args| {
        if let Some(object) = object.upgrade() {
            method(&object, &bound, args);
        }
    }
}
