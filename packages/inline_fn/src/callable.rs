use std::any::type_name;
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use crate::inline::InlineClosure;
use crate::{CallableInfo, CallableKind, EmptyCallableError};

/// Default size in bytes of the inline buffer of a [`Callable`].
///
/// Enough for a closure that captures a handful of pointers, or an `Arc` plus a method pointer.
pub const DEFAULT_CAPACITY: usize = 64;

/// A type-erased callable that stores its target inline, without heap allocation.
///
/// A `Callable<A, R, CAPACITY>` can hold any of the following, all invoked as `fn(A) -> R`:
///
/// * a free function pointer ([`from_fn()`][Self::from_fn]);
/// * a closure or other functor ([`from_closure()`][Self::from_closure]);
/// * a method bound to an object the callable owns
///   ([`from_owned_method()`][Self::from_owned_method]);
/// * a method bound to an object kept alive by an `Arc`
///   ([`from_shared_method()`][Self::from_shared_method]);
/// * a method bound to an object the caller keeps alive
///   ([`from_raw_method()`][Self::from_raw_method]).
///
/// Use a tuple as `A` to pass multiple arguments and `()` to pass none.
///
/// # Capacity
///
/// The state of the target (closure captures, owned object) is stored in a buffer of
/// `CAPACITY` bytes that is part of the `Callable` itself. Storing a target that does not fit is a
/// compile-time error, so the capacity/performance tradeoff is visible where the callable is
/// created:
///
/// ```compile_fail
/// use inline_fn::Callable;
///
/// let big = [0_u8; 128];
/// let callable = Callable::<(), u8, 64>::from_closure(move |()| big[0]);
/// ```
///
/// # Thread safety
///
/// Every constructor requires its target to be `Send + Sync`, so every `Callable` is thread-safe.
///
/// # Example
///
/// ```
/// use inline_fn::Callable;
///
/// fn add((a, b): (i32, i32)) -> i32 {
///     a + b
/// }
///
/// let from_function = Callable::<(i32, i32), i32>::from_fn(add);
///
/// let factor = 3;
/// let from_closure = Callable::<(i32, i32), i32>::from_closure(move |(a, b)| (a + b) * factor);
///
/// assert_eq!(from_function.call((1, 2)), 3);
/// assert_eq!(from_closure.call((1, 2)), 9);
/// ```
pub struct Callable<A, R = (), const CAPACITY: usize = DEFAULT_CAPACITY> {
    target: Target<A, R, CAPACITY>,
}

enum Target<A, R, const CAPACITY: usize> {
    Empty,

    Function(fn(A) -> R),

    Method {
        kind: CallableKind,
        object: Option<usize>,
        method: usize,
        closure: InlineClosure<A, R, CAPACITY>,
    },

    Closure(InlineClosure<A, R, CAPACITY>),
}

impl<A, R, const CAPACITY: usize> Callable<A, R, CAPACITY> {
    /// Creates an empty callable. Calling it fails until a target is assigned.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            target: Target::Empty,
        }
    }

    /// Creates a callable from a free function pointer.
    #[must_use]
    pub const fn from_fn(function: fn(A) -> R) -> Self {
        Self {
            target: Target::Function(function),
        }
    }

    /// Whether the callable has no target.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self.target, Target::Empty)
    }

    /// Invokes the target.
    ///
    /// # Panics
    ///
    /// Panics if the callable is empty.
    #[inline]
    pub fn call(&self, args: A) -> R {
        match self.try_call(args) {
            Ok(result) => result,
            Err(error) => panic!("{error}"),
        }
    }

    /// Invokes the target, failing if there is no target to invoke.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyCallableError`] if the callable is empty.
    #[inline]
    pub fn try_call(&self, args: A) -> Result<R, EmptyCallableError> {
        match &self.target {
            Target::Empty => Err(EmptyCallableError),
            Target::Function(function) => Ok(function(args)),
            Target::Method { closure, .. } | Target::Closure(closure) => Ok(closure.call(args)),
        }
    }

    /// Identity information about the target, or `None` if the callable is empty.
    #[must_use]
    pub fn info(&self) -> Option<CallableInfo> {
        match &self.target {
            Target::Empty => None,
            Target::Function(function) => Some(CallableInfo::new(
                CallableKind::Function,
                None,
                Some(function_address(*function)),
            )),
            Target::Method {
                kind,
                object,
                method,
                ..
            } => Some(CallableInfo::new(*kind, *object, Some(*method))),
            Target::Closure(_) => Some(CallableInfo::new(CallableKind::Closure, None, None)),
        }
    }

    /// Whether both callables are known to invoke the same code on the same object.
    ///
    /// Only function pointers and methods bound to external objects (borrowed or shared) have a
    /// stable identity. Closures and owned methods are never the same target as anything.
    #[must_use]
    pub fn same_target(&self, other: &Self) -> bool {
        match (self.info(), other.info()) {
            (Some(ours), Some(theirs)) => ours.is_same_target(&theirs),
            _ => false,
        }
    }
}

impl<A, R, const CAPACITY: usize> Callable<A, R, CAPACITY>
where
    A: 'static,
    R: 'static,
{
    /// Creates a callable from a closure or any other `Fn` implementation.
    ///
    /// The closure is moved into the inline buffer. Later changes to variables the closure
    /// captured by value are not observed by the callable.
    ///
    /// Fails to compile if the closure is larger than `CAPACITY` bytes.
    #[must_use]
    pub fn from_closure<F>(closure: F) -> Self
    where
        F: Fn(A) -> R + Clone + Send + Sync + 'static,
    {
        Self {
            target: Target::Closure(InlineClosure::new(closure)),
        }
    }

    /// Creates a callable that invokes `method` on an object it owns.
    ///
    /// The object is moved into the inline buffer and cloned together with the callable.
    ///
    /// Fails to compile if the object plus the method pointer are larger than `CAPACITY` bytes.
    #[must_use]
    pub fn from_owned_method<T>(object: T, method: fn(&T, A) -> R) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        Self {
            target: Target::Method {
                kind: CallableKind::OwnedMethod,
                object: None,
                method: method_address(method),
                closure: InlineClosure::new(move |args| method(&object, args)),
            },
        }
    }

    /// Creates a callable that invokes `method` on an object whose lifetime is extended by
    /// shared ownership. The object lives at least as long as any clone of the callable.
    #[must_use]
    pub fn from_shared_method<T>(object: Arc<T>, method: fn(&T, A) -> R) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self {
            target: Target::Method {
                kind: CallableKind::SharedMethod,
                object: Some(Arc::as_ptr(&object).addr()),
                method: method_address(method),
                closure: InlineClosure::new(move |args| method(&object, args)),
            },
        }
    }

    /// Creates a callable that invokes `method` on an object it does not own.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that `object` points to a valid `T` for as long as this callable
    /// or any clone of it may be invoked, and that no exclusive reference to the object exists
    /// while an invocation is in progress.
    #[must_use]
    pub unsafe fn from_raw_method<T>(object: NonNull<T>, method: fn(&T, A) -> R) -> Self
    where
        T: Sync + 'static,
    {
        let object = RawObject(object);

        Self {
            target: Target::Method {
                kind: CallableKind::BorrowedMethod,
                object: Some(object.address()),
                method: method_address(method),
                closure: InlineClosure::new(move |args| {
                    // SAFETY: The creator of the callable guarantees that the object is valid
                    // and not exclusively borrowed for as long as the callable may be invoked.
                    let object = unsafe { object.get() };
                    method(object, args)
                }),
            },
        }
    }
}

impl<A, R, const CAPACITY: usize> Clone for Callable<A, R, CAPACITY> {
    fn clone(&self) -> Self {
        let target = match &self.target {
            Target::Empty => Target::Empty,
            Target::Function(function) => Target::Function(*function),
            Target::Method {
                kind,
                object,
                method,
                closure,
            } => Target::Method {
                kind: *kind,
                object: *object,
                method: *method,
                closure: closure.clone(),
            },
            Target::Closure(closure) => Target::Closure(closure.clone()),
        };

        Self { target }
    }
}

impl<A, R, const CAPACITY: usize> Default for Callable<A, R, CAPACITY> {
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn default() -> Self {
        Self::new()
    }
}

impl<A, R, const CAPACITY: usize> From<fn(A) -> R> for Callable<A, R, CAPACITY> {
    fn from(function: fn(A) -> R) -> Self {
        Self::from_fn(function)
    }
}

impl<A, R, const CAPACITY: usize> fmt::Debug for Callable<A, R, CAPACITY> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct(type_name::<Self>());

        match &self.target {
            Target::Empty => debug.field("target", &"<empty>"),
            Target::Function(function) => debug
                .field("kind", &CallableKind::Function)
                .field("target", &format_args!("{:#x}", function_address(*function))),
            Target::Method { kind, closure, .. } => debug
                .field("kind", kind)
                .field("target_type", &closure.type_name()),
            Target::Closure(closure) => debug
                .field("kind", &CallableKind::Closure)
                .field("target_type", &closure.type_name()),
        };

        debug.finish()
    }
}

/// A pointer to an object that a borrowed-method callable invokes methods on.
///
/// Accessed through methods only, so closures capture the whole wrapper (and its thread-safety
/// impls) instead of the inner pointer field.
struct RawObject<T>(NonNull<T>);

impl<T> RawObject<T> {
    fn address(&self) -> usize {
        self.0.as_ptr().addr()
    }

    /// # Safety
    ///
    /// The object must be valid and not exclusively borrowed for the returned lifetime.
    unsafe fn get(&self) -> &T {
        // SAFETY: Forwarded to caller.
        unsafe { self.0.as_ref() }
    }
}

impl<T> Clone for RawObject<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for RawObject<T> {}

// SAFETY: Only shared references are ever created from the pointer, so moving the pointer to
// another thread is equivalent to sending a `&T`, which is fine for `T: Sync`.
unsafe impl<T: Sync> Send for RawObject<T> {}

// SAFETY: Same reasoning as `Send` - all a sharer can do is obtain a `&T`.
unsafe impl<T: Sync> Sync for RawObject<T> {}

fn function_address<A, R>(function: fn(A) -> R) -> usize {
    (function as *const ()).addr()
}

fn method_address<T, A, R>(method: fn(&T, A) -> R) -> usize {
    (method as *const ()).addr()
}
