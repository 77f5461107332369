use std::any::type_name;
use std::mem::MaybeUninit;
use std::ptr;

/// Alignment guaranteed for the start of the inline buffer.
///
/// Targets with a stricter alignment requirement are rejected at compile time.
pub(crate) const BUFFER_ALIGN: usize = 16;

/// Raw bytes that hold exactly one erased target.
///
/// The alignment here must match [`BUFFER_ALIGN`].
#[repr(C, align(16))]
struct InlineBuffer<const CAPACITY: usize> {
    bytes: [MaybeUninit<u8>; CAPACITY],
}

impl<const CAPACITY: usize> InlineBuffer<CAPACITY> {
    const fn uninit() -> Self {
        Self {
            bytes: [MaybeUninit::uninit(); CAPACITY],
        }
    }

    fn as_ptr(&self) -> *const () {
        self.bytes.as_ptr().cast()
    }

    fn as_mut_ptr(&mut self) -> *mut () {
        self.bytes.as_mut_ptr().cast()
    }
}

/// Remembers how to call, clone and drop a target while forgetting its type.
///
/// Holds only function pointers, so every closure carries its own copy by value.
struct Vtable<A, R> {
    call: unsafe fn(*const (), A) -> R,
    clone_into: unsafe fn(*const (), *mut ()),
    drop_in_place: unsafe fn(*mut ()),
    type_name: fn() -> &'static str,
}

// Manual impls: a derive would demand `A: Clone` and `R: Clone`.
impl<A, R> Clone for Vtable<A, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A, R> Copy for Vtable<A, R> {}

/// A callable target of arbitrary type, stored by value in a buffer of `CAPACITY` bytes.
///
/// Moving an `InlineClosure` moves the bytes of the target, which is sound because every Rust
/// value may be relocated by a plain memory copy. Cloning goes through the `Clone` impl of the
/// target and dropping goes through its `Drop` glue, so no relocatability assumption is made
/// about anything other than moves.
pub(crate) struct InlineClosure<A, R, const CAPACITY: usize> {
    buffer: InlineBuffer<CAPACITY>,
    vtable: Vtable<A, R>,
}

impl<A, R, const CAPACITY: usize> InlineClosure<A, R, CAPACITY>
where
    A: 'static,
    R: 'static,
{
    /// Moves `target` into a new inline buffer.
    ///
    /// Fails to compile if `F` does not fit into `CAPACITY` bytes or needs an alignment
    /// stricter than [`BUFFER_ALIGN`].
    pub(crate) fn new<F>(target: F) -> Self
    where
        F: Fn(A) -> R + Clone + Send + Sync + 'static,
    {
        const {
            assert!(
                size_of::<F>() <= CAPACITY,
                "cannot hold a callable this large - enlarge the callable capacity"
            );
            assert!(
                align_of::<F>() <= BUFFER_ALIGN,
                "cannot hold a callable with an alignment stricter than the inline buffer alignment"
            );
        }

        let mut buffer = InlineBuffer::<CAPACITY>::uninit();

        // SAFETY: The compile-time assertions above guarantee that the buffer is large enough
        // and sufficiently aligned for an `F`, and the buffer is not yet initialized.
        unsafe {
            buffer.as_mut_ptr().cast::<F>().write(target);
        }

        Self {
            buffer,
            vtable: Vtable {
                call: call_target::<F, A, R>,
                clone_into: clone_target::<F>,
                drop_in_place: drop_target::<F>,
                type_name: type_name::<F>,
            },
        }
    }
}

impl<A, R, const CAPACITY: usize> InlineClosure<A, R, CAPACITY> {
    #[inline]
    pub(crate) fn call(&self, args: A) -> R {
        // SAFETY: The buffer holds a live target of the type the vtable was created for.
        unsafe { (self.vtable.call)(self.buffer.as_ptr(), args) }
    }

    /// Name of the erased target type, for diagnostics only.
    pub(crate) fn type_name(&self) -> &'static str {
        (self.vtable.type_name)()
    }
}

impl<A, R, const CAPACITY: usize> Clone for InlineClosure<A, R, CAPACITY> {
    fn clone(&self) -> Self {
        let mut buffer = InlineBuffer::<CAPACITY>::uninit();

        // SAFETY: The source holds a live target of the vtable's type. The destination is a fresh
        // buffer with the same size and alignment as the one the target was originally placed in.
        // If the target's `clone()` panics, the destination stays uninitialized and is never
        // dropped because we never construct `Self` from it.
        unsafe {
            (self.vtable.clone_into)(self.buffer.as_ptr(), buffer.as_mut_ptr());
        }

        Self {
            buffer,
            vtable: self.vtable,
        }
    }
}

impl<A, R, const CAPACITY: usize> Drop for InlineClosure<A, R, CAPACITY> {
    fn drop(&mut self) {
        // SAFETY: The buffer holds a live target of the vtable's type and we never touch it again.
        unsafe {
            (self.vtable.drop_in_place)(self.buffer.as_mut_ptr());
        }
    }
}

// SAFETY: The only constructor requires the target to be `Send`. The vtable only holds function
// pointers, which are always thread-mobile.
unsafe impl<A, R, const CAPACITY: usize> Send for InlineClosure<A, R, CAPACITY> {}

// SAFETY: The only constructor requires the target to be `Sync` and we only ever hand out shared
// references to it (`Fn`, not `FnMut`).
unsafe impl<A, R, const CAPACITY: usize> Sync for InlineClosure<A, R, CAPACITY> {}

/// # Safety
///
/// `target` must point to a live, properly aligned `F`.
unsafe fn call_target<F, A, R>(target: *const (), args: A) -> R
where
    F: Fn(A) -> R,
{
    // SAFETY: Forwarded to caller.
    let target = unsafe { &*target.cast::<F>() };
    target(args)
}

/// # Safety
///
/// `source` must point to a live, properly aligned `F` and `destination` must be valid for an
/// aligned write of an `F`.
unsafe fn clone_target<F>(source: *const (), destination: *mut ())
where
    F: Clone,
{
    // SAFETY: Forwarded to caller.
    let source = unsafe { &*source.cast::<F>() };
    let cloned = source.clone();

    // SAFETY: Forwarded to caller.
    unsafe {
        destination.cast::<F>().write(cloned);
    }
}

/// # Safety
///
/// `target` must point to a live, properly aligned `F` that is not used after this call.
unsafe fn drop_target<F>(target: *mut ()) {
    // SAFETY: Forwarded to caller.
    unsafe {
        ptr::drop_in_place(target.cast::<F>());
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Counts how many times any clone of it has been dropped.
    #[derive(Clone)]
    struct DropCounter {
        drops: Arc<AtomicUsize>,
    }

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn call_reaches_target() {
        let offset = 10_u64;
        let closure = InlineClosure::<u64, u64, 32>::new(move |x| x + offset);

        assert_eq!(closure.call(5), 15);
    }

    #[test]
    fn clone_and_drop_go_through_target_glue() {
        let drops = Arc::new(AtomicUsize::new(0));
        let counter = DropCounter {
            drops: Arc::clone(&drops),
        };

        let closure = InlineClosure::<(), usize, 32>::new(move |()| {
            counter.drops.load(Ordering::Relaxed)
        });
        let cloned = closure.clone();

        // Two live targets share the same counter: the original and the clone, plus our handle.
        assert_eq!(Arc::strong_count(&drops), 3);

        drop(closure);
        assert_eq!(drops.load(Ordering::Relaxed), 1);
        assert_eq!(cloned.call(()), 1);

        drop(cloned);
        assert_eq!(drops.load(Ordering::Relaxed), 2);
        assert_eq!(Arc::strong_count(&drops), 1);
    }

    #[test]
    fn zero_sized_target_fits_zero_capacity() {
        let closure = InlineClosure::<u8, u8, 0>::new(|x: u8| x.wrapping_mul(2));

        assert_eq!(closure.call(21), 42);
    }

    #[test]
    fn target_exactly_at_capacity_fits() {
        let payload = [7_u8; 24];
        let closure = InlineClosure::<usize, u8, 24>::new(move |i: usize| payload[i]);

        assert_eq!(closure.call(23), 7);
    }

    #[test]
    fn type_name_names_the_target() {
        fn double(x: i32) -> i32 {
            x * 2
        }

        let closure = InlineClosure::<i32, i32, 16>::new(double);

        assert!(closure.type_name().contains("double"));
    }

    #[test]
    fn moved_closure_still_works() {
        let text = Arc::new("moved".to_string());
        let closure = InlineClosure::<(), usize, 16>::new(move |()| text.len());

        let boxed = Box::new(closure);
        let unboxed = *boxed;

        assert_eq!(unboxed.call(()), 5);
    }

    /// Generic over argument and return types without any lifetime bounds.
    fn clone_then_call<A: Copy, R, const CAPACITY: usize>(
        closure: &InlineClosure<A, R, CAPACITY>,
        args: A,
    ) -> (R, R) {
        let cloned = closure.clone();
        (closure.call(args), cloned.call(args))
    }

    #[test]
    fn clone_carries_vtable_for_unbounded_types() {
        let factor = 3_i64;
        let closure = InlineClosure::<i64, i64, 16>::new(move |x| x * factor);

        assert_eq!(clone_then_call(&closure, 4), (12, 12));
    }
}
