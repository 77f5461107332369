use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_utils::Backoff;

/// A mutex that never parks the waiting thread.
///
/// Waiters spin with exponential backoff (eventually yielding to the OS scheduler) until the
/// holder releases the lock. This keeps lock and unlock free of system calls, which suits the
/// fixed-capacity dispatcher: every critical section is a handful of slot reads or writes and
/// never runs a handler.
pub(crate) struct SpinLock<T> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

// SAFETY: `SpinLock` is Send if T is Send, because it owns the T.
unsafe impl<T: Send> Send for SpinLock<T> {}

// SAFETY: `SpinLock` is Sync if T is Send, because it allows multiple threads to access T
// (via lock), but only one at a time.
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    pub(crate) const fn new(data: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }

    #[inline]
    pub(crate) fn lock(&self) -> SpinLockGuard<'_, T> {
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            self.lock_slow();
        }

        SpinLockGuard { lock: self }
    }

    #[cold]
    fn lock_slow(&self) {
        let backoff = Backoff::new();

        loop {
            // Wait with plain loads until the lock looks free, to keep the cache line shared.
            while self.locked.load(Ordering::Relaxed) {
                backoff.snooze();
            }

            if self
                .locked
                .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return;
            }

            backoff.spin();
        }
    }

    #[inline]
    fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }
}

impl<T> fmt::Debug for SpinLock<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpinLock")
            .field("locked", &self.locked.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

pub(crate) struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
}

impl<T> Deref for SpinLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: We hold the lock, so nobody else has access to the data.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: We hold the lock and `&mut self` guarantees this is the only guard borrow.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

impl<T> fmt::Debug for SpinLockGuard<'_, T> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpinLockGuard").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(SpinLock<Vec<u8>>: Send, Sync);
    assert_not_impl_any!(SpinLock<std::rc::Rc<u8>>: Send, Sync);

    #[test]
    fn lock_gives_exclusive_access() {
        let lock = SpinLock::new(0);

        {
            let mut guard = lock.lock();
            *guard += 1;
            assert!(lock.locked.load(Ordering::Relaxed));
        }

        assert!(!lock.locked.load(Ordering::Relaxed));
        assert_eq!(*lock.lock(), 1);
    }

    #[test]
    #[cfg_attr(miri, ignore)] // Too slow under Miri.
    fn contended_increments_are_not_lost() {
        testing::with_watchdog(|| {
            let lock = Arc::new(SpinLock::new(0_usize));

            let threads = (0..8)
                .map(|_| {
                    let lock = Arc::clone(&lock);
                    thread::spawn(move || {
                        for _ in 0..1000 {
                            *lock.lock() += 1;
                        }
                    })
                })
                .collect::<Vec<_>>();

            for thread in threads {
                thread.join().unwrap();
            }

            assert_eq!(*lock.lock(), 8000);
        });
    }
}
