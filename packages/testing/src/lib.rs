#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for tests, benchmarks and examples of the signal dispatch packages.

use std::fmt;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

/// Runs a test on a separate thread and fails it if it does not finish in time.
///
/// Concurrency tests that deadlock would otherwise hang the whole test run. The limit is 10
/// seconds, or 60 seconds under Miri where synchronization is much slower.
///
/// When the `MUTATION_TESTING` environment variable is set to "1", the test function is executed
/// directly on the calling thread so that mutation testing can detect mutations that hang.
///
/// # Panics
///
/// Panics if the test exceeds the time limit, or resumes the panic of the test if it panicked.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// let answer = with_watchdog(|| 6 * 7);
/// assert_eq!(answer, 42);
/// ```
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if std::env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return test_fn();
    }

    let timeout = if cfg!(miri) {
        Duration::from_secs(60)
    } else {
        Duration::from_secs(10)
    };

    let (tx, rx) = mpsc::channel();

    let test_thread = thread::spawn(move || {
        // If this fails, the watchdog has already given up on us.
        drop(tx.send(test_fn()));
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            test_thread
                .join()
                .expect("test thread already delivered its result, so it cannot have panicked");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test exceeded the {timeout:?} watchdog limit");
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match test_thread.join() {
            Ok(()) => panic!("test thread exited without delivering a result"),
            Err(payload) => std::panic::resume_unwind(payload),
        },
    }
}

/// Records values in the order handlers produce them, for asserting on invocation order.
///
/// Clones share the same record, so one clone can be moved into each handler while the test keeps
/// another to inspect.
///
/// # Example
///
/// ```rust
/// use testing::Recorder;
///
/// let recorder = Recorder::new();
///
/// let handler = {
///     let recorder = recorder.clone();
///     move |value: u32| recorder.record(value)
/// };
///
/// handler(1);
/// handler(2);
///
/// assert_eq!(recorder.take(), [1, 2]);
/// assert!(recorder.is_empty());
/// ```
pub struct Recorder<T> {
    entries: Arc<Mutex<Vec<T>>>,
}

impl<T> Recorder<T> {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Appends a value to the record.
    pub fn record(&self, value: T) {
        self.entries.lock().push(value);
    }

    /// Removes and returns everything recorded so far.
    #[must_use]
    pub fn take(&self) -> Vec<T> {
        std::mem::take(&mut *self.entries.lock())
    }

    /// Number of values recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing has been recorded since creation or the last [`take()`][Self::take].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<T: Clone> Recorder<T> {
    /// A copy of everything recorded so far, leaving the record intact.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.entries.lock().clone()
    }
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Recorder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("entries", &*self.entries.lock())
            .finish()
    }
}
