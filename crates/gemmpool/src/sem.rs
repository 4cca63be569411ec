use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Condvar, Mutex};

/// Counting semaphore with a lock-free fast path.
///
/// `permits` may go negative; a negative value is the number of parked
/// waiters. The mutex/condvar pair only comes into play when a waiter has
/// to sleep, so the uncontended try/post paths are a single atomic op.
///
/// Queue consumers treat a permit as a wakeup hint, not as ownership of a
/// task: stealers drain permits best-effort, so the count may briefly
/// over-report occupancy. Holders of a permit therefore always re-test the
/// queue before claiming a slot.
#[derive(Debug)]
pub(crate) struct Semaphore {
    permits: AtomicI64,
    wakeups: Mutex<u64>,
    wakeup_cv: Condvar,
}

impl Semaphore {
    pub(crate) fn new() -> Self {
        Self {
            permits: AtomicI64::new(0),
            wakeups: Mutex::new(0),
            wakeup_cv: Condvar::new(),
        }
    }

    /// Takes one permit without blocking. Fails when none are available.
    pub(crate) fn try_acquire(&self) -> bool {
        let mut current = self.permits.load(Ordering::Relaxed);
        loop {
            if current <= 0 {
                return false;
            }
            match self.permits.compare_exchange_weak(
                current,
                current - 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    /// Takes one permit, sleeping until one is posted.
    pub(crate) fn acquire(&self) {
        let prev = self.permits.fetch_sub(1, Ordering::Acquire);
        if prev > 0 {
            return;
        }
        // Registered as a waiter; sleep until a post transfers a wakeup.
        let mut wakeups = self.wakeups.lock().unwrap();
        while *wakeups == 0 {
            wakeups = self.wakeup_cv.wait(wakeups).unwrap();
        }
        *wakeups -= 1;
    }

    /// Adds one permit, waking a sleeper if one is parked.
    pub(crate) fn post(&self) {
        let prev = self.permits.fetch_add(1, Ordering::Release);
        if prev < 0 {
            let mut wakeups = self.wakeups.lock().unwrap();
            *wakeups += 1;
            self.wakeup_cv.notify_one();
        }
    }
}
