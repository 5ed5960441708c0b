//! Recursive mutex: an owner-tracked mutex plus a reentry counter. The
//! current owner may re-acquire; release must be balanced.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::error::{LockError, LockResult};
use crate::platform::{self, TID_MASK, WAITERS};

#[cfg(feature = "debug-log")]
macro_rules! trace_recursive {
    ($($arg:tt)*) => {
        log::trace!($($arg)*)
    };
}
#[cfg(not(feature = "debug-log"))]
macro_rules! trace_recursive {
    ($($arg:tt)*) => {};
}

const UNLOCKED: u32 = 0;

/// `lock` is the owner-tracked state word; `count` is the reentry
/// depth, meaningful only while `lock`'s owner bits match the current
/// thread (an invariant established before `count` is ever touched, so
/// plain `UnsafeCell` access is sound without its own atomic — the same
/// reasoning applies as for any `UnsafeCell<pthread_mutex_t>`-style
/// state cell guarded by an outer atomic).
#[repr(align(64))]
pub struct RecursiveMutex {
    lock: AtomicU32,
    count: UnsafeCell<usize>,
}

// SAFETY: `count` is only read or written while the calling thread has
// established (via `lock`'s atomic state) that it is the sole owner.
unsafe impl Sync for RecursiveMutex {}

impl Default for RecursiveMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl RecursiveMutex {
    pub const fn new() -> Self {
        RecursiveMutex {
            lock: AtomicU32::new(UNLOCKED),
            count: UnsafeCell::new(0),
        }
    }

    /// Re-initializes the mutex to the unlocked, zero-count state.
    pub fn init(&self) {
        self.lock.store(UNLOCKED, Ordering::Release);
        unsafe { *self.count.get() = 0 };
    }

    /// Acquires the lock, or increments the reentry count if the caller
    /// already holds it.
    ///
    /// # Errors
    /// Returns [`LockError::TooManyReentries`] if incrementing the
    /// reentry count would overflow `usize`.
    pub fn lock(&self) -> LockResult {
        let tid = platform::fast_tid();
        let state = self.lock.load(Ordering::Relaxed);

        if state == UNLOCKED
            && self
                .lock
                .compare_exchange(UNLOCKED, tid, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
        {
            unsafe { *self.count.get() = 1 };
            return Ok(());
        }

        if state & TID_MASK == tid {
            let count = unsafe { &mut *self.count.get() };
            let next = count.checked_add(1);
            match next {
                Some(next) => {
                    *count = next;
                    return Ok(());
                }
                None => return Err(LockError::TooManyReentries),
            }
        }

        self.lock_contended(tid);
        unsafe { *self.count.get() = 1 };
        Ok(())
    }

    #[cold]
    fn lock_contended(&self, tid: u32) {
        trace_recursive!("recursive mutex: entering contended path");
        loop {
            let mut state = self.lock.load(Ordering::Relaxed);
            if state & WAITERS == 0 {
                state = self.lock.fetch_or(WAITERS, Ordering::Acquire) | WAITERS;
                if state == WAITERS
                    && self
                        .lock
                        .compare_exchange(
                            WAITERS,
                            tid | WAITERS,
                            Ordering::Acquire,
                            Ordering::Relaxed,
                        )
                        .is_ok()
                {
                    return;
                }
            }
            platform::futex_wait(&self.lock, state);
            if self
                .lock
                .compare_exchange(UNLOCKED, tid | WAITERS, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return;
            }
        }
    }

    /// Releases one level of nesting. Only on the outermost release does
    /// the lock word actually clear and (if there were waiters) wake one.
    ///
    /// # Errors
    /// Returns [`LockError::NotOwner`] if the caller does not hold this
    /// mutex.
    pub fn unlock(&self) -> LockResult {
        let tid = platform::fast_tid();
        let state = self.lock.load(Ordering::Relaxed);
        if state & TID_MASK != tid {
            return Err(LockError::NotOwner);
        }

        let count = unsafe { &mut *self.count.get() };
        *count -= 1;
        if *count != 0 {
            return Ok(());
        }

        if self.lock.swap(UNLOCKED, Ordering::Release) & WAITERS != 0 {
            trace_recursive!("recursive mutex: waking one waiter");
            platform::futex_wake(&self.lock, 1);
        }
        Ok(())
    }

    pub fn destroy(&self) {
        self.lock.store(UNLOCKED, Ordering::Release);
        unsafe { *self.count.get() = 0 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reentrant_lock_balances_to_zero() {
        let m = RecursiveMutex::new();
        for _ in 0..20 {
            m.lock().unwrap();
        }
        for _ in 0..20 {
            m.unlock().unwrap();
        }
        assert_eq!(m.lock.load(Ordering::SeqCst), UNLOCKED);
        assert_eq!(unsafe { *m.count.get() }, 0);
    }

    #[test]
    fn not_owner_unlock_is_rejected() {
        let m = RecursiveMutex::new();
        m.lock().unwrap();
        std::thread::scope(|scope| {
            let result = scope.spawn(|| m.unlock()).join().unwrap();
            assert_eq!(result, Err(LockError::NotOwner));
        });
        m.unlock().unwrap();
    }

    #[test]
    fn reentry_overflow_is_rejected() {
        let m = RecursiveMutex::new();
        m.lock().unwrap();
        unsafe { *m.count.get() = usize::MAX };
        assert_eq!(m.lock(), Err(LockError::TooManyReentries));
        unsafe { *m.count.get() = 1 };
        m.unlock().unwrap();
    }

    #[test]
    fn count_tracks_outstanding_acquisitions() {
        let m = RecursiveMutex::new();
        m.lock().unwrap();
        assert_eq!(unsafe { *m.count.get() }, 1);
        m.lock().unwrap();
        assert_eq!(unsafe { *m.count.get() }, 2);
        m.unlock().unwrap();
        assert_eq!(unsafe { *m.count.get() }, 1);
        m.unlock().unwrap();
    }
}
