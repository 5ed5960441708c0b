//! Pure user-space busy-wait lock. Never enters the kernel; a thread may
//! be starved indefinitely under contention. That is an explicit trade
//! for the lowest possible uncontended cost.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::error::{LockError, LockResult};
use crate::platform::{self, TID_MASK};

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;

/// Anonymous spinlock: `0` unlocked, `1` locked. No owner is recorded, so
/// `unlock` performs no check and may be called from any thread.
#[repr(align(64))]
pub struct SpinLock {
    state: AtomicU32,
}

impl Default for SpinLock {
    fn default() -> Self {
        Self::new()
    }
}

impl SpinLock {
    /// Creates an unlocked spinlock. Provided for API symmetry with the
    /// other primitives; spinlocks are otherwise zero-initializable.
    pub const fn new() -> Self {
        SpinLock {
            state: AtomicU32::new(UNLOCKED),
        }
    }

    /// Re-initializes the lock to the unlocked state. The `shared`
    /// argument exists only for ABI symmetry with the original's
    /// `afl_spin_init`; all locks here are private to the address space.
    pub fn init(&self, _shared: bool) {
        self.state.store(UNLOCKED, Ordering::Release);
    }

    /// Spins until the lock is acquired.
    pub fn lock(&self) {
        if self.state.swap(LOCKED, Ordering::Acquire) == UNLOCKED {
            return;
        }
        self.lock_slow();
    }

    #[cold]
    fn lock_slow(&self) {
        loop {
            platform::pause();
            if self.state.swap(LOCKED, Ordering::Acquire) == UNLOCKED {
                return;
            }
        }
    }

    /// Unlocks unconditionally. Calling this on a lock the caller does
    /// not hold is unspecified behavior.
    pub fn unlock(&self) {
        self.state.store(UNLOCKED, Ordering::Release);
    }

    /// Zeroes the state word. The caller must ensure no thread still
    /// holds or awaits this lock.
    pub fn destroy(&self) {
        self.state.store(UNLOCKED, Ordering::Release);
    }
}

/// Owner-tracking spinlock: the state word holds the owner's fast thread
/// id instead of a constant `1`, which lets `lock`/`unlock` detect
/// self-deadlock and non-owner unlock.
#[repr(align(64))]
pub struct OwnedSpinLock {
    state: AtomicU32,
}

impl Default for OwnedSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

impl OwnedSpinLock {
    pub const fn new() -> Self {
        OwnedSpinLock {
            state: AtomicU32::new(UNLOCKED),
        }
    }

    pub fn init(&self, _shared: bool) {
        self.state.store(UNLOCKED, Ordering::Release);
    }

    /// Spins until the lock is acquired by the calling thread.
    ///
    /// # Errors
    /// Returns [`LockError::AlreadyOwned`] if the caller already holds
    /// this lock; the state word is left untouched in that case.
    pub fn lock(&self) -> LockResult {
        let tid = platform::fast_tid();
        let current = self.state.load(Ordering::Relaxed);
        if current & TID_MASK == tid {
            return Err(LockError::AlreadyOwned);
        }
        let mut expected = UNLOCKED;
        loop {
            match self
                .state
                .compare_exchange_weak(expected, tid, Ordering::Acquire, Ordering::Relaxed)
            {
                Ok(_) => return Ok(()),
                Err(_) => {
                    platform::pause();
                    expected = UNLOCKED;
                }
            }
        }
    }

    /// Releases the lock.
    ///
    /// # Errors
    /// Returns [`LockError::NotOwner`] if the calling thread is not the
    /// current owner; the state word is left untouched in that case.
    pub fn unlock(&self) -> LockResult {
        let tid = platform::fast_tid();
        let current = self.state.load(Ordering::Relaxed);
        if current & TID_MASK != tid {
            return Err(LockError::NotOwner);
        }
        self.state.store(UNLOCKED, Ordering::Release);
        Ok(())
    }

    pub fn destroy(&self) {
        self.state.store(UNLOCKED, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncontended_round_trip_returns_to_zero() {
        let lock = SpinLock::new();
        lock.lock();
        lock.unlock();
        assert_eq!(lock.state.load(Ordering::SeqCst), UNLOCKED);
    }

    #[test]
    fn owned_already_owned_detection() {
        let lock = OwnedSpinLock::new();
        lock.lock().unwrap();
        assert_eq!(lock.lock(), Err(LockError::AlreadyOwned));
        lock.unlock().unwrap();
    }

    #[test]
    fn owned_not_owner_unlock() {
        let lock = OwnedSpinLock::new();
        lock.lock().unwrap();
        std::thread::scope(|scope| {
            let result = scope.spawn(|| lock.unlock()).join().unwrap();
            assert_eq!(result, Err(LockError::NotOwner));
        });
        lock.unlock().unwrap();
    }

    #[test]
    fn owned_round_trip_returns_to_zero() {
        let lock = OwnedSpinLock::new();
        lock.lock().unwrap();
        lock.unlock().unwrap();
        assert_eq!(lock.state.load(Ordering::SeqCst), UNLOCKED);
    }
}
