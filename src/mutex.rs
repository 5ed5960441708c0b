//! Blocking mutex family: anonymous, owner-tracked, and (behind the `pi`
//! feature) priority-inheritance. All three share the same state-word
//! encoding: low 30 bits hold a lock token or owner tid, bit 31 is
//! WAITERS.
//!
//! The uncontended fast path is a single CAS and never calls into the
//! kernel. The slow path sets WAITERS, parks via [`platform::futex_wait`],
//! and on wake retries the acquire CAS — preserving WAITERS across the
//! retry so a later unlocker still knows to wake someone.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::error::{LockError, LockResult};
use crate::platform::{self, TID_MASK, WAITERS};

#[cfg(feature = "debug-log")]
macro_rules! trace_lock {
    ($($arg:tt)*) => {
        log::trace!($($arg)*)
    };
}
#[cfg(not(feature = "debug-log"))]
macro_rules! trace_lock {
    ($($arg:tt)*) => {};
}

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;

/// Anonymous mutex: no owner is recorded, so `unlock` performs no check
/// and can be called from any thread.
#[repr(align(64))]
pub struct Mutex {
    state: AtomicU32,
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

impl Mutex {
    /// The static-initializer value: all-zero, unlocked.
    pub const INIT: u32 = UNLOCKED;

    pub const fn new() -> Self {
        Mutex {
            state: AtomicU32::new(UNLOCKED),
        }
    }

    pub fn lock(&self) {
        let state = self.state.load(Ordering::Relaxed);
        if state & WAITERS != 0 {
            return self.lock_contended(state);
        }
        match self.state.compare_exchange(
            UNLOCKED,
            LOCKED,
            Ordering::Acquire,
            Ordering::Relaxed,
        ) {
            Ok(_) => {}
            Err(state) => self.lock_contended(state),
        }
    }

    #[cold]
    fn lock_contended(&self, mut state: u32) {
        trace_lock!("mutex: entering contended path");
        if state & WAITERS == 0 {
            let _ = self.state.compare_exchange(
                LOCKED,
                LOCKED | WAITERS,
                Ordering::Acquire,
                Ordering::Relaxed,
            );
        }
        loop {
            platform::futex_wait(&self.state, LOCKED | WAITERS);
            state = self.state.swap(LOCKED | WAITERS, Ordering::Acquire);
            if state == UNLOCKED {
                return;
            }
        }
    }

    /// Unlocks unconditionally. Calling this on a mutex the caller does
    /// not hold is unspecified behavior.
    pub fn unlock(&self) {
        if self.state.swap(UNLOCKED, Ordering::Release) & WAITERS != 0 {
            trace_lock!("mutex: waking one waiter");
            platform::futex_wake(&self.state, 1);
        }
    }

    pub fn destroy(&self) {
        self.state.store(UNLOCKED, Ordering::Release);
    }
}

/// Owner-tracked mutex: the locked encoding is the caller's fast thread
/// id, enabling deadlock detection and a non-owner-unlock check (spec
/// §4.4).
#[repr(align(64))]
pub struct OwnedMutex {
    state: AtomicU32,
}

impl Default for OwnedMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl OwnedMutex {
    pub const INIT: u32 = UNLOCKED;

    pub const fn new() -> Self {
        OwnedMutex {
            state: AtomicU32::new(UNLOCKED),
        }
    }

    /// Acquires the lock for the calling thread.
    ///
    /// # Errors
    /// Returns [`LockError::AlreadyOwned`] if the caller already holds
    /// this mutex.
    pub fn lock(&self) -> LockResult {
        let tid = platform::fast_tid();
        let state = self.state.load(Ordering::Relaxed);
        if state & TID_MASK == tid {
            return Err(LockError::AlreadyOwned);
        }
        if state == UNLOCKED {
            if self
                .state
                .compare_exchange(UNLOCKED, tid, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return Ok(());
            }
        }
        self.lock_contended(tid);
        Ok(())
    }

    #[cold]
    fn lock_contended(&self, tid: u32) {
        trace_lock!("owned mutex: entering contended path");
        loop {
            let mut state = self.state.load(Ordering::Relaxed);
            if state & WAITERS == 0 {
                state = self.state.fetch_or(WAITERS, Ordering::Acquire) | WAITERS;
                if state == WAITERS
                    && self
                        .state
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
            platform::futex_wait(&self.state, state);
            if self
                .state
                .compare_exchange(
                    UNLOCKED,
                    tid | WAITERS,
                    Ordering::Acquire,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                return;
            }
        }
    }

    /// Releases the lock.
    ///
    /// # Errors
    /// Returns [`LockError::NotOwner`] if the caller does not hold this
    /// mutex.
    pub fn unlock(&self) -> LockResult {
        let tid = platform::fast_tid();
        let state = self.state.load(Ordering::Relaxed);
        if state & TID_MASK != tid {
            return Err(LockError::NotOwner);
        }
        if self.state.swap(UNLOCKED, Ordering::Release) & WAITERS != 0 {
            trace_lock!("owned mutex: waking one waiter");
            platform::futex_wake(&self.state, 1);
        }
        Ok(())
    }

    pub fn destroy(&self) {
        self.state.store(UNLOCKED, Ordering::Release);
    }
}

/// Priority-inheritance mutex: delegates blocking to the kernel's PI
/// futex operations, using the kernel's authoritative thread id rather
/// than the fast one because `FUTEX_LOCK_PI` requires that exact
/// encoding.
#[cfg(feature = "pi")]
#[repr(align(64))]
pub struct PiMutex {
    state: AtomicU32,
}

#[cfg(feature = "pi")]
impl Default for PiMutex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "pi")]
impl PiMutex {
    pub const INIT: u32 = UNLOCKED;

    pub const fn new() -> Self {
        PiMutex {
            state: AtomicU32::new(UNLOCKED),
        }
    }

    /// Acquires the lock, arranging priority inheritance with the kernel
    /// if the fast path is contended.
    ///
    /// # Errors
    /// Returns [`LockError::AlreadyOwned`] if the caller already holds
    /// this mutex. This check happens before any kernel call.
    pub fn lock(&self) -> LockResult {
        let tid = platform::kernel_tid();
        let state = self.state.load(Ordering::Relaxed);
        if state & TID_MASK == tid {
            return Err(LockError::AlreadyOwned);
        }
        if self
            .state
            .compare_exchange(UNLOCKED, tid, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            trace_lock!("pi mutex: entering FUTEX_LOCK_PI");
            platform::futex_lock_pi(&self.state);
        }
        Ok(())
    }

    /// Releases the lock.
    ///
    /// # Errors
    /// Returns [`LockError::NotOwner`] if the caller does not hold this
    /// mutex.
    pub fn unlock(&self) -> LockResult {
        let tid = platform::kernel_tid();
        let state = self.state.load(Ordering::Relaxed);
        if state & TID_MASK != tid {
            return Err(LockError::NotOwner);
        }
        // If the word still equals our tid, clear it ourselves; any
        // other outcome (a waiter present, or kernel-managed encoding)
        // is the kernel's job.
        if self
            .state
            .compare_exchange(tid, UNLOCKED, Ordering::Release, Ordering::Relaxed)
            .is_err()
        {
            trace_lock!("pi mutex: entering FUTEX_UNLOCK_PI");
            platform::futex_unlock_pi(&self.state);
        }
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
        let m = Mutex::new();
        m.lock();
        m.unlock();
        assert_eq!(m.state.load(Ordering::SeqCst), UNLOCKED);
    }

    #[test]
    fn owned_already_owned_detection() {
        let m = OwnedMutex::new();
        m.lock().unwrap();
        assert_eq!(m.lock(), Err(LockError::AlreadyOwned));
        m.unlock().unwrap();
    }

    #[test]
    fn owned_not_owner_unlock_then_owner_succeeds() {
        let m = OwnedMutex::new();
        m.lock().unwrap();
        std::thread::scope(|scope| {
            let result = scope.spawn(|| m.unlock()).join().unwrap();
            assert_eq!(result, Err(LockError::NotOwner));
        });
        m.unlock().unwrap();
    }

    #[test]
    fn owned_round_trip_returns_to_zero() {
        let m = OwnedMutex::new();
        m.lock().unwrap();
        m.unlock().unwrap();
        assert_eq!(m.state.load(Ordering::SeqCst), UNLOCKED);
    }
}
