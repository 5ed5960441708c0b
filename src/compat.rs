//! Compatibility façade: a thin layer shaped like the original C
//! library's `WINE_MUTEX_*` macros, returning legacy `i32` status codes
//! instead of a typed `Result`. This is the seam a host program's own
//! macro layer would target to swap this crate in for a platform's
//! default threading library.
//!
//! Every type re-exported here is trivially zero-initializable, except
//! [`crate::RecursiveMutex`] which needs `init()` for its count field
//! the same way the original does.

pub use crate::mutex::Mutex;
pub use crate::once::Once;
pub use crate::recursive_mutex::RecursiveMutex;
pub use crate::spinlock::SpinLock;

/// `0` on success; see [`code_of`] for the non-zero mapping.
pub type CompatCode = i32;

const SUCCESS: CompatCode = 0;

fn code_of(result: crate::error::LockResult) -> CompatCode {
    match result {
        Ok(()) => SUCCESS,
        Err(e) => e.code(),
    }
}

/// `WINE_SPIN_INIT` / `afl_spin_init`.
#[inline]
pub fn spin_init(lock: &SpinLock, shared: bool) -> CompatCode {
    lock.init(shared);
    SUCCESS
}

/// `WINE_SPIN_LOCK` / `afl_spin_lock`.
#[inline]
pub fn spin_lock(lock: &SpinLock) -> CompatCode {
    lock.lock();
    SUCCESS
}

/// `WINE_SPIN_UNLOCK` / `afl_spin_unlock`.
#[inline]
pub fn spin_unlock(lock: &SpinLock) -> CompatCode {
    lock.unlock();
    SUCCESS
}

/// `WINE_SPIN_DESTROY` / `afl_spin_destroy`.
#[inline]
pub fn spin_destroy(lock: &SpinLock) -> CompatCode {
    lock.destroy();
    SUCCESS
}

/// `WINE_MUTEX_INIT` / `AFL_MUTEX_INIT`.
pub const MUTEX_INIT: u32 = Mutex::INIT;

/// `WINE_MUTEX_LOCK` / `afl_mutex_lock`.
#[inline]
pub fn mutex_lock(mutex: &Mutex) -> CompatCode {
    mutex.lock();
    SUCCESS
}

/// `WINE_MUTEX_UNLOCK` / `afl_mutex_unlock`.
#[inline]
pub fn mutex_unlock(mutex: &Mutex) -> CompatCode {
    mutex.unlock();
    SUCCESS
}

/// `WINE_MUTEX_DESTROY` / `afl_mutex_destroy`.
#[inline]
pub fn mutex_destroy(mutex: &Mutex) -> CompatCode {
    mutex.destroy();
    SUCCESS
}

/// `WINE_MUTEX_RECURSIVE_INIT` / `afl_mutex_recursive_init`.
#[inline]
pub fn mutex_recursive_init(mutex: &RecursiveMutex) -> CompatCode {
    mutex.init();
    SUCCESS
}

/// `WINE_MUTEX_RECURSIVE_LOCK` / `afl_mutex_recursive_lock`.
#[inline]
pub fn mutex_recursive_lock(mutex: &RecursiveMutex) -> CompatCode {
    code_of(mutex.lock())
}

/// `WINE_MUTEX_RECURSIVE_UNLOCK` / `afl_mutex_recursive_unlock`.
#[inline]
pub fn mutex_recursive_unlock(mutex: &RecursiveMutex) -> CompatCode {
    code_of(mutex.unlock())
}

/// `WINE_MUTEX_RECURSIVE_DESTROY` / `afl_mutex_recursive_destroy`.
#[inline]
pub fn mutex_recursive_destroy(mutex: &RecursiveMutex) -> CompatCode {
    mutex.destroy();
    SUCCESS
}

/// `WINE_ONCE_INIT` / `AFL_ONCE_INIT`.
pub const ONCE_INIT: u32 = Once::INIT;

/// `WINE_ONCE` / `afl_once`.
#[inline]
pub fn once(once: &Once, init: impl FnOnce()) -> CompatCode {
    once.call_once(init);
    SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spin_round_trip_returns_success() {
        let lock = SpinLock::new();
        assert_eq!(spin_lock(&lock), SUCCESS);
        assert_eq!(spin_unlock(&lock), SUCCESS);
    }

    #[test]
    fn mutex_round_trip_returns_success() {
        let mutex = Mutex::new();
        assert_eq!(mutex_lock(&mutex), SUCCESS);
        assert_eq!(mutex_unlock(&mutex), SUCCESS);
    }

    #[test]
    fn once_runs_initializer() {
        let once_lock = Once::new();
        let mut ran = false;
        assert_eq!(compat_once_helper(&once_lock, &mut ran), SUCCESS);
        assert!(ran);
    }

    fn compat_once_helper(o: &Once, ran: &mut bool) -> CompatCode {
        once(o, || *ran = true)
    }
}
