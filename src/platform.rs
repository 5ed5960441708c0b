//! Thread identity, spin hints, and the raw futex syscalls the lock
//! primitives are built on. Nothing in this module allocates or can
//! itself block except [`futex_wait`] and [`futex_lock_pi`].

use core::cell::Cell;
use core::ptr;
use core::sync::atomic::{compiler_fence, AtomicU32, Ordering};

/// Mask applied to a raw thread identifier to fit it in the low 30 bits of
/// a lock word. See §3/§9 of the design notes: truncation is safe because
/// thread-pointer-derived values are address-like and no process runs
/// anywhere near `2^30` live threads.
pub const TID_MASK: u32 = 0x3FFF_FFFF;

/// High bit of a mutex/once state word: at least one thread is, was, or is
/// about to be parked in the kernel on this word.
pub const WAITERS: u32 = 0x8000_0000;

std::thread_local! {
    static FAST_TID: Cell<u32> = Cell::new(0);
}
#[cfg(feature = "pi")]
std::thread_local! {
    static KERNEL_TID: Cell<u32> = Cell::new(0);
}

/// A fast, process-scoped thread identifier derived from the address of a
/// thread-local cell. Cheap: no syscall, cached for the thread's lifetime.
/// Unique among live threads in one address space with overwhelming
/// probability, same assumption the thread-pointer-register source makes.
#[inline]
pub fn fast_tid() -> u32 {
    FAST_TID.with(|cell| {
        let cached = cell.get();
        if cached != 0 {
            return cached;
        }
        let addr = cell as *const Cell<u32> as usize;
        let id = ((addr >> 3) as u32 & TID_MASK).max(1);
        cell.set(id);
        id
    })
}

/// The kernel's authoritative thread id, required only by the
/// priority-inheritance mutex because `FUTEX_LOCK_PI` needs this exact
/// encoding. Cached in TLS the same way [`fast_tid`] is.
#[cfg(feature = "pi")]
#[inline]
pub fn kernel_tid() -> u32 {
    KERNEL_TID.with(|cell| {
        let cached = cell.get();
        if cached != 0 {
            return cached;
        }
        let id = unsafe { libc::syscall(libc::SYS_gettid) as u32 } & TID_MASK;
        cell.set(id);
        id
    })
}

/// CPU-pause hint for spin loops. Falls back to a scheduler yield on
/// architectures without a dedicated instruction.
#[inline(always)]
pub fn pause() {
    core::hint::spin_loop();
}

/// Compiler-only memory barrier: prevents reordering across this point
/// without emitting any instruction.
#[inline(always)]
pub fn compiler_barrier() {
    compiler_fence(Ordering::SeqCst);
}

/// Block the calling thread until woken, as long as `word` still equals
/// `expected`. May return spuriously. Private to this address space.
#[inline]
pub fn futex_wait(word: &AtomicU32, expected: u32) {
    let ptr = word as *const AtomicU32 as *mut libc::c_int;
    let r = unsafe {
        libc::syscall(
            libc::SYS_futex,
            ptr,
            libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
            expected as libc::c_int,
            ptr::null::<libc::timespec>(),
            ptr::null_mut::<libc::c_void>(),
            0,
        )
    };
    debug_assert!(r == 0 || r == -1);
}

/// Wake up to `max` threads waiting on `word`. Pass `u32::MAX` to wake all.
#[inline]
pub fn futex_wake(word: &AtomicU32, max: u32) -> usize {
    let ptr = word as *const AtomicU32 as *mut libc::c_int;
    let count = if max >= i32::max_value() as u32 {
        i32::max_value()
    } else {
        max as i32
    };
    let r = unsafe {
        libc::syscall(
            libc::SYS_futex,
            ptr,
            libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
            count,
            ptr::null::<libc::timespec>(),
            ptr::null_mut::<libc::c_void>(),
            0,
        )
    };
    debug_assert!(r >= 0);
    r.max(0) as usize
}

/// Block the calling thread in the kernel, which also arranges priority
/// inheritance from the eventual unlocker. On success `word` has been
/// written to the caller's kernel tid by the kernel itself.
#[cfg(feature = "pi")]
#[inline]
pub fn futex_lock_pi(word: &AtomicU32) {
    let ptr = word as *const AtomicU32 as *mut libc::c_int;
    let r = unsafe {
        libc::syscall(
            libc::SYS_futex,
            ptr,
            libc::FUTEX_LOCK_PI | libc::FUTEX_PRIVATE_FLAG,
            0,
            ptr::null::<libc::timespec>(),
            ptr::null_mut::<libc::c_void>(),
            0,
        )
    };
    debug_assert!(r == 0, "futex_lock_pi failed: {}", r);
}

/// Ask the kernel to hand the lock to the next PI waiter, or clear it if
/// there is none. Used when the fast-path CAS back to unlocked fails.
#[cfg(feature = "pi")]
#[inline]
pub fn futex_unlock_pi(word: &AtomicU32) {
    let ptr = word as *const AtomicU32 as *mut libc::c_int;
    let r = unsafe {
        libc::syscall(
            libc::SYS_futex,
            ptr,
            libc::FUTEX_UNLOCK_PI | libc::FUTEX_PRIVATE_FLAG,
            0,
            ptr::null::<libc::timespec>(),
            ptr::null_mut::<libc::c_void>(),
            0,
        )
    };
    debug_assert!(r == 0, "futex_unlock_pi failed: {}", r);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_tid_is_stable_and_nonzero() {
        let a = fast_tid();
        let b = fast_tid();
        assert_eq!(a, b);
        assert_ne!(a, 0);
        assert_eq!(a & !TID_MASK, 0);
    }

    #[test]
    fn fast_tid_differs_across_threads() {
        let main_id = fast_tid();
        let other_id = std::thread::spawn(fast_tid).join().unwrap();
        assert_ne!(main_id, other_id);
    }
}
