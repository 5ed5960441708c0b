//! `afl-locks` is a family of low-level synchronization primitives for
//! Linux, built directly on the kernel's futex wait/wake facility and
//! atomic memory operations rather than on top of the platform's
//! threading library. The design goal is a minimal uncontended fast
//! path — a single CAS, no syscalls, no indirection — while still being
//! correct, deadlock-detecting, and fair to the extent the kernel's wake
//! policy provides.
//!
//! # Primitives
//!
//! - [`SpinLock`] / [`OwnedSpinLock`] — pure user-space busy-wait locks.
//! - [`Mutex`] / [`OwnedMutex`] — blocking mutexes that sleep on the
//!   kernel's futex on the slow path. [`OwnedMutex`] detects self-deadlock
//!   and non-owner unlock.
//! - [`mutex::PiMutex`] (behind the `pi` feature) — delegates blocking to
//!   the kernel's priority-inheritance futex operations.
//! - [`RecursiveMutex`] — an owner-tracked mutex that permits reentrant
//!   acquisition by its current owner.
//! - [`Once`] / [`once::OnceCell`] — run-exactly-once coordination.
//!
//! Everything else a real program needs around these — a compatibility
//! façade for drop-in replacement of a platform's default locks, a small
//! typed error enum, optional trace logging — lives in [`compat`] and
//! [`error`].
//!
//! # Non-goals
//!
//! No reader-writer locks, no condition variables, no semaphores, no
//! barriers, no cross-process sharing (every primitive here is private to
//! one address space), no timed waits, no adaptive hybrid strategies, no
//! fairness guarantees beyond whatever the kernel's wake policy provides.
//!
//! # Target environment
//!
//! Linux (or another OS exposing an ABI-compatible futex syscall), an
//! architecture with a 32-bit atomic CAS and acquire/release ordering,
//! and thread-local storage.

pub mod compat;
pub mod error;
pub mod mutex;
pub mod once;
pub mod platform;
pub mod recursive_mutex;
pub mod spinlock;

pub use error::{LockError, LockResult};
pub use mutex::{Mutex, OwnedMutex};
pub use once::Once;
pub use recursive_mutex::RecursiveMutex;
pub use spinlock::{OwnedSpinLock, SpinLock};

#[cfg(feature = "pi")]
pub use mutex::PiMutex;
