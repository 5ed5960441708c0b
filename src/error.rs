//! A small error taxonomy, as a typed enum rather than the original's
//! bare `int`. Every operation that can fail returns one of these; on
//! error the primitive's state word is left exactly as it was on entry.

use core::fmt;

/// Failure kinds an owner-aware primitive can report.
///
/// `#[non_exhaustive]` because a future primitive variant (e.g. a timed
/// wait, should one ever be added above this layer) might need a new
/// kind, and matching on this enum outside the crate should not need to
/// be revisited for that.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockError {
    /// An owner-tracked acquisition detected that the caller already
    /// holds the lock and refused to deadlock.
    AlreadyOwned,
    /// `unlock` was invoked by a thread that does not hold the lock.
    NotOwner,
    /// A recursive mutex's reentry counter would overflow on this
    /// acquisition.
    TooManyReentries,
}

impl LockError {
    /// The legacy C-style status code this error maps to, for
    /// collaborators going through the [`crate::compat`] façade.
    pub fn code(self) -> i32 {
        match self {
            LockError::AlreadyOwned => libc_edeadlock(),
            LockError::NotOwner => libc_eperm(),
            LockError::TooManyReentries => libc_eagain(),
        }
    }
}

impl fmt::Display for LockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            LockError::AlreadyOwned => "lock already owned by the calling thread",
            LockError::NotOwner => "unlock called by a thread that does not hold the lock",
            LockError::TooManyReentries => "recursive mutex reentry count would overflow",
        };
        f.write_str(msg)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LockError {}

#[cfg(target_os = "linux")]
fn libc_edeadlock() -> i32 {
    libc::EDEADLK
}
#[cfg(target_os = "linux")]
fn libc_eperm() -> i32 {
    libc::EPERM
}
#[cfg(target_os = "linux")]
fn libc_eagain() -> i32 {
    libc::EAGAIN
}

/// Result alias used throughout the crate: `Ok(())` denotes success;
/// `Err(LockError)` carries the specific failure kind.
pub type LockResult = Result<(), LockError>;
