//! Access to the thread's OS error code and its description.

use std::io;

/// Returns the platform description of an error number.
///
/// This is the text `io::Error` prints, without its trailing ` (os error N)`.
#[must_use]
pub fn strerror(errno: i32) -> String {
    let text = io::Error::from_raw_os_error(errno).to_string();
    let suffix = format!(" (os error {errno})");
    match text.strip_suffix(&suffix) {
        Some(stripped) => stripped.to_owned(),
        None => text,
    }
}

/// Returns the calling thread's last OS error code without touching it.
#[must_use]
pub fn peek_last_errno() -> i32 {
    io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

/// Returns the calling thread's last OS error code and resets it to zero.
///
/// Resetting keeps a later failure that does not set the code from reporting a
/// stale one.
#[must_use]
pub fn take_last_errno() -> i32 {
    let errno = peek_last_errno();
    clear_errno();
    errno
}

#[cfg(any(target_os = "linux", target_os = "emscripten"))]
fn clear_errno() {
    // SAFETY: `__errno_location` returns a valid pointer to the calling thread's errno.
    unsafe { *libc::__errno_location() = 0 };
}

#[cfg(target_os = "android")]
fn clear_errno() {
    // SAFETY: `__errno` returns a valid pointer to the calling thread's errno.
    unsafe { *libc::__errno() = 0 };
}

#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
fn clear_errno() {
    // SAFETY: `__error` returns a valid pointer to the calling thread's errno.
    unsafe { *libc::__error() = 0 };
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "emscripten",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd"
)))]
fn clear_errno() {}
