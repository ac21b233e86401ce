//! ALSA stderr muting.
//!
//! The ALSA library prints harmless configuration warnings to stderr when
//! devices are enumerated or opened, which would corrupt the TUI. Failure to
//! set up the redirect is not an error; the closure then runs with stderr
//! untouched.

/// Runs `f` with stderr redirected to /dev/null.
#[cfg(target_os = "linux")]
pub(crate) fn with_muted_stderr<T>(f: impl FnOnce() -> T) -> T {
    use std::fs::OpenOptions;
    use std::os::unix::io::AsRawFd;

    let Ok(dev_null) = OpenOptions::new().write(true).open("/dev/null") else {
        return f();
    };
    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        return f();
    }
    if unsafe { libc::dup2(dev_null.as_raw_fd(), libc::STDERR_FILENO) } == -1 {
        unsafe { libc::close(old_stderr) };
        return f();
    }

    let result = f();

    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }
    result
}

/// On non-Linux platforms the warnings do not exist; runs `f` directly.
#[cfg(not(target_os = "linux"))]
pub(crate) fn with_muted_stderr<T>(f: impl FnOnce() -> T) -> T {
    f()
}
