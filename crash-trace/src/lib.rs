//! Prints a symbolized stack trace to stderr when the process hits a fatal
//! condition, then terminates it.
//!
//! Two kinds of fatal condition are funneled through the same reporting path:
//!
//! 1. A fatal signal delivered by the OS. [`init`] installs one handler for
//!    the whole signal set; when any of them fires, the handler prints the
//!    trace, one explanation line for the signal, and exits with a failure
//!    status. Nothing is ever resumed.
//! 2. A condition the program itself decides is unrecoverable, raised with
//!    [`critical!`]. The trace is printed at the raise site and a
//!    [`CriticalError`] travels up the normal `Result` channel until [`run`]
//!    reports it and exits.
//!
//! Addresses are resolved to `function` + `file:line` by shelling out to the
//! platform symbolizer (`addr2line` on most unixes, `atos` on macOS), one
//! invocation per frame. A frame the symbolizer cannot classify falls back to
//! the raw string from `backtrace_symbols(3)`, so no frame is ever dropped
//! from the report.
//!
//! The handled signals:
//!
//! ## `SIGABRT`
//!
//! Sent to a process to tell it to abort. Usually initiated by the process
//! itself via `std::process::abort` or a failed C `assert`, but it can be
//! sent from outside like any other signal.
//!
//! ## `SIGFPE`
//!
//! Sent to a process when it executes an erroneous arithmetic operation.
//! Though it stands for **f**loating **p**oint **e**xception this signal
//! covers integer operations as well, the classic divide by zero included.
//!
//! ## `SIGILL`
//!
//! Sent to a process when it attempts to execute an illegal, malformed,
//! unknown, or privileged instruction.
//!
//! ## `SIGINT`
//!
//! The interactive attention signal, typically a ctrl+c from the controlling
//! terminal. Handled here so an interrupted process still reports where it
//! was.
//!
//! ## `SIGSEGV`
//!
//! Sent to a process when it makes an invalid virtual memory reference, a
//! [segmentation fault](https://en.wikipedia.org/wiki/Segmentation_fault).
//! This covers infamous `null` pointer access, out of bounds access, use
//! after free, stack overflows, etc. An alternate signal stack is installed
//! by [`init`] so that the stack overflow case can still be traced.
//!
//! ## `SIGTERM`
//!
//! A termination request sent to the program, e.g. by `kill(1)` with no
//! arguments.
//!
//! # Example
//!
//! ```no_run
//! use crash_trace::{critical, CriticalError, TraceConfig};
//!
//! fn defragment(disk: &str) -> Result<(), CriticalError> {
//!     if disk.is_empty() {
//!         critical!("no disk to defragment");
//!     }
//!     Ok(())
//! }
//!
//! fn main() {
//!     crash_trace::run(TraceConfig::from_args(), || defragment(""));
//! }
//! ```

#![allow(unsafe_code)]

#[cfg(not(unix))]
compile_error!("crash-trace relies on POSIX signals and backtrace(3), unix only");

#[cfg(feature = "debug-print")]
#[macro_export]
macro_rules! debug_print {
    ($s:literal) => {
        let cstr = concat!($s, "\n");
        $crate::write_stderr(cstr);
    };
}

#[cfg(not(feature = "debug-print"))]
#[macro_export]
macro_rules! debug_print {
    ($s:literal) => {};
}

mod critical;
mod error;
mod frames;
mod gateway;
mod render;
mod signal;
mod symbolize;

pub use critical::{CriticalError, run};
pub use error::Error;
pub use frames::{CapturedFrames, MAX_BACKTRACE_LINES};
pub use gateway::{TraceConfig, init};
pub use render::{TraceOrigin, print_stacktrace, render_stacktrace};
pub use signal::Signal;
pub use symbolize::{ResolvedSymbol, resolve};

/// Writes the specified string directly to stderr.
///
/// This is safe to be called from within a compromised context.
#[inline]
pub fn write_stderr(s: &'static str) {
    write_stderr_bytes(s.as_bytes());
}

pub(crate) fn write_stderr_bytes(bytes: &[u8]) {
    // SAFETY: write(2) to fd 2 with a live buffer
    unsafe {
        libc::write(2, bytes.as_ptr().cast(), bytes.len());
    }
}
