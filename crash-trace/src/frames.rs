use libc::{c_char, c_int, c_void};
use std::{borrow::Cow, ffi::CStr, ptr};

/// The maximum number of frames captured for one trace. A deeper stack is
/// truncated, never reallocated.
pub const MAX_BACKTRACE_LINES: usize = 64;

/// A bounded snapshot of the call stack, newest frame first.
///
/// Capture writes into a fixed buffer so it can run on the (alternate)
/// signal stack without growing memory. Each frame carries its raw return
/// address plus the unresolved symbol text from the OS's own symbol table,
/// which the renderer falls back to when the external symbolizer fails.
pub struct CapturedFrames {
    addresses: [*mut c_void; MAX_BACKTRACE_LINES],
    len: usize,
    /// Block returned by `backtrace_symbols(3)`, one string per captured
    /// frame. Released with `free(3)` on drop.
    symbols: *mut *mut c_char,
}

impl CapturedFrames {
    /// Captures the callers of the function this is invoked from.
    ///
    /// Always inlined so that the innermost captured frame is the caller
    /// itself, which the renderer then knows to skip.
    ///
    /// If the OS cannot produce the symbol block the diagnostic path itself
    /// is broken; that is reported to stderr and the process exits with a
    /// failure status rather than limping on.
    #[inline(always)]
    pub fn capture() -> Self {
        let mut addresses = [ptr::null_mut(); MAX_BACKTRACE_LINES];

        // SAFETY: backtrace writes at most MAX_BACKTRACE_LINES entries into
        // the buffer we hand it
        let len =
            unsafe { libc::backtrace(addresses.as_mut_ptr(), MAX_BACKTRACE_LINES as c_int) };
        let len = usize::try_from(len).unwrap_or(0);

        // SAFETY: the first `len` entries were just initialized
        let symbols = unsafe { libc::backtrace_symbols(addresses.as_ptr(), len as c_int) };

        if symbols.is_null() {
            crate::write_stderr("backtrace_symbols failed, no stack trace available\n");
            // SAFETY: terminating, the trace printing must never hang the
            // process
            unsafe { libc::_exit(libc::EXIT_FAILURE) }
        }

        Self {
            addresses,
            len,
            symbols,
        }
    }

    /// Number of captured frames, at most [`MAX_BACKTRACE_LINES`].
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The raw return address of frame `index`.
    #[inline]
    pub fn address(&self, index: usize) -> *mut c_void {
        assert!(index < self.len);
        self.addresses[index]
    }

    /// The unresolved symbol text of frame `index`, e.g.
    /// `./app(+0x1234) [0x55d1c2f0a234]`.
    pub fn raw_symbol(&self, index: usize) -> Cow<'_, str> {
        assert!(index < self.len);
        // SAFETY: backtrace_symbols returns one valid nul-terminated string
        // per captured frame
        unsafe { CStr::from_ptr(*self.symbols.add(index)).to_string_lossy() }
    }
}

impl Drop for CapturedFrames {
    fn drop(&mut self) {
        // SAFETY: the block came from backtrace_symbols, which mallocs it as
        // a single allocation
        unsafe { libc::free(self.symbols.cast()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[inline(never)]
    fn plunge(depth: usize) -> CapturedFrames {
        if depth == 0 {
            CapturedFrames::capture()
        } else {
            std::hint::black_box(plunge(depth - 1))
        }
    }

    #[test]
    fn capture_is_bounded() {
        let frames = plunge(MAX_BACKTRACE_LINES * 4);
        assert_eq!(frames.len(), MAX_BACKTRACE_LINES);
    }

    #[test]
    fn shallow_capture_is_not_padded() {
        let frames = CapturedFrames::capture();
        assert!(!frames.is_empty());
        assert!(frames.len() < MAX_BACKTRACE_LINES);
    }

    #[test]
    fn every_frame_has_a_raw_symbol() {
        let frames = CapturedFrames::capture();
        for index in 0..frames.len() {
            assert!(!frames.raw_symbol(index).is_empty());
            assert!(!frames.address(index).is_null());
        }
    }
}
