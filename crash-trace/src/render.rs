use std::{
    io::{self, Write},
    path::Path,
};

use crate::{
    frames::CapturedFrames,
    gateway,
    symbolize::{self, ResolvedSymbol},
};

/// What put the diagnostics machinery on the stack. Decides how many of the
/// innermost captured frames belong to it rather than to the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceOrigin {
    /// The trace was requested by the program, e.g. through [`crate::critical!`].
    Raise,
    /// The trace is printed from inside the signal handler, which also puts
    /// the kernel's handler shim on the stack.
    Signal,
}

impl TraceOrigin {
    fn skipped_innermost(self) -> usize {
        match self {
            Self::Raise => 1,
            Self::Signal => 2,
        }
    }
}

/// The two outermost frames belong to process startup, not the program.
const SKIPPED_OUTERMOST: usize = 2;

/// Writes the numbered trace for `frames` to `out`.
///
/// Frames print innermost first; the label counts positions from the outer
/// boundary, so the last line is always `[0]`. A frame that resolves prints
/// as `[n] <address> in <function> at <file:line>`; one the symbolizer
/// cannot classify prints its raw symbol text instead of being dropped.
pub fn render_stacktrace(
    out: &mut impl Write,
    frames: &CapturedFrames,
    origin: TraceOrigin,
    executable: Option<&Path>,
) -> io::Result<()> {
    let first = origin.skipped_innermost();
    let end = frames.len().saturating_sub(SKIPPED_OUTERMOST);

    for index in first..end {
        let label = end - index - 1;
        let address = frames.address(index);

        match executable.and_then(|exe| symbolize::resolve(exe, address)) {
            Some(ResolvedSymbol { function, location }) => {
                writeln!(out, "[{label}] {address:p} in {function} at {location}")?;
            }
            None => writeln!(out, "[{label}] {}", frames.raw_symbol(index))?,
        }
    }

    Ok(())
}

/// Renders `frames` to stderr, resolving against the armed executable if
/// there is one. Never reports an error; on a path that is about to
/// terminate there is nothing left to do about a failed write.
pub(crate) fn print_trace(frames: &CapturedFrames, origin: TraceOrigin) {
    let executable = gateway::armed_executable();
    let stderr = io::stderr();
    let _ = render_stacktrace(&mut stderr.lock(), frames, origin, executable.as_deref());
}

/// Captures the current call stack and prints it to stderr. The innermost
/// visible frame is the caller.
#[inline(never)]
pub fn print_stacktrace() {
    let frames = CapturedFrames::capture();
    print_trace(&frames, TraceOrigin::Raise);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(frames: &CapturedFrames, origin: TraceOrigin) -> Vec<String> {
        let mut out = Vec::new();
        render_stacktrace(&mut out, frames, origin, None).expect("write to Vec cannot fail");
        String::from_utf8(out)
            .expect("trace is utf-8")
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn labels_count_down_to_the_outer_boundary() {
        let frames = CapturedFrames::capture();
        let lines = rendered(&frames, TraceOrigin::Raise);

        let end = frames.len() - SKIPPED_OUTERMOST;
        assert_eq!(lines.len(), end - 1);
        assert!(lines[0].starts_with(&format!("[{}] ", end - 2)));
        assert!(lines[lines.len() - 1].starts_with("[0] "));
    }

    #[test]
    fn unresolved_frames_fall_back_to_raw_symbols() {
        let frames = CapturedFrames::capture();
        let lines = rendered(&frames, TraceOrigin::Raise);

        let end = frames.len() - SKIPPED_OUTERMOST;
        for (line, index) in lines.iter().zip(1..) {
            let expected = format!("[{}] {}", end - index - 1, frames.raw_symbol(index));
            assert_eq!(*line, expected);
        }
    }

    #[test]
    fn signal_origin_hides_one_more_frame() {
        let frames = CapturedFrames::capture();
        let raised = rendered(&frames, TraceOrigin::Raise);
        let signaled = rendered(&frames, TraceOrigin::Signal);
        assert_eq!(signaled.len() + 1, raised.len());
    }
}
