use std::{
    mem,
    path::{Path, PathBuf},
    ptr,
};

use crate::{
    Error,
    frames::CapturedFrames,
    render::{self, TraceOrigin},
    signal::{GATEWAY_SIGNALS, Signal},
};

/// Where the running executable lives. The symbolizer cannot work without
/// it. Built once at startup, read-only afterwards.
#[derive(Debug, Clone)]
pub struct TraceConfig {
    executable: PathBuf,
}

impl TraceConfig {
    /// A config pointing the symbolizer at an explicit executable path.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// A config for the conventional location: the zeroth command line
    /// argument, falling back to the OS's notion of the current executable.
    pub fn from_args() -> Self {
        let executable = std::env::args_os()
            .next()
            .map_or_else(|| std::env::current_exe().unwrap_or_default(), PathBuf::from);
        Self { executable }
    }

    /// The path the symbolizer will be pointed at.
    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

/// The armed state. `None` until [`init`] runs; the signal handler cannot
/// receive arguments, so this is where it finds the executable path.
static GATEWAY: parking_lot::Mutex<Option<TraceConfig>> = parking_lot::const_mutex(None);

/// The executable recorded by [`init`], if the gateway is armed.
pub(crate) fn armed_executable() -> Option<PathBuf> {
    GATEWAY
        .lock()
        .as_ref()
        .map(|config| config.executable.clone())
}

/// Arms the gateway: records `config` and installs the one signal handler
/// for every signal in the set.
///
/// Call it once from the program entry point, before anything that might
/// crash. Calling it again silently re-arms with the new config; there is no
/// way to disarm.
pub fn init(config: TraceConfig) -> Result<(), Error> {
    // SAFETY: syscalls
    unsafe {
        install_sigaltstack()?;
        install_handlers();
    }

    log::debug!(
        "crash reporting armed for {} signals, symbolizing against {}",
        GATEWAY_SIGNALS.len(),
        config.executable.display()
    );

    *GATEWAY.lock() = Some(config);
    Ok(())
}

// std::cmp::max is not const :(
const fn stack_size() -> usize {
    if libc::SIGSTKSZ > 64 * 1024 {
        libc::SIGSTKSZ
    } else {
        64 * 1024
    }
}

/// The size of the alternate stack the handler runs on.
///
/// Larger than the platform minimum since the handler forks a symbolizer
/// subprocess per frame from this stack.
const SIG_STACK_SIZE: usize = stack_size();

/// Create an alternative stack to run the signal handler on, since the
/// signal might have been caused by a stack overflow.
unsafe fn install_sigaltstack() -> Result<(), Error> {
    unsafe {
        // An existing stack that is already big enough is left alone.
        let mut old_stack = mem::zeroed();
        if libc::sigaltstack(ptr::null(), &mut old_stack) != 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }

        if old_stack.ss_flags & libc::SS_DISABLE == 0 && old_stack.ss_size >= SIG_STACK_SIZE {
            return Ok(());
        }

        // ... failing that, allocate our own, with a guard page below it.
        let guard_size = libc::sysconf(libc::_SC_PAGESIZE) as usize;
        let alloc_size = guard_size + SIG_STACK_SIZE;

        let mapping = libc::mmap(
            ptr::null_mut(),
            alloc_size,
            libc::PROT_NONE,
            libc::MAP_PRIVATE | libc::MAP_ANON,
            -1,
            0,
        );
        if mapping == libc::MAP_FAILED {
            return Err(Error::OutOfMemory);
        }

        // Make everything above the guard page usable, then register it.
        let stack_ptr = (mapping as usize + guard_size) as *mut libc::c_void;
        if libc::mprotect(stack_ptr, SIG_STACK_SIZE, libc::PROT_READ | libc::PROT_WRITE) != 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }

        let new_stack = libc::stack_t {
            ss_sp: stack_ptr,
            ss_flags: 0,
            ss_size: SIG_STACK_SIZE,
        };
        if libc::sigaltstack(&new_stack, ptr::null_mut()) != 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }

        Ok(())
    }
}

/// Registers the handler for every gateway signal.
unsafe fn install_handlers() {
    unsafe {
        let mut action: libc::sigaction = mem::zeroed();
        libc::sigemptyset(&mut action.sa_mask);

        // Hold back the rest of the set while one of them is being handled.
        for signal in GATEWAY_SIGNALS {
            libc::sigaddset(&mut action.sa_mask, signal as i32);
        }

        action.sa_sigaction = signal_handler as usize;
        action.sa_flags = libc::SA_ONSTACK | libc::SA_SIGINFO;

        for signal in GATEWAY_SIGNALS {
            // At this point it is impractical to back out changes, and so
            // failure to install a single handler is intentionally ignored.
            let _ = libc::sigaction(signal as i32, &action, ptr::null_mut());
        }
    }
}

/// This is the actual function installed for each signal in the set, invoked
/// by the kernel.
///
/// Prints the trace, then the explanation line for the signal, then
/// terminates without unwinding. Every path out of here ends in `_exit`;
/// nothing is ever resumed, and re-entrant faults during handling are not
/// guarded against.
unsafe extern "C" fn signal_handler(
    signal: i32,
    _info: *mut libc::siginfo_t,
    _context: *mut libc::c_void,
) {
    debug_print!("entered signal handler");

    // The innermost frames are this handler and the kernel shim; the Signal
    // origin tells the renderer to hide both. Everything past this point
    // runs exactly once on the way to termination.
    let frames = CapturedFrames::capture();

    debug_print!("captured frames");

    render::print_trace(&frames, TraceOrigin::Signal);

    match Signal::from_raw(signal) {
        Some(signal) => crate::write_stderr(signal.explanation()),
        None => write_unknown_signal(signal),
    }

    // SAFETY: terminating without unwinding is the entire point
    unsafe { libc::_exit(libc::EXIT_FAILURE) }
}

/// A signal outside the declared set still gets reported, with a neutral
/// line naming the raw signal number.
fn write_unknown_signal(signal: i32) {
    let mut buf = [0u8; 64];
    let len = unknown_signal_line(signal, &mut buf);
    crate::write_stderr_bytes(&buf[..len]);
}

/// Formats the unknown-signal line into `buf` without allocating, returning
/// the line length.
fn unknown_signal_line(signal: i32, buf: &mut [u8; 64]) -> usize {
    let mut len = 0;

    for byte in b"Caught signal " {
        buf[len] = *byte;
        len += 1;
    }

    len += format_decimal(signal, &mut buf[len..]);

    for byte in b": unrecognized fatal signal\n" {
        buf[len] = *byte;
        len += 1;
    }

    len
}

/// Writes `value` in decimal into `out`, returning the byte count.
fn format_decimal(value: i32, out: &mut [u8]) -> usize {
    // widened so i32::MIN negates cleanly
    let mut value = i64::from(value);
    let negative = value < 0;
    if negative {
        value = -value;
    }

    let mut digits = [0u8; 11];
    let mut at = digits.len();
    loop {
        at -= 1;
        digits[at] = b'0' + (value % 10) as u8;
        value /= 10;
        if value == 0 {
            break;
        }
    }
    if negative {
        at -= 1;
        digits[at] = b'-';
    }

    let text = &digits[at..];
    out[..text.len()].copy_from_slice(text);
    text.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_keeps_the_given_path() {
        let config = TraceConfig::new("/usr/bin/app");
        assert_eq!(config.executable(), Path::new("/usr/bin/app"));
    }

    #[test]
    fn config_from_args_is_never_empty() {
        let config = TraceConfig::from_args();
        assert!(!config.executable().as_os_str().is_empty());
    }

    fn formatted(value: i32) -> String {
        let mut out = [0u8; 16];
        let len = format_decimal(value, &mut out);
        String::from_utf8(out[..len].to_vec()).expect("decimal is ascii")
    }

    #[test]
    fn decimal_formatting() {
        assert_eq!(formatted(0), "0");
        assert_eq!(formatted(11), "11");
        assert_eq!(formatted(-3), "-3");
        assert_eq!(formatted(i32::MAX), i32::MAX.to_string());
        assert_eq!(formatted(i32::MIN), i32::MIN.to_string());
    }

    #[test]
    fn unknown_signal_line_is_neutral() {
        let mut buf = [0u8; 64];
        let len = unknown_signal_line(64, &mut buf);
        assert_eq!(&buf[..len], b"Caught signal 64: unrecognized fatal signal\n");
    }
}
