use std::fmt;

/// The fatal signals routed through the gateway.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(i32)]
pub enum Signal {
    Abort = libc::SIGABRT,
    Fpe = libc::SIGFPE,
    Illegal = libc::SIGILL,
    Interrupt = libc::SIGINT,
    Segv = libc::SIGSEGV,
    Term = libc::SIGTERM,
}

/// Everything the gateway arms a handler for.
pub(crate) const GATEWAY_SIGNALS: [Signal; 6] = [
    Signal::Abort,
    Signal::Fpe,
    Signal::Illegal,
    Signal::Interrupt,
    Signal::Segv,
    Signal::Term,
];

impl Signal {
    /// Maps a raw signal number back to the enum, if it is one of ours.
    pub fn from_raw(signal: i32) -> Option<Self> {
        Some(match signal {
            libc::SIGABRT => Self::Abort,
            libc::SIGFPE => Self::Fpe,
            libc::SIGILL => Self::Illegal,
            libc::SIGINT => Self::Interrupt,
            libc::SIGSEGV => Self::Segv,
            libc::SIGTERM => Self::Term,
            _ => return None,
        })
    }

    /// The fixed explanation line reported after the trace. Newline
    /// terminated so the handler can hand it straight to `write(2)`.
    pub fn explanation(self) -> &'static str {
        match self {
            Self::Abort => "Caught SIGABRT: usually caused by an abort() or assert()\n",
            Self::Fpe => "Caught SIGFPE: arithmetic exception, such as divide by zero\n",
            Self::Illegal => "Caught SIGILL: illegal instruction\n",
            Self::Interrupt => "Caught SIGINT: interactive attention signal, probably a ctrl+c\n",
            Self::Segv => "Caught SIGSEGV: segfault\n",
            Self::Term => "Caught SIGTERM: a termination request was sent to the program\n",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Abort => "SIGABRT",
            Self::Fpe => "SIGFPE",
            Self::Illegal => "SIGILL",
            Self::Interrupt => "SIGINT",
            Self::Segv => "SIGSEGV",
            Self::Term => "SIGTERM",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_roundtrip_covers_the_whole_set() {
        for signal in GATEWAY_SIGNALS {
            assert_eq!(Signal::from_raw(signal as i32), Some(signal));
        }
    }

    #[test]
    fn unlisted_signals_are_not_ours() {
        assert_eq!(Signal::from_raw(libc::SIGUSR1), None);
        assert_eq!(Signal::from_raw(0), None);
    }

    #[test]
    fn explanations_name_their_signal() {
        for signal in GATEWAY_SIGNALS {
            let explanation = signal.explanation();
            assert!(explanation.starts_with(&format!("Caught {signal}:")));
            assert!(explanation.ends_with('\n'));
        }
    }
}
