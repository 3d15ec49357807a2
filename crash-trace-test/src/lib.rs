//! Scenario definitions shared by the crash client binary and the tests
//! that spawn it.

/// The ways the crash client can be asked to die.
#[derive(clap::ValueEnum, Clone, Copy)]
pub enum Scenario {
    Abort,
    Critical,
    Fpe,
    Illegal,
    Interrupt,
    Segv,
    StackOverflow,
    Term,
}

use std::fmt;
impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Abort => "abort",
            Self::Critical => "critical",
            Self::Fpe => "fpe",
            Self::Illegal => "illegal",
            Self::Interrupt => "interrupt",
            Self::Segv => "segv",
            Self::StackOverflow => "stack-overflow",
            Self::Term => "term",
        })
    }
}
