//! Dies in a selectable fashion so the resulting report can be eyeballed:
//!
//! ```text
//! cargo run --example crashy -- segv
//! ```
//!
//! With no argument it raises a critical condition instead of a signal.

use crash_trace::{CriticalError, TraceConfig, critical};

fn defragment_disk() -> Result<(), CriticalError> {
    critical!("the disk is imaginary");
}

fn main() {
    crash_trace::run(TraceConfig::from_args(), || {
        let flavor = std::env::args().nth(1).unwrap_or_default();

        match flavor.as_str() {
            "abort" => fault_generator::raise_abort(),
            "fpe" => fault_generator::raise_floating_point_exception(),
            "illegal" => fault_generator::raise_illegal_instruction(),
            "interrupt" => fault_generator::raise_interrupt(),
            "segv" => fault_generator::raise_segfault(),
            "stack-overflow" => fault_generator::raise_stack_overflow(),
            "term" => fault_generator::raise_termination(),
            _ => defragment_disk()?,
        }

        Ok(())
    });
}
