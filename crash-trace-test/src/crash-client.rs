use clap::Parser;
use crash_trace::{CriticalError, TraceConfig, critical};
use crash_trace_test::Scenario;

#[derive(Parser)]
struct Command {
    /// The crash flavor to perform once the gateway is armed
    #[clap(long, value_enum)]
    scenario: Scenario,
}

fn archive_logs() -> Result<(), CriticalError> {
    critical!("log archive is corrupt");
}

fn commit_fault(scenario: Scenario) -> Result<(), CriticalError> {
    match scenario {
        Scenario::Abort => fault_generator::raise_abort(),
        Scenario::Critical => archive_logs()?,
        Scenario::Fpe => fault_generator::raise_floating_point_exception(),
        Scenario::Illegal => fault_generator::raise_illegal_instruction(),
        Scenario::Interrupt => fault_generator::raise_interrupt(),
        Scenario::Segv => fault_generator::raise_segfault(),
        Scenario::StackOverflow => fault_generator::raise_stack_overflow(),
        Scenario::Term => fault_generator::raise_termination(),
    }

    Ok(())
}

fn main() {
    let cmd = Command::parse();
    let scenario = cmd.scenario;

    crash_trace::run(TraceConfig::from_args(), || commit_fault(scenario));

    // Every scenario is supposed to have killed the process by now, so an
    // orderly exit here must fail the test that spawned us.
    eprintln!("error: survived the {scenario} scenario");
    std::process::exit(222);
}
