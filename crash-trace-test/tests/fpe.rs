
use crash_trace_test::Scenario;

#[test]
fn reports_divide_by_zero() {
    shared::handles_signal(
        Scenario::Fpe,
        "Caught SIGFPE: arithmetic exception, such as divide by zero",
    );
}
