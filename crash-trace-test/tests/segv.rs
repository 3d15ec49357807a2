
use crash_trace_test::Scenario;

#[test]
fn reports_segfault() {
    shared::handles_signal(Scenario::Segv, "Caught SIGSEGV: segfault");
}
