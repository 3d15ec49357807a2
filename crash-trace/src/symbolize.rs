use libc::c_void;
use std::{
    path::Path,
    process::{Command, Stdio},
};

/// A frame the symbolizer managed to classify. Both halves are always
/// present; a partial answer from the tool counts as a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSymbol {
    /// Demangled function name.
    pub function: String,
    /// `file:line`, with any leading directories stripped.
    pub location: String,
}

/// Asks the platform symbolizer what `address` inside `executable` is.
///
/// One blocking subprocess per call, reaped on every path. Any failure along
/// the way — tool missing, fewer than two output lines, or the `?` sentinel
/// for an address the tool cannot classify — comes back as `None`, and the
/// caller is expected to fall back to the raw symbol text captured with the
/// frame. The mapping is deterministic for an unchanged binary.
pub fn resolve(executable: &Path, address: *mut c_void) -> Option<ResolvedSymbol> {
    run_symbolizer(symbolizer_command(executable, address))
}

fn symbolizer_command(executable: &Path, address: *mut c_void) -> Command {
    let address = format!("{address:p}");

    cfg_if::cfg_if! {
        if #[cfg(target_os = "macos")] {
            // apple does things differently...
            let mut cmd = Command::new("atos");
            cmd.arg("-o").arg(executable).arg(address);
            cmd
        } else {
            let mut cmd = Command::new("addr2line");
            cmd.args(["-C", "-f", "-e"]).arg(executable).arg(address);
            cmd
        }
    }
}

fn run_symbolizer(mut cmd: Command) -> Option<ResolvedSymbol> {
    // output() waits for the child, so it is released on every path
    let output = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .ok()?;

    parse_symbolizer_output(&output.stdout)
}

/// The tool emits two lines per queried address: the function name, then
/// `file:line`. A second line starting with `?` means the address is outside
/// anything the tool knows about.
fn parse_symbolizer_output(stdout: &[u8]) -> Option<ResolvedSymbol> {
    let text = std::str::from_utf8(stdout).ok()?;
    let mut lines = text.lines();

    let function = lines.next()?.trim_end_matches('\r');
    let location = lines.next()?.trim_end_matches('\r');

    if function.is_empty() || location.starts_with('?') {
        return None;
    }

    // don't display the whole path
    let location = location.rsplit('/').next()?;

    Some(ResolvedSymbol {
        function: function.to_owned(),
        location: location.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_symbolizer(script: &str) -> Option<ResolvedSymbol> {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", script]);
        run_symbolizer(cmd)
    }

    #[test]
    fn resolves_two_line_output() {
        let sym = fake_symbolizer(r"printf 'write_config\n/home/me/src/storage.rs:42\n'")
            .expect("should resolve");
        assert_eq!(sym.function, "write_config");
        assert_eq!(sym.location, "storage.rs:42");
    }

    #[test]
    fn strips_every_leading_directory() {
        let sym = parse_symbolizer_output(b"f\n/a/b/c/d.rs:1\n").expect("should resolve");
        assert!(!sym.location.contains('/'));
        assert_eq!(sym.location, "d.rs:1");
    }

    #[test]
    fn bare_file_names_pass_through() {
        let sym = parse_symbolizer_output(b"main\nmain.rs:7\n").expect("should resolve");
        assert_eq!(sym.location, "main.rs:7");
    }

    #[test]
    fn unknown_sentinel_is_a_failure() {
        assert_eq!(parse_symbolizer_output(b"??\n??:0\n"), None);
    }

    #[test]
    fn short_output_is_a_failure() {
        assert_eq!(parse_symbolizer_output(b"just_one_line\n"), None);
        assert_eq!(parse_symbolizer_output(b""), None);
    }

    #[test]
    fn missing_tool_is_a_failure() {
        let cmd = Command::new("definitely-not-a-symbolizer");
        assert_eq!(run_symbolizer(cmd), None);
    }

    #[test]
    fn crlf_terminators_are_trimmed() {
        let sym = parse_symbolizer_output(b"main\r\n/src/main.rs:10\r\n").expect("should resolve");
        assert_eq!(sym.function, "main");
        assert_eq!(sym.location, "main.rs:10");
    }

    #[test]
    fn resolution_is_deterministic() {
        let first = fake_symbolizer(r"printf 'main\n/src/main.rs:10\n'");
        let second = fake_symbolizer(r"printf 'main\n/src/main.rs:10\n'");
        assert_eq!(first, second);
        assert!(first.is_some());
    }
}
