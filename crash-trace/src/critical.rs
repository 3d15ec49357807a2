use std::{fmt, process};

use crate::gateway::{self, TraceConfig};

/// A fatal condition the program raised on purpose, carrying the raise
/// site. [`crate::critical!`] is the intended front door; it also prints the
/// stack trace leading to the site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriticalError {
    message: String,
    function: &'static str,
    file: &'static str,
    line: u32,
}

impl CriticalError {
    /// Builds the error value from an already-formatted message and an
    /// explicit raise site.
    pub fn new(
        message: impl Into<String>,
        function: &'static str,
        file: &'static str,
        line: u32,
    ) -> Self {
        Self {
            message: message.into(),
            function,
            file,
            line,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Name of the function containing the raise site.
    pub fn function(&self) -> &'static str {
        self.function
    }

    pub fn file(&self) -> &'static str {
        self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }
}

impl fmt::Display for CriticalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (in {} at {}:{})",
            self.message, self.function, self.file, self.line
        )
    }
}

impl std::error::Error for CriticalError {}

/// Raises a critical condition: prints the stack trace for the current call
/// site to stderr, then early-returns a [`CriticalError`] carrying the
/// formatted message and the enclosing function, file and line.
///
/// Usable in any function whose error type converts from [`CriticalError`].
#[macro_export]
macro_rules! critical {
    ($($arg:tt)*) => {{
        $crate::print_stacktrace();
        return ::std::result::Result::Err(::std::convert::Into::into(
            $crate::CriticalError::new(
                ::std::format!($($arg)*),
                $crate::__function_name!(),
                ::std::file!(),
                ::std::line!(),
            ),
        ));
    }};
}

/// Name of the enclosing function, as a `&'static str`.
#[doc(hidden)]
#[macro_export]
macro_rules! __function_name {
    () => {{
        fn f() {}
        let name = ::std::any::type_name_of_val(&f);
        // drop the helper's own `::f` segment
        &name[..name.len() - 3]
    }};
}

/// The single top-level protected region.
///
/// Arms the gateway with `config`, runs `main`, and reports any
/// [`CriticalError`] that reaches this boundary to stderr before terminating
/// with a failure status. Wrap the whole body of the program entry point in
/// it, once per process.
pub fn run<T, F>(config: TraceConfig, main: F) -> T
where
    F: FnOnce() -> Result<T, CriticalError>,
{
    if let Err(error) = gateway::init(config) {
        eprintln!("cannot arm crash reporting: {error}");
        process::exit(libc::EXIT_FAILURE);
    }

    match main() {
        Ok(value) => value,
        Err(error) => {
            eprintln!("{error}");
            process::exit(libc::EXIT_FAILURE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_format_is_exact() {
        let err = CriticalError::new("disk full", "writeConfig", "storage.ext", 42);
        assert_eq!(err.to_string(), "disk full (in writeConfig at storage.ext:42)");
    }

    #[test]
    fn raise_site_is_captured() {
        const RAISE_LINE: u32 = line!() + 2;
        fn write_config() -> Result<(), CriticalError> {
            crate::critical!("disk full");
        }

        let err = write_config().unwrap_err();
        assert_eq!(err.message(), "disk full");
        assert_eq!(err.file(), file!());
        assert_eq!(err.line(), RAISE_LINE);
        assert!(err.function().ends_with("write_config"));
        assert_eq!(
            err.to_string(),
            format!(
                "disk full (in {} at {}:{})",
                err.function(),
                file!(),
                RAISE_LINE
            )
        );
    }

    #[test]
    fn message_arguments_are_formatted() {
        fn fail(space: u64) -> Result<(), CriticalError> {
            crate::critical!("disk full, {space} bytes left");
        }

        assert_eq!(
            fail(12).unwrap_err().message(),
            "disk full, 12 bytes left"
        );
    }

    #[test]
    fn converts_into_wrapping_error_types() {
        #[derive(Debug)]
        enum AppError {
            Critical(CriticalError),
        }

        impl From<CriticalError> for AppError {
            fn from(err: CriticalError) -> Self {
                Self::Critical(err)
            }
        }

        fn fail() -> Result<(), AppError> {
            crate::critical!("nope");
        }

        assert!(matches!(fail().unwrap_err(), AppError::Critical(_)));
    }
}
