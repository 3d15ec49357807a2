/// An error that can occur while arming the [`crate::init`] gateway.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unable to `mmap` memory for the alternate signal stack
    #[error("unable to allocate memory")]
    OutOfMemory,
    /// An I/O or other syscall failed
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
