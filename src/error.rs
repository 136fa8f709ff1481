pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("spawn error: {0}")]
    Spawn(String),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn spawn<S: Into<String>>(msg: S) -> Self {
        Error::Spawn(msg.into())
    }
}

/// Synchronous outcome of a submission or delivery call.
///
/// Every path that accepts work reports one of these to the caller;
/// failures are never silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The work was accepted (or delivered).
    Ok,
    /// A prepare callback failed; the task was never queued. Its
    /// completion callbacks still run, with `success = false`.
    Declined,
    /// The pool is not accepting work (finalized, or workers could not
    /// be spawned).
    InvalidArgument,
    /// A completion sink method the host did not override.
    NotImplemented,
}

impl Status {
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }
}
