use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic, ReadExecutor};

/// Error kinds for persistence operations.
///
/// Usage errors (`AlreadyStarted`, `WorkAlreadyBegun`, ...) indicate a lifecycle
/// bug in the host application. Client errors (`SessionError`,
/// `TransactionError`, `DriverError`) are raised by the graph client library.
///
/// # Examples
///
/// ```rust
/// use graphpersist::errors::{ErrorKind, PersistError, PersistResult};
///
/// fn example() -> PersistResult<()> {
///     Err(PersistError::new("Work already begun", ErrorKind::WorkAlreadyBegun))
/// }
/// assert!(example().is_err());
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Lifecycle errors
    /// `start()` was called after the session factory was built
    AlreadyStarted,
    /// A unit of work was requested before `start()`
    NotStarted,
    /// A unit of work was requested after `stop()`
    ServiceStopped,

    // Unit of work errors
    /// `begin()` was called while a session is already bound to the context
    WorkAlreadyBegun,
    /// The session registry already holds a session for the context
    AlreadyBound,
    /// No session is bound to the context
    NoActiveSession,

    // Client library errors
    /// The client failed to open, use or close a session
    SessionError,
    /// The client failed to begin, commit or roll back a transaction
    TransactionError,
    /// The driver failed to build a session factory
    DriverError,

    // Configuration errors
    /// Missing or malformed configuration
    ConfigurationError,

    /// Error from an extension, e.g. a concrete driver crate
    Extension(String),

    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::AlreadyStarted => write!(f, "Already started"),
            ErrorKind::NotStarted => write!(f, "Not started"),
            ErrorKind::ServiceStopped => write!(f, "Service stopped"),
            ErrorKind::WorkAlreadyBegun => write!(f, "Work already begun"),
            ErrorKind::AlreadyBound => write!(f, "Already bound"),
            ErrorKind::NoActiveSession => write!(f, "No active session"),
            ErrorKind::SessionError => write!(f, "Session error"),
            ErrorKind::TransactionError => write!(f, "Transaction error"),
            ErrorKind::DriverError => write!(f, "Driver error"),
            ErrorKind::ConfigurationError => write!(f, "Configuration error"),
            ErrorKind::Extension(name) => write!(f, "{} error", name),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Error type for all persistence operations.
///
/// `PersistError` carries a message, an [`ErrorKind`], an optional cause and the
/// backtrace captured at construction.
///
/// ```rust
/// use graphpersist::errors::{ErrorKind, PersistError};
///
/// let cause = PersistError::new("connection refused", ErrorKind::DriverError);
/// let err = PersistError::new_with_cause("Failed to start", ErrorKind::DriverError, cause);
/// assert!(err.cause().is_some());
/// ```
#[derive(Clone)]
pub struct PersistError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<PersistError>>,
    backtrace: Atomic<Backtrace>,
}

impl PersistError {
    /// Creates a new `PersistError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        PersistError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new_unresolved()),
        }
    }

    /// Creates a new `PersistError` chained to the error that caused it.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: PersistError) -> Self {
        PersistError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new_unresolved()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&PersistError> {
        self.cause.as_deref()
    }
}

impl Display for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // message with stack trace, or followed by the cause chain
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => {
                let trace = self.backtrace.read_with(|bt| {
                    let mut bt = bt.clone();
                    bt.resolve();
                    format!("{:?}", bt)
                });
                write!(f, "{}\n{}", self.message, trace)
            }
        }
    }
}

impl Error for PersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// Shorthand for `Result<T, PersistError>`.
pub type PersistResult<T> = Result<T, PersistError>;

impl From<std::io::Error> for PersistError {
    fn from(err: std::io::Error) -> Self {
        PersistError::new(&format!("IO error: {}", err), ErrorKind::DriverError)
    }
}

impl From<String> for PersistError {
    fn from(msg: String) -> Self {
        PersistError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for PersistError {
    fn from(msg: &str) -> Self {
        PersistError::new(msg, ErrorKind::InternalError)
    }
}
