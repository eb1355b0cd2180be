//! Unified error type.

use std::fmt;

/// The error type returned by podium's fallible lifecycle operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s, and registration
/// validation failures are reported as `false` plus a logged error — see
/// the crate docs. This type surfaces infrastructure failures only:
/// binding a port, releasing a socket, or a lifecycle call made from the
/// wrong state.
#[derive(Debug)]
pub enum Error {
    /// The backend failed to bind and begin accepting on the requested port.
    Bind(std::io::Error),
    /// The backend failed while stopping or releasing its socket.
    Shutdown(std::io::Error),
    /// `listen` was called while the server was already active.
    AlreadyActive,
    /// `close` was called while the server was not listening.
    NotListening,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind(e) => write!(f, "bind: {e}"),
            Self::Shutdown(e) => write!(f, "shutdown: {e}"),
            Self::AlreadyActive => f.write_str("listen called on an active server"),
            Self::NotListening => f.write_str("close called on a server that is not listening"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bind(e) | Self::Shutdown(e) => Some(e),
            _ => None,
        }
    }
}
