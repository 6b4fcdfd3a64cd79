use std::fmt;
use std::io;

/// Possible terminal errors of a request.
#[derive(Debug)]
pub enum Error {
    /// A wrapped std::io::Error from resolving, connecting, writing or reading.
    Network(io::Error),
    /// The peer sent something that isn't an HTTP/1.1 response.
    Protocol(ProtocolError),
    /// The request was cancelled before it reached its genuine outcome.
    Cancelled,
}

/// Errors in the response the peer sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// Malformed status line: wrong version token or unparsable status code.
    InvalidResponse,
}

impl Error {
    /// Tell if this error is the result of a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// The underlying transport error, if this is a network error.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Error::Network(e) => Some(e),
            _ => None,
        }
    }

    /// The OS level error code of a network error, when there is one.
    pub fn raw_os_error(&self) -> Option<i32> {
        self.io_error().and_then(|e| e.raw_os_error())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Network(v) => fmt::Display::fmt(v, f),
            Error::Protocol(v) => fmt::Display::fmt(v, f),
            Error::Cancelled => write!(f, "Request was cancelled"),
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProtocolError::InvalidResponse => write!(f, "Server response cannot be parsed."),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Network(e) => Some(e),
            Error::Protocol(e) => Some(e),
            Error::Cancelled => None,
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Network(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}
