use crate::version::Version;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("an IO error occurred: {detail}")]
    IOError {
        #[from]
        detail: std::io::Error,
    },

    #[error("Invalid URI: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Unsupported URI scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(String),

    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),

    #[error("connection error")]
    ConnectionError,

    #[error("the connection was closed by the server")]
    ConnectionClosed,

    #[error("read timed out during {0}")]
    Timeout(&'static str),

    #[error("the server rejected every advertised protocol version")]
    HandshakeRejected,

    #[error(
        "Protocol mismatch: Expected a Bolt version as response, \
         got {0:08x} instead (maybe you connected to the HTTP port?)"
    )]
    ProtocolMismatch(u32),

    #[error("Bolt version {0}.{1} is not supported")]
    UnsupportedVersion(u8, u8),

    #[error("{0}")]
    AuthenticationError(String),

    #[error("Neo4j error `{}`: {}", .0.code, .0.message)]
    Server(ServerError),

    #[error("{0} was ignored: the server is in the FAILED state")]
    ServerInFailedState(&'static str),

    #[error("{0}")]
    UnexpectedMessage(String),

    #[error("{0} is not a legal message for Bolt version {1}")]
    InvalidMessageForVersion(&'static str, Version),

    #[error("input ended before a complete value could be read")]
    TruncatedInput,

    #[error("{0}")]
    InvalidTypeMarker(String),

    #[error("map keys must be strings, found marker {0:#04X}")]
    NonStringMapKey(u8),

    #[error("unknown struct signature {0:#04X}")]
    UnknownStructSignature(u8),

    #[error("string payload is not valid UTF-8")]
    BadUtf8(#[from] std::string::FromUtf8Error),

    #[error("a single chunk may carry at most {max} bytes, got {got}")]
    ChunkOverflow { got: usize, max: usize },

    #[error("attempted to serialize excessively long string")]
    StringTooLong,

    #[error("attempted to serialize excessively large map")]
    MapTooBig,

    #[error("attempted to serialize excessively long list")]
    ListTooLong,

    #[error("Invalid integer for the parameter {0}: must be positive or -1, but was {1}")]
    InvalidInteger(&'static str, i64),

    #[error("there is no open transaction on this connection")]
    NotInTransaction,

    #[error("the calling task does not own a database connection")]
    NotOwned,

    #[error("the circuit for {0} is open after repeated connection failures")]
    CircuitOpen(String),
}

impl Error {
    /// Errors that indicate the connection itself is broken. The pool
    /// discards the lease instead of recycling it, and the circuit breaker
    /// counts them towards opening.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Error::IOError { .. }
                | Error::ConnectionError
                | Error::ConnectionClosed
                | Error::Timeout(_)
        )
    }

    /// Errors that are worth another attempt through [`crate::with_retry`].
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Server(e) => e.can_retry(),
            other => other.is_connection_error(),
        }
    }
}

/// A FAILURE sent by the server, carrying the wire-level status code and
/// message along with a coarse classification of the code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerError {
    pub(crate) kind: ServerErrorKind,
    pub(crate) code: String,
    pub(crate) message: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ServerErrorKind {
    Authentication,
    Security,
    ProtocolViolation,
    TransactionTerminated,
    SessionExpired,
    Client,
    Transient,
    Database,
    Unknown,
}

impl ServerErrorKind {
    fn classify(code: &str) -> Self {
        let mut parts = code.split('.').skip(1);
        let [class, subclass, kind] = [parts.next(), parts.next(), parts.next()];

        match class {
            Some("ClientError") => match (subclass, kind) {
                (Some("Security"), Some("Unauthorized")) => Self::Authentication,
                (Some("Security"), _) => Self::Security,
                (Some("Request"), _) => Self::ProtocolViolation,
                (Some("Transaction"), Some("Terminated")) => Self::TransactionTerminated,
                (Some("Transaction"), Some("LockClientStopped")) => Self::TransactionTerminated,
                (Some("Cluster"), Some("NotALeader")) => Self::SessionExpired,
                (Some("General"), Some("ForbiddenOnReadOnlyDatabase")) => Self::SessionExpired,
                _ => Self::Client,
            },
            Some("TransientError") => match (subclass, kind) {
                // reported as transient by the server but never worth a retry
                (Some("Transaction"), Some("Terminated")) => Self::TransactionTerminated,
                (Some("Transaction"), Some("LockClientStopped")) => Self::TransactionTerminated,
                _ => Self::Transient,
            },
            Some(_) => Self::Database,
            None => Self::Unknown,
        }
    }
}

impl ServerError {
    pub(crate) fn new(code: String, message: String) -> Self {
        ServerError {
            kind: ServerErrorKind::classify(&code),
            code,
            message,
        }
    }

    pub fn kind(&self) -> ServerErrorKind {
        self.kind
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn can_retry(&self) -> bool {
        matches!(
            self.kind,
            ServerErrorKind::Transient | ServerErrorKind::SessionExpired
        )
    }

    pub(crate) fn into_error(self) -> Error {
        match self.kind {
            ServerErrorKind::Authentication => Error::AuthenticationError(self.message),
            _ => Error::Server(self),
        }
    }
}

impl std::convert::From<deadpool::managed::PoolError<Error>> for Error {
    fn from(e: deadpool::managed::PoolError<Error>) -> Self {
        match e {
            deadpool::managed::PoolError::Backend(e) => e,
            _ => Error::ConnectionError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_authentication_failures() {
        let e = ServerError::new(
            "Neo.ClientError.Security.Unauthorized".into(),
            "credentials are invalid".into(),
        );
        assert_eq!(e.kind(), ServerErrorKind::Authentication);
        assert!(!e.can_retry());
    }

    #[test]
    fn classifies_transient_failures_as_retryable() {
        let e = ServerError::new(
            "Neo.TransientError.General.TransactionMemoryLimit".into(),
            "out of memory".into(),
        );
        assert_eq!(e.kind(), ServerErrorKind::Transient);
        assert!(e.can_retry());
    }

    #[test]
    fn terminated_transactions_are_not_retryable() {
        let e = ServerError::new(
            "Neo.TransientError.Transaction.Terminated".into(),
            "explicitly terminated".into(),
        );
        assert_eq!(e.kind(), ServerErrorKind::TransactionTerminated);
        assert!(!e.can_retry());
    }

    #[test]
    fn connection_errors_are_transient() {
        assert!(Error::ConnectionClosed.is_transient());
        assert!(Error::Timeout("recv").is_transient());
        assert!(!Error::NotInTransaction.is_transient());
        assert!(!Error::HandshakeRejected.is_transient());
    }
}
