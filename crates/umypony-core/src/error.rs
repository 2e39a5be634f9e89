//! Error types for adapter operations.

use std::fmt;

/// The primary error type for all adapter operations.
#[derive(Debug)]
pub enum Error {
    /// Transport unreachable, refused, or dropped mid-session
    Connection(ConnectionError),
    /// The server rejected a statement
    Statement(StatementError),
    /// A response the adapter cannot interpret
    Protocol(ProtocolError),
    /// Transaction-mode bookkeeping errors
    Transaction(TransactionError),
    /// Restoring session settings on release failed
    Restore(RestoreError),
    /// Parameter escaping or substitution errors
    Parameter(ParameterError),
    /// Configuration errors
    Config(ConfigError),
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Failed to establish connection
    Connect,
    /// Connection refused
    Refused,
    /// Authentication failed
    Authentication,
    /// Connection lost or closed before the call
    Disconnected,
}

/// A statement rejected by the server.
///
/// The server's message is kept verbatim; the code and SQLSTATE are
/// attached when the driver reports them.
#[derive(Debug)]
pub struct StatementError {
    pub code: Option<u16>,
    pub sqlstate: Option<String>,
    pub message: String,
    pub sql: Option<String>,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug)]
pub struct ProtocolError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug)]
pub struct TransactionError {
    pub kind: TransactionErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionErrorKind {
    /// Transaction mode was already set up for this acquisition cycle
    AlreadyActive,
}

/// `SET foreign_key_checks = 1` failed while releasing a connection.
///
/// The connection has already been discarded when this is returned.
#[derive(Debug)]
pub struct RestoreError {
    pub sql: String,
    pub source: Box<Error>,
}

#[derive(Debug)]
pub struct ParameterError {
    pub message: String,
    pub sql: Option<String>,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Is this a connection error that likely requires reconnection?
    pub fn is_connection_error(&self) -> bool {
        match self {
            Error::Connection(_) | Error::Protocol(_) => true,
            Error::Restore(e) => e.source.is_connection_error(),
            _ => false,
        }
    }

    /// Must the connection that produced this error be kept out of the pool?
    pub fn must_discard_connection(&self) -> bool {
        matches!(
            self,
            Error::Connection(_) | Error::Protocol(_) | Error::Restore(_)
        )
    }

    /// Get the server error code if available (e.g., 1062 for duplicate key)
    pub fn code(&self) -> Option<u16> {
        match self {
            Error::Statement(s) => s.code,
            Error::Restore(r) => r.source.code(),
            _ => None,
        }
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Statement(s) => s.sql.as_deref(),
            Error::Parameter(p) => p.sql.as_deref(),
            Error::Restore(r) => Some(r.sql.as_str()),
            _ => None,
        }
    }

    /// Attach the issued SQL to statement and parameter errors that lack it.
    #[must_use]
    pub fn with_sql(mut self, sql: &str) -> Self {
        match &mut self {
            Error::Statement(s) if s.sql.is_none() => s.sql = Some(sql.to_string()),
            Error::Parameter(p) if p.sql.is_none() => p.sql = Some(sql.to_string()),
            _ => {}
        }
        self
    }

    pub fn disconnected(message: impl Into<String>) -> Self {
        Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::Disconnected,
            message: message.into(),
            source: None,
        })
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Error::Protocol(ProtocolError {
            message: message.into(),
            source: None,
        })
    }

    pub fn parameter(message: impl Into<String>) -> Self {
        Error::Parameter(ParameterError {
            message: message.into(),
            sql: None,
        })
    }
}

impl StatementError {
    /// Is this a duplicate key violation?
    pub fn is_duplicate_key(&self) -> bool {
        self.code == Some(1062)
    }

    /// Is this a foreign key violation?
    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(self.code, Some(1451 | 1452))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(e) => write!(f, "Connection error: {}", e.message),
            Error::Statement(e) => write!(f, "Statement error: {e}"),
            Error::Protocol(e) => write!(f, "Protocol error: {}", e.message),
            Error::Transaction(e) => write!(f, "Transaction error: {}", e.message),
            Error::Restore(e) => write!(f, "Restore failed ({}): {}", e.sql, e.source),
            Error::Parameter(e) => write!(f, "Parameter error: {}", e.message),
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Statement(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Protocol(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Restore(e) => Some(e.source.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for StatementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, &self.sqlstate) {
            (Some(code), Some(state)) => write!(f, "({code}, {state}) {}", self.message),
            (Some(code), None) => write!(f, "({code}) {}", self.message),
            (None, Some(state)) => write!(f, "(SQLSTATE {state}) {}", self.message),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

impl From<StatementError> for Error {
    fn from(err: StatementError) -> Self {
        Error::Statement(err)
    }
}

impl From<ProtocolError> for Error {
    fn from(err: ProtocolError) -> Self {
        Error::Protocol(err)
    }
}

impl From<TransactionError> for Error {
    fn from(err: TransactionError) -> Self {
        Error::Transaction(err)
    }
}

impl From<RestoreError> for Error {
    fn from(err: RestoreError) -> Self {
        Error::Restore(err)
    }
}

impl From<ParameterError> for Error {
    fn from(err: ParameterError) -> Self {
        Error::Parameter(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, Error>;
