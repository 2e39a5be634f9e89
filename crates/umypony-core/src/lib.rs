//! Core types and traits for the umypony adapter.
//!
//! This crate provides the database-independent vocabulary shared by the
//! provider crates:
//!
//! - `Value` and `Kind` for dynamically typed SQL values
//! - `Row`, `ColumnInfo` and `ResultSet` for buffered query results
//! - `Error` with one structured kind per failure class
//! - `Transport`, the boundary to a query-only wire driver
//! - `SessionOptions` / `SessionState` for per-acquisition session flags
//! - `ConnectionPool`, the boundary to the mapping engine's pool

pub mod error;
pub mod pool;
pub mod row;
pub mod session;
pub mod transport;
pub mod value;

pub use error::{
    ConfigError, ConnectionError, ConnectionErrorKind, Error, ParameterError, ProtocolError,
    RestoreError, Result, StatementError, TransactionError, TransactionErrorKind,
};
pub use pool::ConnectionPool;
pub use row::{ColumnInfo, ResultSet, Row};
pub use session::{IsolationLevel, SessionOptions, SessionState};
pub use transport::{ConnectOptions, Transport};
pub use value::{Kind, Value};
