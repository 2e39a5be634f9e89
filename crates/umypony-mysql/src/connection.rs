//! DB-API style connection shim over a query-only transport.
//!
//! `MySqlConnection` plays both the connection and the cursor role: the
//! transport has no cursor concept, so `cursor()` hands back the same
//! object. Parameters are escaped client-side and spliced into the SQL
//! text; the most recent result set is buffered for the fetch calls.

use std::sync::Arc;

use umypony_core::{
    ConnectOptions, ConnectionError, ConnectionErrorKind, Error, Result, ResultSet, Row, Transport,
    Value,
};

use crate::config::{AdapterConfig, EscapeMode};
use crate::escape::{ConverterTable, Escaped, escape};
use crate::params::{Params, substitute};

/// Connection state as seen by the shim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// `connect` has not succeeded yet
    Disconnected,
    /// Ready for statements
    Ready,
    /// The transport reported a lost session; no further calls are made
    Broken,
    /// `close` was called
    Closed,
}

/// A MySQL connection that is also its own cursor.
pub struct MySqlConnection<T> {
    transport: T,
    state: ConnectionState,
    encoders: Arc<ConverterTable>,
    config: AdapterConfig,
    result: Option<ResultSet>,
}

impl<T> std::fmt::Debug for MySqlConnection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlConnection")
            .field("state", &self.state)
            .field("encoders", &self.encoders)
            .field("config", &self.config)
            .field("buffered_rows", &self.result.as_ref().map(ResultSet::len))
            .finish_non_exhaustive()
    }
}

impl<T: Transport> MySqlConnection<T> {
    /// Wrap a transport using the default converter table.
    pub fn new(transport: T) -> Self {
        Self::with_converters(transport, ConverterTable::default_table(), AdapterConfig::default())
    }

    /// Wrap a transport with an explicit converter table and configuration.
    pub fn with_converters(
        transport: T,
        encoders: Arc<ConverterTable>,
        config: AdapterConfig,
    ) -> Self {
        Self {
            transport,
            state: ConnectionState::Disconnected,
            encoders,
            config,
            result: None,
        }
    }

    /// Open the transport session.
    ///
    /// Any failure is reported as a connection error; the original driver
    /// error is kept as its source.
    pub fn connect(&mut self, options: &ConnectOptions) -> Result<&mut Self> {
        if self.state == ConnectionState::Ready {
            return Ok(self);
        }

        tracing::debug!(
            host = %options.host,
            port = options.port,
            database = %options.database,
            "Connecting transport"
        );
        match self.transport.connect(options) {
            Ok(()) => {
                self.state = ConnectionState::Ready;
                self.result = None;
                Ok(self)
            }
            Err(Error::Connection(e)) => Err(Error::Connection(e)),
            Err(other) => Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Connect,
                message: format!(
                    "Failed to connect to {}:{}: {}",
                    options.host, options.port, other
                ),
                source: Some(Box::new(other)),
            })),
        }
    }

    /// Close the transport session. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let previous = std::mem::replace(&mut self.state, ConnectionState::Closed);
        self.result = None;
        match previous {
            ConnectionState::Ready | ConnectionState::Broken => self.transport.close(),
            ConnectionState::Disconnected | ConnectionState::Closed => Ok(()),
        }
    }

    /// The cursor is the connection itself.
    pub fn cursor(&mut self) -> &mut Self {
        self
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Check if the connection is ready for statements.
    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Ready
    }

    /// The converter table used for parameters.
    pub fn converters(&self) -> &Arc<ConverterTable> {
        &self.encoders
    }

    pub fn config(&self) -> AdapterConfig {
        self.config
    }

    /// Borrow the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Escape one value as SQL literal text.
    pub fn literal(&self, value: &Value) -> Result<String> {
        match escape(value, &self.encoders) {
            Escaped::Literal(text) => Ok(text),
            Escaped::Unmatched(value) => match self.config.escape_mode {
                EscapeMode::PassThrough => {
                    tracing::warn!(
                        kind = ?value.kind(),
                        "No converter for parameter; inserting its text unescaped"
                    );
                    Ok(value.to_string())
                }
                EscapeMode::Strict => Err(Error::parameter(format!(
                    "no converter accepts a {} parameter",
                    value.type_name()
                ))),
            },
        }
    }

    /// Execute a statement, replacing the result buffer.
    ///
    /// With `Params::None` the template is sent verbatim. The buffer is
    /// cleared when anything fails.
    pub fn execute(&mut self, sql: &str, params: impl Into<Params>) -> Result<&ResultSet> {
        self.result = None;
        let params = params.into();
        let statement =
            substitute(sql, &params, |value| self.literal(value)).map_err(|e| e.with_sql(sql))?;
        let result = self.query(&statement)?;
        Ok(&*self.result.insert(result))
    }

    /// Send one statement to the transport without touching the result
    /// buffer.
    pub fn query(&mut self, sql: &str) -> Result<ResultSet> {
        match self.state {
            ConnectionState::Ready => {}
            ConnectionState::Disconnected => {
                return Err(Error::disconnected("Connection is not open"));
            }
            ConnectionState::Broken => {
                return Err(Error::disconnected("Connection was lost"));
            }
            ConnectionState::Closed => return Err(Error::disconnected("Connection is closed")),
        }

        if self.config.debug {
            tracing::debug!(sql = %sql, "Executing statement");
        }

        self.transport.query(sql).map_err(|e| {
            if matches!(e, Error::Connection(_)) {
                self.state = ConnectionState::Broken;
            }
            e.with_sql(sql)
        })
    }

    pub fn commit(&mut self) -> Result<()> {
        self.query("commit").map(drop)
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.query("rollback").map(drop)
    }

    /// The buffered result of the last successful `execute`.
    pub fn result(&self) -> Option<&ResultSet> {
        self.result.as_ref()
    }

    /// The first buffered row, if any.
    pub fn fetchone(&self) -> Option<&Row> {
        self.fetchall().first()
    }

    /// All buffered rows; empty before any `execute`.
    pub fn fetchall(&self) -> &[Row] {
        self.result.as_ref().map_or(&[], |rs| rs.rows.as_slice())
    }

    /// Up to `size` buffered rows.
    pub fn fetchmany(&self, size: usize) -> &[Row] {
        let rows = self.fetchall();
        &rows[..size.min(rows.len())]
    }
}
