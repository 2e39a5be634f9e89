//! The MySQL provider: dialect metadata, connection inspection and the
//! session lifecycle hooks the mapping engine binds to.

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use umypony_core::{
    ConnectOptions, ConnectionPool, Error, Kind, Result, SessionState, Transport, Value,
};

use crate::config::AdapterConfig;
use crate::connection::MySqlConnection;
use crate::escape::ConverterTable;
use crate::inspect::{self, QualifiedName};
use crate::transaction;

static VERSION_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)+").expect("version pattern is valid"));

/// Servers from this version on store fractional seconds.
const FRACTIONAL_SECONDS_SINCE: [u32; 3] = [5, 6, 4];

/// A dotted server version, compared component by component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerVersion(Vec<u32>);

impl ServerVersion {
    pub fn new(parts: &[u32]) -> Self {
        Self(parts.to_vec())
    }

    /// Parse the leading dotted number of a `version()` string, such as
    /// `5.7.21` out of `5.7.21-log`.
    pub fn parse(text: &str) -> Result<Self> {
        let matched = VERSION_PREFIX
            .find(text.trim())
            .ok_or_else(|| Error::protocol(format!("unrecognized server version {text:?}")))?;

        matched
            .as_str()
            .split('.')
            .map(|part| {
                part.parse::<u32>().map_err(|_| {
                    Error::protocol(format!("server version component out of range in {text:?}"))
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    pub fn parts(&self) -> &[u32] {
        &self.0
    }

    pub fn at_least(&self, parts: &[u32]) -> bool {
        self.0.as_slice() >= parts
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

/// Column converter classes the mapping engine picks per attribute kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnConverter {
    Bool,
    Text,
    Int,
    Real,
    Decimal,
    Blob,
    DateTime,
    Date,
    Time,
    Uuid,
    Json,
}

impl ColumnConverter {
    /// Column type for DDL. Temporal types carry `max_time_precision`
    /// fractional digits when it is non-zero.
    pub fn sql_type(self, max_time_precision: u8) -> String {
        match self {
            ColumnConverter::Bool => "BOOLEAN".to_string(),
            ColumnConverter::Text => "LONGTEXT".to_string(),
            ColumnConverter::Int => "BIGINT".to_string(),
            ColumnConverter::Real => "DOUBLE".to_string(),
            ColumnConverter::Decimal => "DECIMAL(12, 2)".to_string(),
            ColumnConverter::Blob => "LONGBLOB".to_string(),
            ColumnConverter::DateTime => with_precision("DATETIME", max_time_precision),
            ColumnConverter::Date => "DATE".to_string(),
            ColumnConverter::Time => with_precision("TIME", max_time_precision),
            ColumnConverter::Uuid => "BINARY(16)".to_string(),
            ColumnConverter::Json => "JSON".to_string(),
        }
    }
}

fn with_precision(base: &str, precision: u8) -> String {
    if precision == 0 {
        base.to_string()
    } else {
        format!("{base}({precision})")
    }
}

const CONVERTER_CLASSES: &[(Kind, ColumnConverter)] = &[
    (Kind::Bool, ColumnConverter::Bool),
    (Kind::Text, ColumnConverter::Text),
    (Kind::Integer, ColumnConverter::Int),
    (Kind::Float, ColumnConverter::Real),
    (Kind::Decimal, ColumnConverter::Decimal),
    (Kind::Binary, ColumnConverter::Blob),
    (Kind::DateTime, ColumnConverter::DateTime),
    (Kind::Date, ColumnConverter::Date),
    (Kind::Time, ColumnConverter::Time),
    (Kind::Uuid, ColumnConverter::Uuid),
    (Kind::Json, ColumnConverter::Json),
];

/// MySQL provider bound by the mapping engine.
///
/// Dialect facts are associated constants. Server-dependent facts are
/// filled in by [`MySqlProvider::inspect_connection`].
#[derive(Debug, Clone)]
pub struct MySqlProvider {
    encoders: Arc<ConverterTable>,
    config: AdapterConfig,
    server_version: Option<ServerVersion>,
    max_time_precision: u8,
    default_schema: Option<String>,
}

impl Default for MySqlProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MySqlProvider {
    pub const DIALECT: &'static str = "MySQL";
    pub const PARAMSTYLE: &'static str = "format";
    pub const QUOTE_CHAR: char = '`';
    pub const MAX_NAME_LEN: usize = 64;
    pub const TABLE_IF_NOT_EXISTS_SYNTAX: bool = true;
    pub const INDEX_IF_NOT_EXISTS_SYNTAX: bool = false;
    pub const SELECT_FOR_UPDATE_NOWAIT_SYNTAX: bool = false;
    pub const DEFAULT_TIME_PRECISION: u8 = 0;

    pub fn new() -> Self {
        Self::with_config(AdapterConfig::default())
    }

    pub fn with_config(config: AdapterConfig) -> Self {
        Self::with_converters(ConverterTable::default_table(), config)
    }

    /// Provider whose connections escape with `encoders`.
    pub fn with_converters(encoders: Arc<ConverterTable>, config: AdapterConfig) -> Self {
        Self {
            encoders,
            config,
            server_version: None,
            max_time_precision: Self::DEFAULT_TIME_PRECISION,
            default_schema: None,
        }
    }

    pub fn converters(&self) -> &Arc<ConverterTable> {
        &self.encoders
    }

    pub fn config(&self) -> AdapterConfig {
        self.config
    }

    /// Version seen by the last `inspect_connection`.
    pub fn server_version(&self) -> Option<&ServerVersion> {
        self.server_version.as_ref()
    }

    pub fn max_time_precision(&self) -> u8 {
        self.max_time_precision
    }

    pub fn default_time_precision(&self) -> u8 {
        Self::DEFAULT_TIME_PRECISION
    }

    /// Schema selected on the inspected connection, if any.
    pub fn default_schema(&self) -> Option<&str> {
        self.default_schema.as_deref()
    }

    /// Converter classes in lookup order.
    pub fn converter_classes(&self) -> &'static [(Kind, ColumnConverter)] {
        CONVERTER_CLASSES
    }

    /// The first converter class compatible with `kind`.
    pub fn converter_for(&self, kind: Kind) -> Option<ColumnConverter> {
        CONVERTER_CLASSES
            .iter()
            .find(|(class_kind, _)| class_kind.accepts(kind))
            .map(|(_, converter)| *converter)
    }

    /// Open a connection that shares this provider's converters and config.
    pub fn connect<T: Transport>(
        &self,
        transport: T,
        options: &ConnectOptions,
    ) -> Result<MySqlConnection<T>> {
        let mut conn =
            MySqlConnection::with_converters(transport, Arc::clone(&self.encoders), self.config);
        conn.connect(options)?;
        Ok(conn)
    }

    /// Read the server version and default schema from a fresh connection.
    ///
    /// A version query with no row is a protocol error and nothing further
    /// is queried.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn inspect_connection<T: Transport>(
        &mut self,
        conn: &mut MySqlConnection<T>,
    ) -> Result<()> {
        let cursor = conn.cursor();
        cursor.execute("select version()", ())?;
        let raw = first_text(cursor)
            .flatten()
            .ok_or_else(|| Error::protocol("select version() returned no row"))?;
        let version = ServerVersion::parse(&raw)?;

        self.max_time_precision = if version.at_least(&FRACTIONAL_SECONDS_SINCE) {
            6
        } else {
            Self::DEFAULT_TIME_PRECISION
        };
        tracing::debug!(
            version = %version,
            max_time_precision = self.max_time_precision,
            "Inspected server"
        );
        self.server_version = Some(version);

        cursor.execute("select database()", ())?;
        self.default_schema = first_text(cursor)
            .ok_or_else(|| Error::protocol("select database() returned no row"))?;
        Ok(())
    }

    /// Apply the session's transaction mode before its first statement.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn set_transaction_mode<T: Transport>(
        &self,
        conn: &mut MySqlConnection<T>,
        session: &mut SessionState,
    ) -> Result<()> {
        transaction::set_transaction_mode(conn, session)
    }

    /// Hand a connection back to `pool` at the end of an acquisition cycle.
    ///
    /// An owed foreign-key restore is issued first. If it fails the
    /// connection is discarded and `Error::Restore` is returned. Otherwise
    /// open work is rolled back and the connection is released; a failing
    /// rollback also discards it. The session state is reset either way.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn release<T, P>(
        &self,
        pool: &mut P,
        mut conn: MySqlConnection<T>,
        session: Option<&mut SessionState>,
    ) -> Result<()>
    where
        T: Transport,
        P: ConnectionPool<MySqlConnection<T>> + ?Sized,
    {
        let restored = match session.as_deref() {
            Some(state) => transaction::restore_session(&mut conn, state).map(drop),
            None => Ok(()),
        };
        let outcome = restored.and_then(|()| conn.rollback());

        if let Some(state) = session {
            state.reset();
        }

        match outcome {
            Ok(()) => {
                pool.release(conn);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Discarding connection on release");
                pool.discard(conn);
                Err(e)
            }
        }
    }

    /// Split `schema.table`, falling back to the default schema.
    pub fn split_table_name(&self, table_name: &str) -> QualifiedName {
        QualifiedName::split(table_name, self.default_schema())
    }

    pub fn table_exists<T: Transport>(
        &self,
        conn: &mut MySqlConnection<T>,
        table_name: &str,
    ) -> Result<bool> {
        inspect::table_exists(conn, &self.split_table_name(table_name))
    }

    pub fn index_exists<T: Transport>(
        &self,
        conn: &mut MySqlConnection<T>,
        table_name: &str,
        index_name: &str,
    ) -> Result<bool> {
        inspect::index_exists(conn, &self.split_table_name(table_name), index_name)
    }

    pub fn fk_exists<T: Transport>(
        &self,
        conn: &mut MySqlConnection<T>,
        table_name: &str,
        fk_name: &str,
    ) -> Result<bool> {
        inspect::fk_exists(conn, &self.split_table_name(table_name), fk_name)
    }
}

/// First column of the first buffered row: `None` without a row,
/// `Some(None)` for SQL `NULL`.
fn first_text<T: Transport>(conn: &MySqlConnection<T>) -> Option<Option<String>> {
    let value = conn.fetchone()?.get(0)?;
    Some(match value {
        Value::Null => None,
        Value::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
        other => Some(other.to_string()),
    })
}
