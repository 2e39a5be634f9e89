//! Existence checks against `information_schema`.
//!
//! Every check is one parameterized `execute`; the schema and object names
//! travel as escaped parameters, never as spliced identifiers.

use umypony_core::{Result, Transport, Value};

use crate::connection::MySqlConnection;

pub const TABLE_EXISTS_SQL: &str = "SELECT 1 FROM information_schema.tables \
     WHERE table_schema=%s and table_name=%s";

pub const INDEX_EXISTS_SQL: &str = "SELECT 1 FROM information_schema.statistics \
     WHERE table_schema=%s and table_name=%s and index_name=%s";

pub const FK_EXISTS_SQL: &str = "SELECT 1 FROM information_schema.table_constraints \
     WHERE table_schema=%s and table_name=%s \
     and constraint_type='FOREIGN KEY' and constraint_name=%s";

/// A table reference split into schema and local name.
///
/// `schema` is `None` when the name carried no schema and the connection's
/// default schema is unknown; it is bound as `NULL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    pub schema: Option<String>,
    pub name: String,
}

impl QualifiedName {
    pub fn new(schema: Option<String>, name: impl Into<String>) -> Self {
        Self {
            schema,
            name: name.into(),
        }
    }

    /// Split `schema.table`; a bare name takes `default_schema`.
    ///
    /// Only the first dot separates. A name with an empty part on either
    /// side of it is kept whole as the local name.
    pub fn split(name: &str, default_schema: Option<&str>) -> Self {
        match name.split_once('.') {
            Some((schema, local)) if !schema.is_empty() && !local.is_empty() => {
                Self::new(Some(schema.to_string()), local)
            }
            _ => Self::new(default_schema.map(str::to_string), name),
        }
    }

    fn params(&self) -> Vec<Value> {
        vec![Value::from(self.schema.clone()), Value::from(self.name.as_str())]
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

pub fn table_exists<T: Transport>(
    conn: &mut MySqlConnection<T>,
    table: &QualifiedName,
) -> Result<bool> {
    any_row(conn, TABLE_EXISTS_SQL, table.params())
}

pub fn index_exists<T: Transport>(
    conn: &mut MySqlConnection<T>,
    table: &QualifiedName,
    index_name: &str,
) -> Result<bool> {
    let mut params = table.params();
    params.push(Value::from(index_name));
    any_row(conn, INDEX_EXISTS_SQL, params)
}

pub fn fk_exists<T: Transport>(
    conn: &mut MySqlConnection<T>,
    table: &QualifiedName,
    fk_name: &str,
) -> Result<bool> {
    let mut params = table.params();
    params.push(Value::from(fk_name));
    any_row(conn, FK_EXISTS_SQL, params)
}

fn any_row<T: Transport>(
    conn: &mut MySqlConnection<T>,
    sql: &str,
    params: Vec<Value>,
) -> Result<bool> {
    Ok(!conn.execute(sql, params)?.is_empty())
}
