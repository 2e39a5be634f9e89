#![allow(dead_code)]

use std::{cell::RefCell, collections::BTreeSet, rc::Rc};

use umypony_core::{
    ConnectOptions, ConnectionPool, Error, Result, ResultSet, StatementError, Transport, Value,
};

pub const SERVER_VERSION: &str = "5.7.21-log";

#[derive(Debug)]
struct FakeServerState {
    version: Option<String>,
    database: Option<String>,
    foreign_key_checks: bool,
    isolation: Option<String>,
    tables: BTreeSet<(String, String)>,
    indexes: BTreeSet<(String, String, String)>,
    foreign_keys: BTreeSet<(String, String, String)>,
    executed_sql: Vec<String>,
    fail_on_sql: Option<String>,
    connected: bool,
    connect_count: usize,
}

impl Default for FakeServerState {
    fn default() -> Self {
        Self {
            version: Some(SERVER_VERSION.to_string()),
            database: Some("shop".to_string()),
            foreign_key_checks: true,
            isolation: None,
            tables: BTreeSet::new(),
            indexes: BTreeSet::new(),
            foreign_keys: BTreeSet::new(),
            executed_sql: Vec::new(),
            fail_on_sql: None,
            connected: false,
            connect_count: 0,
        }
    }
}

/// A tiny MySQL stand-in that understands the adapter's own statements.
///
/// Clones share one server, so a test keeps a handle for assertions after
/// moving a clone into a connection.
#[derive(Debug, Clone, Default)]
pub struct FakeServer {
    state: Rc<RefCell<FakeServerState>>,
}

#[allow(dead_code)]
impl FakeServer {
    pub fn set_version(&self, version: Option<&str>) {
        self.state.borrow_mut().version = version.map(str::to_string);
    }

    pub fn set_database(&self, database: Option<&str>) {
        self.state.borrow_mut().database = database.map(str::to_string);
    }

    pub fn set_foreign_key_checks(&self, enabled: bool) {
        self.state.borrow_mut().foreign_key_checks = enabled;
    }

    pub fn foreign_key_checks(&self) -> bool {
        self.state.borrow().foreign_key_checks
    }

    pub fn isolation(&self) -> Option<String> {
        self.state.borrow().isolation.clone()
    }

    pub fn add_table(&self, schema: &str, table: &str) {
        self.state
            .borrow_mut()
            .tables
            .insert((schema.to_string(), table.to_string()));
    }

    pub fn add_index(&self, schema: &str, table: &str, index: &str) {
        self.state.borrow_mut().indexes.insert((
            schema.to_string(),
            table.to_string(),
            index.to_string(),
        ));
    }

    pub fn add_foreign_key(&self, schema: &str, table: &str, name: &str) {
        self.state.borrow_mut().foreign_keys.insert((
            schema.to_string(),
            table.to_string(),
            name.to_string(),
        ));
    }

    pub fn set_fail_on_sql(&self, sql: impl Into<String>) {
        self.state.borrow_mut().fail_on_sql = Some(sql.into());
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.state.borrow().executed_sql.clone()
    }

    pub fn count(&self, sql: &str) -> usize {
        self.state
            .borrow()
            .executed_sql
            .iter()
            .filter(|s| s.as_str() == sql)
            .count()
    }

    pub fn connect_count(&self) -> usize {
        self.state.borrow().connect_count
    }

    /// Drop the session from the server side.
    pub fn hang_up(&self) {
        self.state.borrow_mut().connected = false;
    }
}

fn single(column: &str, value: Value) -> ResultSet {
    ResultSet::from_rows(vec![column.to_string()], vec![vec![value]])
}

fn exists(found: bool) -> ResultSet {
    let rows = if found { vec![vec![Value::BigInt(1)]] } else { Vec::new() };
    ResultSet::from_rows(vec!["1".to_string()], rows)
}

fn syntax_error(message: &str) -> Error {
    Error::Statement(StatementError {
        code: Some(1064),
        sqlstate: Some("42000".to_string()),
        message: message.to_string(),
        sql: None,
        source: None,
    })
}

fn quoted_pair(schema: &str, table: &str) -> String {
    format!("table_schema='{schema}' and table_name='{table}'")
}

impl Transport for FakeServer {
    fn connect(&mut self, options: &ConnectOptions) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.connected = true;
        state.connect_count += 1;
        if !options.database.is_empty() {
            state.database = Some(options.database.clone());
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.state.borrow_mut().connected = false;
        Ok(())
    }

    fn query(&mut self, sql: &str) -> Result<ResultSet> {
        let mut state = self.state.borrow_mut();
        if !state.connected {
            return Err(Error::disconnected("Lost connection to MySQL server during query"));
        }
        state.executed_sql.push(sql.to_string());

        if state.fail_on_sql.as_deref() == Some(sql) {
            return Err(syntax_error("injected failure"));
        }

        match sql {
            "select version()" => {
                return Ok(match &state.version {
                    Some(v) => single("version()", Value::from(v.as_str())),
                    None => ResultSet::from_rows(vec!["version()".to_string()], Vec::new()),
                });
            }
            "select database()" => {
                return Ok(single("database()", Value::from(state.database.clone())));
            }
            "SHOW VARIABLES LIKE 'foreign_key_checks'" => {
                let value = if state.foreign_key_checks { "ON" } else { "OFF" };
                return Ok(ResultSet::from_rows(
                    vec!["Variable_name".to_string(), "Value".to_string()],
                    vec![vec![Value::from("foreign_key_checks"), Value::from(value)]],
                ));
            }
            "SET foreign_key_checks = 0" => {
                state.foreign_key_checks = false;
                return Ok(ResultSet::default());
            }
            "SET foreign_key_checks = 1" => {
                state.foreign_key_checks = true;
                return Ok(ResultSet::default());
            }
            "commit" | "rollback" => return Ok(ResultSet::default()),
            _ => {}
        }

        if let Some(level) = sql.strip_prefix("SET TRANSACTION ISOLATION LEVEL ") {
            state.isolation = Some(level.to_string());
            return Ok(ResultSet::default());
        }
        if sql.starts_with("SELECT 1 FROM information_schema.tables") {
            let found = state.tables.iter().any(|(s, t)| sql.ends_with(&quoted_pair(s, t)));
            return Ok(exists(found));
        }
        if sql.starts_with("SELECT 1 FROM information_schema.statistics") {
            let found = state.indexes.iter().any(|(s, t, i)| {
                sql.contains(&quoted_pair(s, t)) && sql.ends_with(&format!("index_name='{i}'"))
            });
            return Ok(exists(found));
        }
        if sql.starts_with("SELECT 1 FROM information_schema.table_constraints") {
            let found = state.foreign_keys.iter().any(|(s, t, n)| {
                sql.contains(&quoted_pair(s, t))
                    && sql.ends_with(&format!("constraint_name='{n}'"))
            });
            return Ok(exists(found));
        }
        if sql.starts_with("INSERT") || sql.starts_with("CREATE") || sql.starts_with("ALTER") {
            return Ok(ResultSet::affected(1));
        }

        Err(syntax_error("You have an error in your SQL syntax"))
    }
}

/// A pool that only remembers what it was handed.
#[derive(Debug)]
pub struct TrackingPool<C> {
    pub idle: Vec<C>,
    pub discarded: usize,
}

impl<C> Default for TrackingPool<C> {
    fn default() -> Self {
        Self {
            idle: Vec::new(),
            discarded: 0,
        }
    }
}

impl<C> ConnectionPool<C> for TrackingPool<C> {
    fn release(&mut self, conn: C) {
        self.idle.push(conn);
    }

    fn discard(&mut self, conn: C) {
        drop(conn);
        self.discarded += 1;
    }
}
