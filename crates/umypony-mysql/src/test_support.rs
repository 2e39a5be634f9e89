//! In-memory transport and pool used by the unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use umypony_core::{ConnectOptions, ConnectionPool, Error, Result, ResultSet, Transport, Value};

#[derive(Default)]
struct Script {
    replies: VecDeque<Result<ResultSet>>,
    statements: Vec<String>,
    refuse: Option<Error>,
    connects: usize,
    closes: usize,
}

/// Transport that records every statement and answers from a queue.
///
/// Clones share the same script, so a test can keep a handle after moving
/// the transport into a connection. An empty queue answers with an empty
/// result set.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Rc<RefCell<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_result(&self, result: ResultSet) {
        self.script.borrow_mut().replies.push_back(Ok(result));
    }

    pub fn push_rows(&self, columns: &[&str], rows: Vec<Vec<Value>>) {
        let columns = columns.iter().map(|c| (*c).to_string()).collect();
        self.push_result(ResultSet::from_rows(columns, rows));
    }

    pub fn push_error(&self, error: Error) {
        self.script.borrow_mut().replies.push_back(Err(error));
    }

    pub fn refuse_connect(&self, error: Error) {
        self.script.borrow_mut().refuse = Some(error);
    }

    pub fn statements(&self) -> Vec<String> {
        self.script.borrow().statements.clone()
    }

    pub fn connect_calls(&self) -> usize {
        self.script.borrow().connects
    }

    pub fn close_calls(&self) -> usize {
        self.script.borrow().closes
    }
}

impl Transport for ScriptedTransport {
    fn connect(&mut self, _options: &ConnectOptions) -> Result<()> {
        let mut script = self.script.borrow_mut();
        script.connects += 1;
        match script.refuse.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.script.borrow_mut().closes += 1;
        Ok(())
    }

    fn query(&mut self, sql: &str) -> Result<ResultSet> {
        let mut script = self.script.borrow_mut();
        script.statements.push(sql.to_string());
        script
            .replies
            .pop_front()
            .unwrap_or_else(|| Ok(ResultSet::default()))
    }
}

/// Pool that keeps whatever it is handed.
pub struct RecordingPool<C> {
    pub released: Vec<C>,
    pub discarded: Vec<C>,
}

impl<C> RecordingPool<C> {
    pub fn new() -> Self {
        Self {
            released: Vec::new(),
            discarded: Vec::new(),
        }
    }
}

impl<C> ConnectionPool<C> for RecordingPool<C> {
    fn release(&mut self, conn: C) {
        self.released.push(conn);
    }

    fn discard(&mut self, conn: C) {
        self.discarded.push(conn);
    }
}
