//! Per-acquisition session flags.
//!
//! A `SessionState` lives for one checkout of a connection from the pool.
//! Only the provider's transaction-mode hooks mutate it, and the release
//! path consumes it.

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Read uncommitted: dirty reads, non-repeatable reads, and phantoms possible.
    ReadUncommitted,

    /// Read committed: only committed changes from others are visible.
    ReadCommitted,

    /// Repeatable read: a consistent snapshot for the whole transaction.
    /// This is the InnoDB default.
    #[default]
    RepeatableRead,

    /// Serializable: transactions appear to execute sequentially.
    Serializable,
}

impl IsolationLevel {
    /// Get the SQL syntax for this isolation level.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// What the mapping engine's session needs from the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionOptions {
    /// The session will issue DDL
    pub ddl: bool,
    /// The session requires serializable isolation
    pub serializable: bool,
}

impl SessionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ddl(mut self, ddl: bool) -> Self {
        self.ddl = ddl;
        self
    }

    pub fn serializable(mut self, serializable: bool) -> Self {
        self.serializable = serializable;
        self
    }
}

/// Mutable flags for one connection-acquisition cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// The session this connection serves, if any
    pub options: Option<SessionOptions>,
    /// Transaction-mode setup has issued session statements
    pub in_transaction: bool,
    /// The adapter has started a real transaction rather than deferring
    pub immediate: bool,
    /// Foreign-key checks observed before a DDL session suspended them.
    /// `Some(true)` means a restore is owed on release.
    pub saved_fk_state: Option<bool>,
}

impl SessionState {
    /// Fresh state for a session with the given options.
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options: Some(options),
            ..Self::default()
        }
    }

    /// Fresh state for a checkout with no session attached.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn is_ddl(&self) -> bool {
        self.options.is_some_and(|o| o.ddl)
    }

    pub fn is_serializable(&self) -> bool {
        self.options.is_some_and(|o| o.serializable)
    }

    /// Does releasing this connection owe `SET foreign_key_checks = 1`?
    pub fn restore_owed(&self) -> bool {
        self.is_ddl() && self.saved_fk_state == Some(true)
    }

    /// Forget everything recorded during the cycle, keeping the options.
    pub fn reset(&mut self) {
        self.in_transaction = false;
        self.immediate = false;
        self.saved_fk_state = None;
    }
}
