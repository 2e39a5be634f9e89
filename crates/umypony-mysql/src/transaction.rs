//! Session-level transaction mode: foreign-key checks around DDL and
//! serializable isolation.
//!
//! Setup runs at most once per acquisition cycle. DDL sessions probe
//! `foreign_key_checks` and switch it off when it is on, which leaves a
//! restore owed until the connection is released. Isolation is never
//! restored; it lasts for the rest of the MySQL session.

use umypony_core::{
    Error, IsolationLevel, RestoreError, Result, SessionState, TransactionError,
    TransactionErrorKind, Transport, Value,
};

use crate::connection::MySqlConnection;

pub const FK_PROBE_SQL: &str = "SHOW VARIABLES LIKE 'foreign_key_checks'";
pub const FK_DISABLE_SQL: &str = "SET foreign_key_checks = 0";
pub const FK_RESTORE_SQL: &str = "SET foreign_key_checks = 1";

/// `SET TRANSACTION ISOLATION LEVEL ...` for `level`.
pub fn isolation_statement(level: IsolationLevel) -> String {
    format!("SET TRANSACTION ISOLATION LEVEL {}", level.as_sql())
}

/// Prepare the connection for the session described by `session`.
///
/// Fails with `TransactionErrorKind::AlreadyActive` if setup already ran in
/// this cycle; no statement is issued in that case.
pub fn set_transaction_mode<T: Transport>(
    conn: &mut MySqlConnection<T>,
    session: &mut SessionState,
) -> Result<()> {
    if session.in_transaction {
        return Err(Error::Transaction(TransactionError {
            kind: TransactionErrorKind::AlreadyActive,
            message: "transaction mode is already set for this connection".to_string(),
        }));
    }

    if session.is_ddl() {
        let enabled = foreign_key_checks_enabled(conn)?;
        if enabled {
            tracing::debug!("Suspending foreign key checks for DDL session");
            conn.query(FK_DISABLE_SQL)?;
        }
        session.saved_fk_state = Some(enabled);
        session.in_transaction = true;
    }

    session.immediate = true;

    if session.is_serializable() {
        conn.query(&isolation_statement(IsolationLevel::Serializable))?;
        session.in_transaction = true;
    }

    Ok(())
}

/// Issue the owed `SET foreign_key_checks = 1`, if any.
///
/// Returns whether a restore statement was sent. A failure comes back as
/// `Error::Restore`.
pub fn restore_session<T: Transport>(
    conn: &mut MySqlConnection<T>,
    session: &SessionState,
) -> Result<bool> {
    if !session.restore_owed() {
        return Ok(false);
    }

    tracing::debug!("Restoring foreign key checks");
    conn.query(FK_RESTORE_SQL).map_err(|e| {
        Error::Restore(RestoreError {
            sql: FK_RESTORE_SQL.to_string(),
            source: Box::new(e),
        })
    })?;
    Ok(true)
}

/// Probe `foreign_key_checks`; a missing row reads as off.
fn foreign_key_checks_enabled<T: Transport>(conn: &mut MySqlConnection<T>) -> Result<bool> {
    let result = conn.query(FK_PROBE_SQL)?;
    Ok(result
        .rows
        .first()
        .and_then(|row| row.get(1))
        .is_some_and(is_on))
}

fn is_on(value: &Value) -> bool {
    match value {
        Value::Bytes(b) => b.eq_ignore_ascii_case(b"ON"),
        other => other
            .as_str()
            .map_or_else(|| other.as_i64() == Some(1), |s| s.eq_ignore_ascii_case("ON")),
    }
}
