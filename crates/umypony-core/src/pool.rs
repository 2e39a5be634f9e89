//! The boundary to the mapping engine's connection pool.
//!
//! Pooling itself lives outside the adapter. The provider only needs to
//! hand a connection back for reuse or make sure it never comes back.

/// Where released connections go.
pub trait ConnectionPool<C> {
    /// Return a healthy connection for reuse.
    fn release(&mut self, conn: C);

    /// Remove a connection whose session state is unknown.
    ///
    /// The pool must never hand this connection out again.
    fn discard(&mut self, conn: C);
}

impl<C, P: ConnectionPool<C> + ?Sized> ConnectionPool<C> for &mut P {
    fn release(&mut self, conn: C) {
        (**self).release(conn);
    }

    fn discard(&mut self, conn: C) {
        (**self).discard(conn);
    }
}
