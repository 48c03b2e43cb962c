//! A database transaction that rolls back unless explicitly committed.
//!
//! Diesel's closure-based `Connection::transaction` cannot span the separate
//! calls of a unit of work, so the guard drives the transaction manager
//! directly and finishes in `commit` or `Drop`.

use diesel::connection::{AnsiTransactionManager, TransactionManager};
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::result::QueryResult;

pub type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

pub struct ScopedTransaction {
    conn: PgPooledConnection,
    open: bool,
}

impl ScopedTransaction {
    pub fn begin(mut conn: PgPooledConnection) -> QueryResult<Self> {
        AnsiTransactionManager::begin_transaction(&mut *conn)?;
        Ok(Self { conn, open: true })
    }

    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.conn
    }

    pub fn commit(mut self) -> QueryResult<()> {
        // A failed COMMIT is rolled back by the transaction manager itself.
        self.open = false;
        AnsiTransactionManager::commit_transaction(&mut *self.conn)
    }
}

impl Drop for ScopedTransaction {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        match AnsiTransactionManager::rollback_transaction(&mut *self.conn) {
            Ok(()) => log::debug!("transaction rolled back"),
            Err(e) => log::error!("transaction rollback failed: {e}"),
        }
    }
}
