//! Per-account sync token issuance.
//!
//! The account row is the only serialization point of the engine. Every token
//! comes from a single `UPDATE ... RETURNING` on that row, so two committed
//! issuances for the same account can never observe the same value, and the
//! later commit always observes the larger one.

use crate::rows::DbResultExt;
use rolodex_core::{AccountId, RolodexResult, StorageError, SyncToken};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};

/// Issues monotonically increasing sync tokens per account.
///
/// Implementations only ever expose increment-and-get; the raw counter is
/// never writable through this trait.
pub trait VersionAuthority: Send + Sync {
    /// Increment the account's counter inside the caller's transaction.
    fn increment_in(&self, tx: &Transaction<'_>, account_id: AccountId)
        -> RolodexResult<SyncToken>;

    /// Increment the account's counter in a transaction of its own.
    fn increment_and_get(
        &self,
        conn: &mut Connection,
        account_id: AccountId,
    ) -> RolodexResult<SyncToken> {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .db()?;
        let token = self.increment_in(&tx, account_id)?;
        tx.commit().db()?;
        Ok(token)
    }
}

/// Token authority backed by the `accounts.sync_counter` column.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlVersionAuthority;

impl VersionAuthority for SqlVersionAuthority {
    fn increment_in(
        &self,
        tx: &Transaction<'_>,
        account_id: AccountId,
    ) -> RolodexResult<SyncToken> {
        let token: Option<SyncToken> = tx
            .prepare_cached(
                "UPDATE accounts SET sync_counter = sync_counter + 1 \
                 WHERE id = ?1 RETURNING sync_counter",
            )
            .db()?
            .query_row([account_id], |r| r.get(0))
            .optional()
            .db()?;

        let token = token.ok_or(StorageError::AccountNotFound { account_id })?;
        tracing::trace!(account_id, token, "Issued sync token");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::bootstrap;
    use rolodex_core::RolodexError;
    use rusqlite::params;

    fn conn_with_account() -> (Connection, AccountId) {
        let conn = Connection::open_in_memory().unwrap();
        bootstrap(&conn).unwrap();
        conn.execute(
            "INSERT INTO accounts (name, created_at_ms) VALUES (?1, 0)",
            params!["test"],
        )
        .unwrap();
        let id = conn.last_insert_rowid();
        (conn, id)
    }

    #[test]
    fn test_increment_starts_at_one() {
        let (mut conn, account) = conn_with_account();
        let token = SqlVersionAuthority.increment_and_get(&mut conn, account).unwrap();
        assert_eq!(token, 1);
    }

    #[test]
    fn test_increment_is_strictly_increasing() {
        let (mut conn, account) = conn_with_account();
        let mut last = 0;
        for _ in 0..50 {
            let token = SqlVersionAuthority.increment_and_get(&mut conn, account).unwrap();
            assert!(token > last);
            last = token;
        }
        assert_eq!(last, 50);
    }

    #[test]
    fn test_missing_account() {
        let (mut conn, _) = conn_with_account();
        let err = SqlVersionAuthority.increment_and_get(&mut conn, 999).unwrap_err();
        assert_eq!(
            err,
            RolodexError::Storage(StorageError::AccountNotFound { account_id: 999 })
        );
    }

    #[test]
    fn test_rolled_back_increment_is_not_observed() {
        let (mut conn, account) = conn_with_account();
        {
            let tx = conn.transaction().unwrap();
            assert_eq!(SqlVersionAuthority.increment_in(&tx, account).unwrap(), 1);
            // dropped without commit
        }
        let token = SqlVersionAuthority.increment_and_get(&mut conn, account).unwrap();
        assert_eq!(token, 1);
    }

    #[test]
    fn test_accounts_are_independent() {
        let (mut conn, a) = conn_with_account();
        conn.execute(
            "INSERT INTO accounts (name, created_at_ms) VALUES ('other', 0)",
            [],
        )
        .unwrap();
        let b = conn.last_insert_rowid();
        SqlVersionAuthority.increment_and_get(&mut conn, a).unwrap();
        SqlVersionAuthority.increment_and_get(&mut conn, a).unwrap();
        assert_eq!(SqlVersionAuthority.increment_and_get(&mut conn, b).unwrap(), 1);
    }
}
