//! Version stamping and the reconciliation sweep.
//!
//! Content writes and stamps are separate transactions. A write marks the
//! contact `stamp_pending`; the stamp issues a token, writes `version_token`,
//! `last_modified_token` and a fresh etag, and clears the flag. A failed stamp
//! is logged and swallowed, leaving the flag set for [`ContactStore::restamp_pending`].

use crate::rows::{self, DbResultExt};
use crate::ContactStore;
use rolodex_core::{
    compute_etag, AccountId, ContactId, OpContext, RolodexResult, StorageError, SyncToken,
};
use rusqlite::{params, TransactionBehavior};

impl ContactStore {
    /// Issue a token and stamp one active contact in a single transaction.
    pub(crate) fn stamp_contact(
        &self,
        account_id: AccountId,
        contact_id: ContactId,
    ) -> RolodexResult<SyncToken> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .db()?;

        let token = self.authority().increment_in(&tx, account_id)?;
        let contact = rows::load_aggregate(&tx, account_id, contact_id)?;
        let etag = compute_etag(&contact.fingerprint_bytes(), token);

        tx.execute(
            "UPDATE contacts SET version_token = ?1, last_modified_token = ?1, etag = ?2, \
             stamp_pending = 0 WHERE id = ?3 AND account_id = ?4 AND deleted_at_ms IS NULL",
            params![token, etag, contact_id, account_id],
        )
        .db()?;
        tx.commit().db()?;

        tracing::debug!(account_id, contact_id, token, "Contact stamped");
        Ok(token)
    }

    /// Stamp after a committed content write. Failures are logged, not returned.
    pub(crate) fn stamp_after_commit(&self, account_id: AccountId, contact_id: ContactId) {
        if let Err(e) = self.stamp_contact(account_id, contact_id) {
            let failure = StorageError::StampFailure {
                contact_id,
                reason: e.to_string(),
            };
            tracing::warn!(
                account_id,
                contact_id,
                error = %failure,
                "Contact write committed without a new sync token"
            );
        }
    }

    /// Re-stamp contacts whose content committed but whose stamp failed.
    ///
    /// Returns the number of contacts stamped. Individual failures are logged
    /// and left for the next sweep.
    pub fn restamp_pending(&self, ctx: &OpContext, limit: usize) -> RolodexResult<usize> {
        ctx.check()?;
        let pending: Vec<(AccountId, ContactId)> = {
            let conn = self.lock()?;
            let mut stmt = conn
                .prepare_cached(
                    "SELECT account_id, id FROM contacts \
                     WHERE stamp_pending = 1 AND deleted_at_ms IS NULL ORDER BY id LIMIT ?1",
                )
                .db()?;
            let limit = i64::try_from(limit).unwrap_or(i64::MAX);
            let rows = stmt
                .query_map([limit], |r| Ok((r.get(0)?, r.get(1)?)))
                .db()?
                .collect::<rusqlite::Result<Vec<_>>>()
                .db()?;
            rows
        };

        let mut stamped = 0;
        for (account_id, contact_id) in pending {
            ctx.check()?;
            match self.stamp_contact(account_id, contact_id) {
                Ok(_) => stamped += 1,
                Err(e) => {
                    tracing::warn!(account_id, contact_id, error = %e, "Re-stamp failed");
                }
            }
        }

        if stamped > 0 {
            tracing::info!(stamped, "Re-stamped contacts with pending sync tokens");
        }
        Ok(stamped)
    }

    /// Ids of active contacts still waiting for a stamp, ascending.
    pub fn pending_contact_ids(&self, ctx: &OpContext) -> RolodexResult<Vec<ContactId>> {
        ctx.check()?;
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare_cached(
                "SELECT id FROM contacts WHERE stamp_pending = 1 AND deleted_at_ms IS NULL ORDER BY id",
            )
            .db()?;
        let ids = stmt
            .query_map([], |r| r.get(0))
            .db()?
            .collect::<rusqlite::Result<Vec<_>>>()
            .db()?;
        Ok(ids)
    }

    /// Number of active contacts still waiting for a stamp.
    pub fn pending_stamp_count(&self, ctx: &OpContext) -> RolodexResult<usize> {
        ctx.check()?;
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM contacts WHERE stamp_pending = 1 AND deleted_at_ms IS NULL",
                [],
                |r| r.get(0),
            )
            .db()?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolodex_core::Contact;

    fn flag_pending(store: &ContactStore, contact_id: ContactId) {
        store
            .lock()
            .unwrap()
            .execute("UPDATE contacts SET stamp_pending = 1 WHERE id = ?1", [contact_id])
            .unwrap();
    }

    #[test]
    fn test_restamp_clears_pending_and_issues_token() {
        let store = ContactStore::open_in_memory().unwrap();
        let ctx = OpContext::background();
        let account = store.create_account(&ctx, "stamp").unwrap().account_id;
        let created = store
            .create_contact(&ctx, account, &Contact::named("Ann", "Lee"))
            .unwrap();
        assert!(store.pending_contact_ids(&ctx).unwrap().is_empty());

        flag_pending(&store, created.contact_id);
        assert_eq!(
            store.pending_contact_ids(&ctx).unwrap(),
            vec![created.contact_id]
        );

        assert_eq!(store.restamp_pending(&ctx, 10).unwrap(), 1);
        assert_eq!(store.pending_stamp_count(&ctx).unwrap(), 0);
        let read = store.read_contact(&ctx, account, created.contact_id).unwrap();
        assert_eq!(read.version_token, created.version_token + 1);
        assert_eq!(read.last_modified_token, read.version_token);
        assert_ne!(read.etag, created.etag);
    }

    #[test]
    fn test_restamp_honours_limit() {
        let store = ContactStore::open_in_memory().unwrap();
        let ctx = OpContext::background();
        let account = store.create_account(&ctx, "stamp").unwrap().account_id;
        for name in ["A", "B", "C"] {
            let c = store
                .create_contact(&ctx, account, &Contact::named(name, "X"))
                .unwrap();
            flag_pending(&store, c.contact_id);
        }
        assert_eq!(store.restamp_pending(&ctx, 2).unwrap(), 2);
        assert_eq!(store.pending_stamp_count(&ctx).unwrap(), 1);
    }

    #[test]
    fn test_stamp_skips_tombstoned_contact() {
        let store = ContactStore::open_in_memory().unwrap();
        let ctx = OpContext::background();
        let account = store.create_account(&ctx, "stamp").unwrap().account_id;
        let c = store
            .create_contact(&ctx, account, &Contact::named("A", "B"))
            .unwrap();
        let token = store.delete_contact(&ctx, account, c.contact_id).unwrap();

        assert!(store.stamp_contact(account, c.contact_id).unwrap_err().is_not_found());
        assert_eq!(store.current_token(&ctx, account).unwrap(), token);
    }
}
