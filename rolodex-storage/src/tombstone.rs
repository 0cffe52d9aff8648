//! Soft deletion and tombstone purge.
//!
//! Deleting a contact removes its child rows and stamps the parent in the
//! same transaction, so the deletion is visible to the change feed the moment
//! it commits. Tombstones are kept until they age past the retention window.

use crate::rows::{self, DbResultExt};
use crate::schema::CHILD_TABLES;
use crate::ContactStore;
use chrono::Utc;
use rolodex_core::{
    tombstone_etag, AccountId, ContactId, EntityType, OpContext, RolodexError, RolodexResult,
    SyncToken, Timestamp,
};
use rusqlite::{params, TransactionBehavior};

impl ContactStore {
    /// Tombstone an active contact.
    ///
    /// Returns the token stamped on the tombstone. Fails with `NotFound` for
    /// a missing, foreign, or already deleted contact.
    pub fn delete_contact(
        &self,
        ctx: &OpContext,
        account_id: AccountId,
        contact_id: ContactId,
    ) -> RolodexResult<SyncToken> {
        ctx.check()?;
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .db()?;

        let active: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM contacts \
                 WHERE id = ?1 AND account_id = ?2 AND deleted_at_ms IS NULL",
                params![contact_id, account_id],
                |r| r.get(0),
            )
            .db()?;
        if active == 0 {
            return Err(RolodexError::not_found(EntityType::Contact, contact_id));
        }

        for table in CHILD_TABLES {
            ctx.check()?;
            tx.execute(&format!("DELETE FROM {} WHERE contact_id = ?1", table), [contact_id])
                .db()?;
        }

        let token = self.authority().increment_in(&tx, account_id)?;
        let now = rows::now_ms();
        let changed = tx
            .execute(
                "UPDATE contacts SET deleted_at_ms = ?1, updated_at_ms = ?1, \
                 version_token = ?2, last_modified_token = ?2, etag = ?3, stamp_pending = 0 \
                 WHERE id = ?4 AND account_id = ?5 AND deleted_at_ms IS NULL",
                params![now, token, tombstone_etag(token), contact_id, account_id],
            )
            .db()?;
        if changed == 0 {
            return Err(RolodexError::not_found(EntityType::Contact, contact_id));
        }

        ctx.check()?;
        tx.commit().db()?;
        tracing::debug!(account_id, contact_id, token, "Contact tombstoned");
        Ok(token)
    }

    /// Purge tombstones older than the configured retention, measured from now.
    pub fn purge_tombstones(&self, ctx: &OpContext) -> RolodexResult<usize> {
        self.purge_tombstones_at(ctx, Utc::now())
    }

    /// Purge tombstones older than the configured retention, measured from `now`.
    pub fn purge_tombstones_at(&self, ctx: &OpContext, now: Timestamp) -> RolodexResult<usize> {
        self.purge_tombstones_before(ctx, self.tombstone_cutoff_ms(now), usize::MAX)
    }

    /// Deletion time before which a tombstone has outlived the retention
    /// window, as seen at `now`.
    pub fn tombstone_cutoff_ms(&self, now: Timestamp) -> i64 {
        let retention_ms =
            i64::try_from(self.config().tombstone_retention().as_millis()).unwrap_or(i64::MAX);
        rows::to_ms(now).saturating_sub(retention_ms)
    }

    /// Permanently remove up to `limit` tombstones deleted before `cutoff_ms`.
    ///
    /// Rows are removed one at a time; a failure leaves earlier removals in
    /// place. Edges other contacts hold to a purged contact go with it.
    pub fn purge_tombstones_before(
        &self,
        ctx: &OpContext,
        cutoff_ms: i64,
        limit: usize,
    ) -> RolodexResult<usize> {
        ctx.check()?;
        let expired: Vec<ContactId> = {
            let conn = self.lock()?;
            let limit = i64::try_from(limit).unwrap_or(i64::MAX);
            let ids = conn
                .prepare_cached(
                    "SELECT id FROM contacts \
                     WHERE deleted_at_ms IS NOT NULL AND deleted_at_ms < ?1 ORDER BY id LIMIT ?2",
                )
                .db()?
                .query_map(params![cutoff_ms, limit], |r| r.get(0))
                .db()?
                .collect::<rusqlite::Result<Vec<_>>>()
                .db()?;
            ids
        };

        let mut purged = 0;
        for contact_id in expired {
            ctx.check()?;
            let conn = self.lock()?;
            purged += conn
                .execute(
                    "DELETE FROM contacts WHERE id = ?1 AND deleted_at_ms IS NOT NULL",
                    [contact_id],
                )
                .db()?;
        }

        if purged > 0 {
            tracing::info!(purged, cutoff_ms, "Purged expired tombstones");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rolodex_core::{Contact, Email, Relationship, StoreConfig, TOMBSTONE_ETAG_PREFIX};

    fn setup() -> (ContactStore, OpContext, AccountId) {
        let store = ContactStore::open_in_memory().unwrap();
        let ctx = OpContext::background();
        let account = store.create_account(&ctx, "graveyard").unwrap();
        (store, ctx, account.account_id)
    }

    #[test]
    fn test_delete_stamps_tombstone() {
        let (store, ctx, account) = setup();
        let mut contact = Contact::named("Ann", "Lee");
        contact.emails.push(Email {
            address: "ann@example.com".to_string(),
            ..Email::default()
        });
        let created = store.create_contact(&ctx, account, &contact).unwrap();

        let token = store
            .delete_contact(&ctx, account, created.contact_id)
            .unwrap();
        assert_eq!(token, created.version_token + 1);

        let changes = store
            .list_changed_since(&ctx, account, created.version_token)
            .unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].etag, format!("{}{}", TOMBSTONE_ETAG_PREFIX, token));
        assert!(changes[0].is_deletion());

        let remaining: i64 = store
            .lock()
            .unwrap()
            .query_row(
                "SELECT COUNT(*) FROM contact_emails WHERE contact_id = ?1",
                [created.contact_id],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_delete_twice_is_not_found() {
        let (store, ctx, account) = setup();
        let created = store
            .create_contact(&ctx, account, &Contact::named("A", "B"))
            .unwrap();
        store.delete_contact(&ctx, account, created.contact_id).unwrap();
        let before = store.current_token(&ctx, account).unwrap();

        let err = store
            .delete_contact(&ctx, account, created.contact_id)
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.current_token(&ctx, account).unwrap(), before);
        assert!(store
            .read_contact(&ctx, account, created.contact_id)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_delete_from_other_account_is_not_found() {
        let (store, ctx, account) = setup();
        let other = store.create_account(&ctx, "other").unwrap();
        let created = store
            .create_contact(&ctx, account, &Contact::named("A", "B"))
            .unwrap();
        assert!(store
            .delete_contact(&ctx, other.account_id, created.contact_id)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_purge_respects_retention() {
        let store = ContactStore::open(StoreConfig {
            tombstone_retention_days: 7,
            ..StoreConfig::in_memory()
        })
        .unwrap();
        let ctx = OpContext::background();
        let account = store.create_account(&ctx, "a").unwrap().account_id;
        let created = store
            .create_contact(&ctx, account, &Contact::named("A", "B"))
            .unwrap();
        store.delete_contact(&ctx, account, created.contact_id).unwrap();

        let now = Utc::now();
        assert_eq!(store.purge_tombstones_at(&ctx, now).unwrap(), 0);
        assert_eq!(
            store
                .purge_tombstones_at(&ctx, now + Duration::days(8))
                .unwrap(),
            1
        );
        assert!(store.list_changed_since(&ctx, account, 0).unwrap().is_empty());
    }

    #[test]
    fn test_huge_retention_purges_nothing() {
        let store = ContactStore::open(StoreConfig {
            tombstone_retention_days: u64::MAX / 10,
            ..StoreConfig::in_memory()
        })
        .unwrap();
        let ctx = OpContext::background();
        let account = store.create_account(&ctx, "forever").unwrap().account_id;
        let created = store
            .create_contact(&ctx, account, &Contact::named("A", "B"))
            .unwrap();
        store.delete_contact(&ctx, account, created.contact_id).unwrap();

        assert_eq!(store.purge_tombstones(&ctx).unwrap(), 0);
        assert_eq!(store.list_changed_since(&ctx, account, 0).unwrap().len(), 1);
    }

    #[test]
    fn test_purge_cascades_incoming_edges() {
        let (store, ctx, account) = setup();
        let friend = store
            .relationship_type_by_name(&ctx, "Friend")
            .unwrap()
            .relationship_type_id;
        let b = store
            .create_contact(&ctx, account, &Contact::named("Bo", "Kim"))
            .unwrap();
        let mut a = Contact::named("Al", "Kim");
        a.relationships.push(Relationship {
            id: None,
            related_contact_id: b.contact_id,
            relationship_type_id: friend,
        });
        let a = store.create_contact(&ctx, account, &a).unwrap();

        store.delete_contact(&ctx, account, b.contact_id).unwrap();
        let hidden = store.read_contact(&ctx, account, a.contact_id).unwrap();
        assert!(hidden.relationships.is_empty());
        // Hiding the edge does not re-stamp the surviving endpoint.
        assert_eq!(hidden.version_token, a.version_token);
        assert_eq!(hidden.etag, a.etag);

        store
            .purge_tombstones_before(&ctx, i64::MAX, usize::MAX)
            .unwrap();
        let edges: i64 = store
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM contact_relationships", [], |r| r.get(0))
            .unwrap();
        assert_eq!(edges, 0);
    }

    #[test]
    fn test_purge_limit() {
        let (store, ctx, account) = setup();
        for i in 0..3 {
            let c = store
                .create_contact(&ctx, account, &Contact::named(format!("C{}", i), "X"))
                .unwrap();
            store.delete_contact(&ctx, account, c.contact_id).unwrap();
        }
        assert_eq!(store.purge_tombstones_before(&ctx, i64::MAX, 2).unwrap(), 2);
        assert_eq!(store.purge_tombstones_before(&ctx, i64::MAX, 2).unwrap(), 1);
    }

    #[test]
    fn test_purged_ids_are_not_reused() {
        let (store, ctx, account) = setup();
        let first = store
            .create_contact(&ctx, account, &Contact::named("A", "B"))
            .unwrap();
        store.delete_contact(&ctx, account, first.contact_id).unwrap();
        store
            .purge_tombstones_before(&ctx, i64::MAX, usize::MAX)
            .unwrap();
        let second = store
            .create_contact(&ctx, account, &Contact::named("C", "D"))
            .unwrap();
        assert!(second.contact_id > first.contact_id);
    }
}
