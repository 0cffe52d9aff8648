//! Incremental change feed.
//!
//! A pure read over the stamp columns: every contact of the account, active
//! or tombstoned, whose `version_token` is past the client's baseline.

use crate::rows::{self, DbResultExt};
use crate::ContactStore;
use rolodex_core::{AccountId, ChangeSet, ContactChangeRecord, OpContext, RolodexResult, SyncToken};
use rusqlite::params;

impl ContactStore {
    /// Contacts stamped after `since`, ascending by `version_token`.
    pub fn list_changed_since(
        &self,
        ctx: &OpContext,
        account_id: AccountId,
        since: SyncToken,
    ) -> RolodexResult<Vec<ContactChangeRecord>> {
        ctx.check()?;
        let conn = self.lock()?;
        rows::require_account(&conn, account_id)?;

        let records = conn
            .prepare_cached(
                "SELECT uid, etag, last_modified_token, deleted_at_ms, version_token \
                 FROM contacts WHERE account_id = ?1 AND version_token > ?2 \
                 ORDER BY version_token ASC",
            )
            .db()?
            .query_map(params![account_id, since], |r| {
                let deleted_at: Option<i64> = r.get(3)?;
                Ok(ContactChangeRecord {
                    uid: r.get(0)?,
                    etag: r.get(1)?,
                    last_modified_token: r.get(2)?,
                    deleted_at: deleted_at.map(rows::from_ms),
                    version_token: r.get(4)?,
                })
            })
            .db()?
            .collect::<rusqlite::Result<Vec<_>>>()
            .db()?;

        tracing::trace!(account_id, since, count = records.len(), "Change feed read");
        Ok(records)
    }

    /// [`Self::list_changed_since`] plus the token the client should persist.
    pub fn changes_since(
        &self,
        ctx: &OpContext,
        account_id: AccountId,
        since: SyncToken,
    ) -> RolodexResult<ChangeSet> {
        let records = self.list_changed_since(ctx, account_id, since)?;
        Ok(ChangeSet::from_records(since, records))
    }
}
