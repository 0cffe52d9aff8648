//! Rolodex Storage - Contact Versioning Engine
//!
//! SQLite-backed implementation of the contact write path: per-account token
//! issuance, aggregate writes, relationship mirroring, tombstones, and the
//! incremental change feed that sync clients poll.
//!
//! Every public operation is synchronous and takes an [`OpContext`] that is
//! checked before and during transactions.

pub mod aggregate;
pub mod authority;
pub mod feed;
pub mod jobs;
pub mod mirror;
pub mod stamp;
pub mod tombstone;

mod rows;
mod schema;
mod sql;

pub use authority::{SqlVersionAuthority, VersionAuthority};
pub use jobs::{tombstone_purge_task, PurgeMetrics, PurgeSnapshot};
pub use mirror::RelationshipMirrorResolver;

// Sync layers and tests reach rusqlite types through this re-export.
pub use rusqlite;

use rolodex_core::{
    Account, AccountId, ContactLabelType, LabelCategory, OpContext, RelationshipType,
    RolodexError, RolodexResult, StorageError, StoreConfig, SyncToken, ValidationError,
    EntityType,
};
use rows::{from_ms, now_ms, DbResultExt};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

/// The contact engine over one SQLite connection.
pub struct ContactStore {
    conn: Mutex<Connection>,
    authority: Arc<dyn VersionAuthority>,
    config: StoreConfig,
}

impl std::fmt::Debug for ContactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContactStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ContactStore {
    /// Open a store with the SQL token authority.
    pub fn open(config: StoreConfig) -> RolodexResult<Self> {
        Self::with_authority(config, Arc::new(SqlVersionAuthority))
    }

    /// Open an in-memory store with default settings.
    pub fn open_in_memory() -> RolodexResult<Self> {
        Self::open(StoreConfig::in_memory())
    }

    /// Open a store that issues tokens through `authority`.
    pub fn with_authority(
        config: StoreConfig,
        authority: Arc<dyn VersionAuthority>,
    ) -> RolodexResult<Self> {
        config.validate()?;

        let conn = match &config.database_path {
            Some(path) => Connection::open(path).db()?,
            None => Connection::open_in_memory().db()?,
        };
        conn.busy_timeout(config.busy_timeout()).db()?;
        if config.database_path.is_some() {
            conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")
                .db()?;
        }
        schema::bootstrap(&conn)?;

        tracing::debug!(path = ?config.database_path, "Contact store opened");

        Ok(Self {
            conn: Mutex::new(conn),
            authority,
            config,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub(crate) fn lock(&self) -> RolodexResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| RolodexError::from(StorageError::LockPoisoned))
    }

    pub(crate) fn authority(&self) -> &dyn VersionAuthority {
        self.authority.as_ref()
    }

    // ========================================================================
    // ACCOUNTS
    // ========================================================================

    /// Create an account with a zero sync counter.
    pub fn create_account(&self, ctx: &OpContext, name: &str) -> RolodexResult<Account> {
        ctx.check()?;
        if name.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "name".to_string(),
            }
            .into());
        }

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO accounts (name, created_at_ms) VALUES (?1, ?2)",
            params![name.trim(), now_ms()],
        )
        .db()?;
        let account_id = conn.last_insert_rowid();
        tracing::info!(account_id, "Account created");
        load_account(&conn, account_id)
    }

    /// Load an account.
    pub fn account(&self, ctx: &OpContext, account_id: AccountId) -> RolodexResult<Account> {
        ctx.check()?;
        let conn = self.lock()?;
        load_account(&conn, account_id)
    }

    /// Last token issued for the account (the collection-level sync token).
    pub fn current_token(&self, ctx: &OpContext, account_id: AccountId) -> RolodexResult<SyncToken> {
        Ok(self.account(ctx, account_id)?.sync_counter)
    }

    /// Issue the next token for the account in its own transaction.
    pub fn increment_and_get(
        &self,
        ctx: &OpContext,
        account_id: AccountId,
    ) -> RolodexResult<SyncToken> {
        ctx.check()?;
        let mut conn = self.lock()?;
        self.authority.increment_and_get(&mut conn, account_id)
    }

    // ========================================================================
    // LOOKUPS
    // ========================================================================

    /// Shared contact labels, optionally restricted to one category.
    pub fn label_types(
        &self,
        ctx: &OpContext,
        category: Option<LabelCategory>,
    ) -> RolodexResult<Vec<ContactLabelType>> {
        ctx.check()?;
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare_cached(
                "SELECT id, category, name FROM contact_label_types \
                 WHERE ?1 IS NULL OR category = ?1 ORDER BY category, id",
            )
            .db()?;
        let rows = stmt
            .query_map([category.map(|c| c.as_db_str())], |r| {
                let category: String = r.get(1)?;
                Ok((r.get::<_, i64>(0)?, category, r.get::<_, String>(2)?))
            })
            .db()?
            .collect::<rusqlite::Result<Vec<_>>>()
            .db()?;

        rows.into_iter()
            .map(|(label_type_id, category, name)| -> RolodexResult<ContactLabelType> {
                let category = LabelCategory::from_db_str(&category).map_err(|e| {
                    StorageError::Backend {
                        reason: e.to_string(),
                    }
                })?;
                Ok(ContactLabelType {
                    label_type_id,
                    category,
                    name,
                })
            })
            .collect()
    }

    /// Look up a label id by category and name.
    pub fn label_type_id(
        &self,
        ctx: &OpContext,
        category: LabelCategory,
        name: &str,
    ) -> RolodexResult<Option<i64>> {
        ctx.check()?;
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id FROM contact_label_types WHERE category = ?1 AND name = ?2",
            params![category.as_db_str(), name],
            |r| r.get(0),
        )
        .optional()
        .db()
    }

    /// Every relationship type, ordered by id.
    pub fn relationship_types(&self, ctx: &OpContext) -> RolodexResult<Vec<RelationshipType>> {
        ctx.check()?;
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare_cached(
                "SELECT id, name, reverse_male, reverse_female, reverse_neutral \
                 FROM relationship_types ORDER BY id",
            )
            .db()?;
        let types = stmt
            .query_map([], mirror::relationship_type_from_row)
            .db()?
            .collect::<rusqlite::Result<Vec<_>>>()
            .db()?;
        Ok(types)
    }

    /// Look up a relationship type by name (case-insensitive).
    pub fn relationship_type_by_name(
        &self,
        ctx: &OpContext,
        name: &str,
    ) -> RolodexResult<RelationshipType> {
        ctx.check()?;
        let conn = self.lock()?;
        mirror::type_by_name(&conn, name)?.ok_or_else(|| {
            ValidationError::InvalidValue {
                field: "relationship_type".to_string(),
                reason: format!("unknown relationship type '{}'", name),
            }
            .into()
        })
    }

    /// Register a relationship type with its reverse names.
    pub fn create_relationship_type(
        &self,
        ctx: &OpContext,
        name: &str,
        reverse_male: Option<&str>,
        reverse_female: Option<&str>,
        reverse_neutral: Option<&str>,
    ) -> RolodexResult<RelationshipType> {
        ctx.check()?;
        if name.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "name".to_string(),
            }
            .into());
        }
        let conn = self.lock()?;
        if mirror::type_by_name(&conn, name)?.is_some() {
            return Err(StorageError::Conflict {
                entity_type: EntityType::RelationshipType,
                reason: format!("relationship type '{}' already exists", name),
            }
            .into());
        }
        conn.execute(
            "INSERT INTO relationship_types (name, reverse_male, reverse_female, reverse_neutral) \
             VALUES (?1, ?2, ?3, ?4)",
            params![name.trim(), reverse_male, reverse_female, reverse_neutral],
        )
        .db()?;
        let id = conn.last_insert_rowid();
        Ok(RelationshipType {
            relationship_type_id: id,
            name: name.trim().to_string(),
            reverse_male: reverse_male.map(str::to_string),
            reverse_female: reverse_female.map(str::to_string),
            reverse_neutral: reverse_neutral.map(str::to_string),
        })
    }
}

fn load_account(conn: &Connection, account_id: AccountId) -> RolodexResult<Account> {
    conn.query_row(
        "SELECT id, name, sync_counter, created_at_ms FROM accounts WHERE id = ?1",
        [account_id],
        |r| {
            Ok(Account {
                account_id: r.get(0)?,
                name: r.get(1)?,
                sync_counter: r.get(2)?,
                created_at: from_ms(r.get(3)?),
            })
        },
    )
    .optional()
    .db()?
    .ok_or_else(|| StorageError::AccountNotFound { account_id }.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ContactStore {
        ContactStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_create_account_starts_at_zero() {
        let store = store();
        let ctx = OpContext::background();
        let account = store.create_account(&ctx, "  Home  ").unwrap();
        assert_eq!(account.name, "Home");
        assert_eq!(account.sync_counter, 0);
        assert_eq!(store.current_token(&ctx, account.account_id).unwrap(), 0);
    }

    #[test]
    fn test_create_account_requires_name() {
        let err = store()
            .create_account(&OpContext::background(), " ")
            .unwrap_err();
        assert!(matches!(err, RolodexError::Validation(_)));
    }

    #[test]
    fn test_current_token_tracks_increments() {
        let store = store();
        let ctx = OpContext::background();
        let account = store.create_account(&ctx, "a").unwrap();
        store.increment_and_get(&ctx, account.account_id).unwrap();
        store.increment_and_get(&ctx, account.account_id).unwrap();
        assert_eq!(store.current_token(&ctx, account.account_id).unwrap(), 2);
    }

    #[test]
    fn test_unknown_account() {
        let err = store().account(&OpContext::background(), 42).unwrap_err();
        assert_eq!(
            err,
            RolodexError::Storage(StorageError::AccountNotFound { account_id: 42 })
        );
    }

    #[test]
    fn test_label_types_by_category() {
        let store = store();
        let ctx = OpContext::background();
        let phones = store.label_types(&ctx, Some(LabelCategory::Phone)).unwrap();
        assert!(phones.iter().all(|l| l.category == LabelCategory::Phone));
        assert!(phones.iter().any(|l| l.name == "Mobile"));

        let all = store.label_types(&ctx, None).unwrap();
        assert!(all.len() > phones.len());
        for category in LabelCategory::ALL {
            assert!(
                all.iter().any(|l| l.category == category),
                "no seeded {:?} labels",
                category
            );
        }

        let work = store
            .label_type_id(&ctx, LabelCategory::Email, "Work")
            .unwrap();
        assert!(work.is_some());
        assert!(store
            .label_type_id(&ctx, LabelCategory::Email, "Pager")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_relationship_type_lookup_is_case_insensitive() {
        let store = store();
        let ctx = OpContext::background();
        let father = store.relationship_type_by_name(&ctx, "father").unwrap();
        assert_eq!(father.name, "Father");
        assert_eq!(father.reverse_male.as_deref(), Some("Son"));
        assert!(store.relationship_type_by_name(&ctx, "Nemesis").is_err());
    }

    #[test]
    fn test_create_relationship_type_rejects_duplicates() {
        let store = store();
        let ctx = OpContext::background();
        let mentor = store
            .create_relationship_type(&ctx, "Mentor", None, None, Some("Mentee"))
            .unwrap();
        assert_eq!(mentor.reverse_neutral.as_deref(), Some("Mentee"));
        let err = store
            .create_relationship_type(&ctx, "mentor", None, None, None)
            .unwrap_err();
        assert!(matches!(
            err,
            RolodexError::Storage(StorageError::Conflict { .. })
        ));
    }

    #[test]
    fn test_cancelled_context_short_circuits() {
        let store = store();
        let ctx = OpContext::background();
        ctx.cancel_flag().cancel();
        assert_eq!(
            store.create_account(&ctx, "x").unwrap_err(),
            RolodexError::Storage(StorageError::Cancelled)
        );
    }
}
