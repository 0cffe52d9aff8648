//! Contact aggregate writes and reads.
//!
//! A contact and all of its child rows are written in one transaction.
//! Updates replace every child collection wholesale. The version stamp is
//! applied afterwards in a separate transaction (see [`crate::stamp`]).

use crate::mirror;
use crate::rows::{self, DbResultExt};
use crate::schema::CHILD_TABLES;
use crate::sql::UpdateStatement;
use crate::ContactStore;
use rolodex_core::{
    new_contact_uid, AccountId, Contact, ContactId, ContactPatch, ContactSummary, EdgeOutcome,
    EntityType, LabelCategory, OpContext, RolodexError, RolodexResult, StorageError,
    UpdateOptions, ValidationError,
};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::BTreeSet;

/// Directed edge as `(related_contact_id, relationship_type_id)`.
type EdgeKey = (ContactId, i64);

impl ContactStore {
    // ========================================================================
    // WRITES
    // ========================================================================

    /// Insert a contact with all of its child rows.
    ///
    /// An empty `uid` is replaced by a fresh UUIDv7. Returns the stored
    /// aggregate after stamping.
    pub fn create_contact(
        &self,
        ctx: &OpContext,
        account_id: AccountId,
        contact: &Contact,
    ) -> RolodexResult<Contact> {
        ctx.check()?;
        let (contact_id, touched) = {
            let mut conn = self.lock()?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .db()?;
            rows::require_account(&tx, account_id)?;

            let uid = match contact.uid.trim() {
                "" => new_contact_uid(),
                uid => uid.to_string(),
            };
            if uid_in_use(&tx, account_id, &uid)? {
                return Err(StorageError::Conflict {
                    entity_type: EntityType::Contact,
                    reason: format!("uid '{}' already exists in account {}", uid, account_id),
                }
                .into());
            }

            let now = rows::now_ms();
            tx.execute(
                "INSERT INTO contacts (account_id, uid, prefix, given_name, middle_name, \
                 family_name, suffix, nickname, full_name, gender, birthday, notes, \
                 stamp_pending, created_at_ms, updated_at_ms) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 1, ?13, ?13)",
                params![
                    account_id,
                    uid,
                    contact.prefix,
                    contact.given_name,
                    contact.middle_name,
                    contact.family_name,
                    contact.suffix,
                    contact.nickname,
                    contact.display_name(),
                    contact.gender.as_db_str(),
                    contact.birthday,
                    contact.notes,
                    now,
                ],
            )
            .db()?;
            let contact_id = tx.last_insert_rowid();

            let written = write_children(ctx, &tx, account_id, contact_id, contact, true)?;
            let touched = related_ids(&written);
            for related in &touched {
                rows::mark_pending(&tx, *related)?;
            }

            ctx.check()?;
            tx.commit().db()?;
            (contact_id, touched)
        };

        tracing::debug!(account_id, contact_id, "Contact created");
        self.stamp_after_commit(account_id, contact_id);
        for related in touched {
            self.stamp_after_commit(account_id, related);
        }
        self.load(account_id, contact_id)
    }

    /// Overwrite a contact's parent columns and replace its child rows.
    ///
    /// `contact.contact_id` selects the row; `uid` is never changed. With
    /// `skip_relationships` the stored edges are left as they are.
    pub fn update_contact(
        &self,
        ctx: &OpContext,
        account_id: AccountId,
        contact: &Contact,
        options: UpdateOptions,
    ) -> RolodexResult<Contact> {
        ctx.check()?;
        let contact_id = contact.contact_id;
        let with_relationships = !options.skip_relationships;

        let touched = {
            let mut conn = self.lock()?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .db()?;

            let changed = tx
                .execute(
                    "UPDATE contacts SET prefix = ?1, given_name = ?2, middle_name = ?3, \
                     family_name = ?4, suffix = ?5, nickname = ?6, full_name = ?7, gender = ?8, \
                     birthday = ?9, notes = ?10, stamp_pending = 1, updated_at_ms = ?11 \
                     WHERE id = ?12 AND account_id = ?13 AND deleted_at_ms IS NULL",
                    params![
                        contact.prefix,
                        contact.given_name,
                        contact.middle_name,
                        contact.family_name,
                        contact.suffix,
                        contact.nickname,
                        contact.display_name(),
                        contact.gender.as_db_str(),
                        contact.birthday,
                        contact.notes,
                        rows::now_ms(),
                        contact_id,
                        account_id,
                    ],
                )
                .db()?;
            if changed == 0 {
                return Err(RolodexError::not_found(EntityType::Contact, contact_id));
            }

            let removed = clear_children(ctx, &tx, contact_id, with_relationships)?;
            let written =
                write_children(ctx, &tx, account_id, contact_id, contact, with_relationships)?;

            // Edges that were both removed and re-inserted are unchanged.
            let changed_edges: BTreeSet<EdgeKey> =
                removed.symmetric_difference(&written).copied().collect();
            let touched = related_ids(&changed_edges);
            for related in &touched {
                rows::mark_pending(&tx, *related)?;
            }

            ctx.check()?;
            tx.commit().db()?;
            touched
        };

        tracing::debug!(
            account_id,
            contact_id,
            skip_relationships = options.skip_relationships,
            "Contact updated"
        );
        self.stamp_after_commit(account_id, contact_id);
        for related in touched {
            self.stamp_after_commit(account_id, related);
        }
        self.load(account_id, contact_id)
    }

    /// Apply an ordered list of parent column updates.
    pub fn patch_contact(
        &self,
        ctx: &OpContext,
        account_id: AccountId,
        contact_id: ContactId,
        patch: &ContactPatch,
    ) -> RolodexResult<Contact> {
        ctx.check()?;
        patch.validate()?;

        {
            let mut conn = self.lock()?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .db()?;

            let stmt = UpdateStatement::new("contacts")
                .set_fields(patch.updates())
                .set("stamp_pending", 1i64)
                .set("updated_at_ms", rows::now_ms())
                .filter("id", contact_id)
                .filter("account_id", account_id)
                .condition("deleted_at_ms IS NULL");
            let changed = tx.execute(&stmt.sql(), stmt.params()).db()?;
            if changed == 0 {
                return Err(RolodexError::not_found(EntityType::Contact, contact_id));
            }

            if patch.touches_name() {
                ctx.check()?;
                let parent = rows::load_active_parent(&tx, account_id, contact_id)?;
                tx.execute(
                    "UPDATE contacts SET full_name = ?1 WHERE id = ?2",
                    params![parent.display_name(), contact_id],
                )
                .db()?;
            }

            tx.commit().db()?;
        }

        tracing::debug!(account_id, contact_id, fields = patch.len(), "Contact patched");
        self.stamp_after_commit(account_id, contact_id);
        self.load(account_id, contact_id)
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Load an active contact with every child collection.
    pub fn read_contact(
        &self,
        ctx: &OpContext,
        account_id: AccountId,
        contact_id: ContactId,
    ) -> RolodexResult<Contact> {
        ctx.check()?;
        self.load(account_id, contact_id)
    }

    /// Load an active contact by its account-scoped uid.
    pub fn read_contact_by_uid(
        &self,
        ctx: &OpContext,
        account_id: AccountId,
        uid: &str,
    ) -> RolodexResult<Contact> {
        ctx.check()?;
        let conn = self.lock()?;
        let contact_id: Option<ContactId> = conn
            .query_row(
                "SELECT id FROM contacts \
                 WHERE account_id = ?1 AND uid = ?2 AND deleted_at_ms IS NULL",
                params![account_id, uid],
                |r| r.get(0),
            )
            .optional()
            .db()?;
        let contact_id = contact_id.ok_or_else(|| StorageError::UidNotFound {
            uid: uid.to_string(),
        })?;
        rows::load_aggregate(&conn, account_id, contact_id)
    }

    /// Summaries of every active contact in the account, by display name.
    pub fn list_contacts(
        &self,
        ctx: &OpContext,
        account_id: AccountId,
    ) -> RolodexResult<Vec<ContactSummary>> {
        ctx.check()?;
        let conn = self.lock()?;
        rows::require_account(&conn, account_id)?;
        let summaries = conn
            .prepare_cached(
                "SELECT id, uid, full_name, etag, version_token FROM contacts \
                 WHERE account_id = ?1 AND deleted_at_ms IS NULL \
                 ORDER BY full_name COLLATE NOCASE, id",
            )
            .db()?
            .query_map([account_id], |r| {
                Ok(ContactSummary {
                    contact_id: r.get(0)?,
                    uid: r.get(1)?,
                    full_name: r.get(2)?,
                    etag: r.get(3)?,
                    version_token: r.get(4)?,
                })
            })
            .db()?
            .collect::<rusqlite::Result<Vec<_>>>()
            .db()?;
        Ok(summaries)
    }

    fn load(&self, account_id: AccountId, contact_id: ContactId) -> RolodexResult<Contact> {
        let conn = self.lock()?;
        rows::load_aggregate(&conn, account_id, contact_id)
    }
}

fn uid_in_use(conn: &Connection, account_id: AccountId, uid: &str) -> RolodexResult<bool> {
    let found: Option<i64> = conn
        .prepare_cached("SELECT id FROM contacts WHERE account_id = ?1 AND uid = ?2")
        .db()?
        .query_row(params![account_id, uid], |r| r.get(0))
        .optional()
        .db()?;
    Ok(found.is_some())
}

fn related_ids(edges: &BTreeSet<EdgeKey>) -> BTreeSet<ContactId> {
    edges.iter().map(|(related, _)| *related).collect()
}

/// Delete the contact's child rows. Returns the edges that were removed.
fn clear_children(
    ctx: &OpContext,
    conn: &Connection,
    contact_id: ContactId,
    with_relationships: bool,
) -> RolodexResult<BTreeSet<EdgeKey>> {
    // Edges to tombstoned contacts are dropped without touching the other side.
    let removed = if with_relationships {
        conn.prepare_cached(
            "SELECT r.related_contact_id, r.relationship_type_id \
             FROM contact_relationships r JOIN contacts c ON c.id = r.related_contact_id \
             WHERE r.contact_id = ?1 AND c.deleted_at_ms IS NULL",
        )
        .db()?
        .query_map([contact_id], |r| Ok((r.get(0)?, r.get(1)?)))
        .db()?
        .collect::<rusqlite::Result<BTreeSet<EdgeKey>>>()
        .db()?
    } else {
        BTreeSet::new()
    };

    for table in CHILD_TABLES {
        if table == "contact_relationships" && !with_relationships {
            continue;
        }
        ctx.check()?;
        conn.execute(&format!("DELETE FROM {} WHERE contact_id = ?1", table), [contact_id])
            .db()?;
    }
    Ok(removed)
}

/// Insert every child collection of `contact`. Returns the edges now stored
/// for the contact that were written by this call.
fn write_children(
    ctx: &OpContext,
    conn: &Connection,
    account_id: AccountId,
    contact_id: ContactId,
    contact: &Contact,
    with_relationships: bool,
) -> RolodexResult<BTreeSet<EdgeKey>> {
    for email in &contact.emails {
        ctx.check()?;
        rows::check_label(conn, email.label_type_id, LabelCategory::Email)?;
        conn.prepare_cached(
            "INSERT INTO contact_emails (contact_id, label_type_id, address, is_primary) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .db()?
        .execute(params![contact_id, email.label_type_id, email.address, email.is_primary])
        .db()?;
    }

    for phone in &contact.phones {
        ctx.check()?;
        rows::check_label(conn, phone.label_type_id, LabelCategory::Phone)?;
        conn.prepare_cached(
            "INSERT INTO contact_phones (contact_id, label_type_id, number, is_primary) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .db()?
        .execute(params![contact_id, phone.label_type_id, phone.number, phone.is_primary])
        .db()?;
    }

    for address in &contact.addresses {
        ctx.check()?;
        rows::check_label(conn, address.label_type_id, LabelCategory::Address)?;
        conn.prepare_cached(
            "INSERT INTO contact_addresses (contact_id, label_type_id, street, extended, city, \
             region, postal_code, country) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .db()?
        .execute(params![
            contact_id,
            address.label_type_id,
            address.street,
            address.extended,
            address.city,
            address.region,
            address.postal_code,
            address.country,
        ])
        .db()?;
    }

    for org in &contact.organizations {
        ctx.check()?;
        conn.prepare_cached(
            "INSERT INTO contact_organizations (contact_id, name, title, department) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .db()?
        .execute(params![contact_id, org.name, org.title, org.department])
        .db()?;
    }

    for url in &contact.urls {
        ctx.check()?;
        rows::check_label(conn, url.label_type_id, LabelCategory::Url)?;
        conn.prepare_cached(
            "INSERT INTO contact_urls (contact_id, label_type_id, url) VALUES (?1, ?2, ?3)",
        )
        .db()?
        .execute(params![contact_id, url.label_type_id, url.url])
        .db()?;
    }

    for date in &contact.other_dates {
        ctx.check()?;
        conn.prepare_cached(
            "INSERT INTO contact_other_dates (contact_id, label, date) VALUES (?1, ?2, ?3)",
        )
        .db()?
        .execute(params![contact_id, date.label, date.date])
        .db()?;
    }

    let mut written = BTreeSet::new();
    if with_relationships {
        for edge in &contact.relationships {
            ctx.check()?;
            let outcome = mirror::write_edge(
                conn,
                account_id,
                contact_id,
                edge.related_contact_id,
                edge.relationship_type_id,
            )?;
            if let EdgeOutcome::Inserted { .. } = outcome {
                written.insert((edge.related_contact_id, edge.relationship_type_id));
            }
        }
    }

    for other in &contact.other_relationships {
        ctx.check()?;
        if let Some(type_id) = other.relationship_type_id {
            if mirror::type_by_id(conn, type_id)?.is_none() {
                return Err(ValidationError::InvalidValue {
                    field: "relationship_type_id".to_string(),
                    reason: format!("unknown relationship type {}", type_id),
                }
                .into());
            }
        }
        conn.prepare_cached(
            "INSERT INTO contact_other_relationships (contact_id, name, relationship_type_id) \
             VALUES (?1, ?2, ?3)",
        )
        .db()?
        .execute(params![contact_id, other.name, other.relationship_type_id])
        .db()?;
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rolodex_core::{Email, Gender, OtherDate, Phone, Relationship, UNNAMED_CONTACT};

    fn setup() -> (ContactStore, OpContext, AccountId) {
        let store = ContactStore::open_in_memory().unwrap();
        let ctx = OpContext::background();
        let account = store.create_account(&ctx, "book").unwrap();
        (store, ctx, account.account_id)
    }

    fn label(store: &ContactStore, ctx: &OpContext, category: LabelCategory, name: &str) -> i64 {
        store.label_type_id(ctx, category, name).unwrap().unwrap()
    }

    #[test]
    fn test_create_synthesizes_uid_and_stamps() {
        let (store, ctx, account) = setup();
        let created = store
            .create_contact(&ctx, account, &Contact::named("Ann", "Lee"))
            .unwrap();
        assert_eq!(created.uid.len(), 36);
        assert_eq!(created.full_name, "Ann Lee");
        assert_eq!(created.version_token, 1);
        assert_eq!(created.last_modified_token, 1);
        assert_eq!(created.etag.len(), rolodex_core::ETAG_HEX_LEN);
        assert_eq!(store.pending_stamp_count(&ctx).unwrap(), 0);
    }

    #[test]
    fn test_create_keeps_supplied_uid_and_rejects_duplicates() {
        let (store, ctx, account) = setup();
        let mut contact = Contact::named("Ann", "Lee");
        contact.uid = "card-1".to_string();
        let created = store.create_contact(&ctx, account, &contact).unwrap();
        assert_eq!(created.uid, "card-1");

        let err = store.create_contact(&ctx, account, &contact).unwrap_err();
        assert!(matches!(
            err,
            RolodexError::Storage(StorageError::Conflict { .. })
        ));

        let other = store.create_account(&ctx, "other").unwrap();
        assert!(store.create_contact(&ctx, other.account_id, &contact).is_ok());
    }

    #[test]
    fn test_create_unknown_account() {
        let (store, ctx, _) = setup();
        let err = store
            .create_contact(&ctx, 404, &Contact::named("A", "B"))
            .unwrap_err();
        assert_eq!(
            err,
            RolodexError::Storage(StorageError::AccountNotFound { account_id: 404 })
        );
    }

    #[test]
    fn test_create_persists_children() {
        let (store, ctx, account) = setup();
        let mut contact = Contact::named("Ann", "Lee");
        contact.emails.push(Email {
            id: None,
            label_type_id: Some(label(&store, &ctx, LabelCategory::Email, "Work")),
            address: "ann@example.com".to_string(),
            is_primary: true,
        });
        contact.phones.push(Phone {
            id: None,
            label_type_id: Some(label(&store, &ctx, LabelCategory::Phone, "Mobile")),
            number: "+1 555 0100".to_string(),
            is_primary: false,
        });
        contact.other_dates.push(OtherDate {
            id: None,
            label: "Anniversary".to_string(),
            date: NaiveDate::from_ymd_opt(2015, 6, 20).unwrap(),
        });

        let created = store.create_contact(&ctx, account, &contact).unwrap();
        let read = store.read_contact(&ctx, account, created.contact_id).unwrap();
        assert_eq!(read.emails.len(), 1);
        assert_eq!(read.emails[0].address, "ann@example.com");
        assert!(read.emails[0].is_primary);
        assert_eq!(read.phones[0].number, "+1 555 0100");
        assert_eq!(
            read.other_dates[0].date,
            NaiveDate::from_ymd_opt(2015, 6, 20).unwrap()
        );
    }

    #[test]
    fn test_label_category_mismatch_rolls_back_create() {
        let (store, ctx, account) = setup();
        let mut contact = Contact::named("Ann", "Lee");
        contact.emails.push(Email {
            id: None,
            label_type_id: Some(label(&store, &ctx, LabelCategory::Phone, "Fax")),
            address: "ann@example.com".to_string(),
            is_primary: false,
        });
        let err = store.create_contact(&ctx, account, &contact).unwrap_err();
        assert!(matches!(
            err,
            RolodexError::Validation(ValidationError::LabelCategoryMismatch { .. })
        ));
        assert!(store.list_contacts(&ctx, account).unwrap().is_empty());
        assert_eq!(store.current_token(&ctx, account).unwrap(), 0);
    }

    #[test]
    fn test_update_replaces_children_and_keeps_uid() {
        let (store, ctx, account) = setup();
        let mut contact = Contact::named("Ann", "Lee");
        contact.emails.push(Email {
            address: "old@example.com".to_string(),
            ..Email::default()
        });
        let mut stored = store.create_contact(&ctx, account, &contact).unwrap();
        let uid = stored.uid.clone();

        stored.uid = "ignored".to_string();
        stored.family_name = Some("Park".to_string());
        stored.emails = vec![Email {
            address: "new@example.com".to_string(),
            ..Email::default()
        }];
        let updated = store
            .update_contact(&ctx, account, &stored, UpdateOptions::default())
            .unwrap();

        assert_eq!(updated.uid, uid);
        assert_eq!(updated.full_name, "Ann Park");
        assert_eq!(updated.emails.len(), 1);
        assert_eq!(updated.emails[0].address, "new@example.com");
        assert!(updated.version_token > stored.version_token);
        assert_ne!(updated.etag, stored.etag);
    }

    #[test]
    fn test_update_missing_contact() {
        let (store, ctx, account) = setup();
        let mut ghost = Contact::named("No", "One");
        ghost.contact_id = 77;
        let err = store
            .update_contact(&ctx, account, &ghost, UpdateOptions::default())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_update_skip_relationships_keeps_edges() {
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
        let mut a = store.create_contact(&ctx, account, &a).unwrap();
        assert_eq!(a.relationships.len(), 1);

        a.relationships.clear();
        a.notes = Some("edited".to_string());
        let updated = store
            .update_contact(&ctx, account, &a, UpdateOptions::skip_relationships())
            .unwrap();
        assert_eq!(updated.relationships.len(), 1);
        assert_eq!(updated.notes.as_deref(), Some("edited"));

        let updated = store
            .update_contact(&ctx, account, &a, UpdateOptions::default())
            .unwrap();
        assert!(updated.relationships.is_empty());
    }

    #[test]
    fn test_update_stamps_contacts_whose_edges_changed() {
        let (store, ctx, account) = setup();
        let friend = store
            .relationship_type_by_name(&ctx, "Friend")
            .unwrap()
            .relationship_type_id;
        let b = store
            .create_contact(&ctx, account, &Contact::named("Bo", "Kim"))
            .unwrap();
        let a = store
            .create_contact(&ctx, account, &Contact::named("Al", "Kim"))
            .unwrap();

        let mut edited = a.clone();
        edited.relationships.push(Relationship {
            id: None,
            related_contact_id: b.contact_id,
            relationship_type_id: friend,
        });
        store
            .update_contact(&ctx, account, &edited, UpdateOptions::default())
            .unwrap();

        let b_after = store.read_contact(&ctx, account, b.contact_id).unwrap();
        assert!(b_after.version_token > b.version_token);

        // Re-saving the same edges leaves the related contact alone.
        let unchanged = store.read_contact(&ctx, account, b.contact_id).unwrap();
        let a_now = store.read_contact(&ctx, account, a.contact_id).unwrap();
        store
            .update_contact(&ctx, account, &a_now, UpdateOptions::default())
            .unwrap();
        let b_final = store.read_contact(&ctx, account, b.contact_id).unwrap();
        assert_eq!(b_final.version_token, unchanged.version_token);
    }

    #[test]
    fn test_patch_updates_columns_and_full_name() {
        let (store, ctx, account) = setup();
        let created = store
            .create_contact(&ctx, account, &Contact::named("John", "Doe"))
            .unwrap();
        let patch = ContactPatch::new()
            .prefix(Some("Dr."))
            .suffix(Some("III"))
            .gender(Gender::Male)
            .birthday(NaiveDate::from_ymd_opt(1970, 1, 2));
        let patched = store
            .patch_contact(&ctx, account, created.contact_id, &patch)
            .unwrap();
        assert_eq!(patched.full_name, "Dr. John Doe III");
        assert_eq!(patched.gender, Gender::Male);
        assert_eq!(patched.birthday, NaiveDate::from_ymd_opt(1970, 1, 2));
        assert!(patched.version_token > created.version_token);
    }

    #[test]
    fn test_patch_clearing_names_falls_back() {
        let (store, ctx, account) = setup();
        let created = store
            .create_contact(&ctx, account, &Contact::named("John", "Doe"))
            .unwrap();
        let patch = ContactPatch::new().given_name(None).family_name(None);
        let patched = store
            .patch_contact(&ctx, account, created.contact_id, &patch)
            .unwrap();
        assert_eq!(patched.full_name, UNNAMED_CONTACT);
    }

    #[test]
    fn test_empty_patch_is_rejected() {
        let (store, ctx, account) = setup();
        let created = store
            .create_contact(&ctx, account, &Contact::named("John", "Doe"))
            .unwrap();
        let err = store
            .patch_contact(&ctx, account, created.contact_id, &ContactPatch::new())
            .unwrap_err();
        assert_eq!(err, RolodexError::Validation(ValidationError::EmptyPatch));
    }

    #[test]
    fn test_read_by_uid_and_list() {
        let (store, ctx, account) = setup();
        let zed = store
            .create_contact(&ctx, account, &Contact::named("Zed", "Young"))
            .unwrap();
        store
            .create_contact(&ctx, account, &Contact::named("amy", "Adams"))
            .unwrap();

        let by_uid = store.read_contact_by_uid(&ctx, account, &zed.uid).unwrap();
        assert_eq!(by_uid.contact_id, zed.contact_id);

        let names: Vec<String> = store
            .list_contacts(&ctx, account)
            .unwrap()
            .into_iter()
            .map(|s| s.full_name)
            .collect();
        assert_eq!(names, vec!["amy Adams", "Zed Young"]);

        let err = store
            .read_contact_by_uid(&ctx, account, "missing")
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_read_from_other_account_is_not_found() {
        let (store, ctx, account) = setup();
        let other = store.create_account(&ctx, "other").unwrap();
        let created = store
            .create_contact(&ctx, account, &Contact::named("A", "B"))
            .unwrap();
        assert!(store
            .read_contact(&ctx, other.account_id, created.contact_id)
            .unwrap_err()
            .is_not_found());
    }
}
