//! Relationship edges and reverse-edge suppression.
//!
//! An edge `(A, B, T)` reads "B is A's T". Its reverse is `(B, A, R)` where
//! `R` is T's reverse name for A's gender. Only one direction is ever stored:
//! before inserting an edge the resolver checks whether the reverse already
//! represents the same relationship.

use crate::rows::{self, DbResultExt};
use crate::ContactStore;
use rolodex_core::{
    AccountId, ContactId, EdgeOutcome, EntityType, Gender, MirrorDecision, OpContext,
    RelationshipDirection, RelationshipType, RelationshipView, RolodexError, RolodexResult,
    ValidationError,
};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

pub(crate) fn relationship_type_from_row(row: &Row<'_>) -> rusqlite::Result<RelationshipType> {
    Ok(RelationshipType {
        relationship_type_id: row.get(0)?,
        name: row.get(1)?,
        reverse_male: row.get(2)?,
        reverse_female: row.get(3)?,
        reverse_neutral: row.get(4)?,
    })
}

pub(crate) fn type_by_name(conn: &Connection, name: &str) -> RolodexResult<Option<RelationshipType>> {
    conn.prepare_cached(
        "SELECT id, name, reverse_male, reverse_female, reverse_neutral \
         FROM relationship_types WHERE name = ?1 COLLATE NOCASE",
    )
    .db()?
    .query_row([name.trim()], relationship_type_from_row)
    .optional()
    .db()
}

pub(crate) fn type_by_id(conn: &Connection, type_id: i64) -> RolodexResult<Option<RelationshipType>> {
    conn.prepare_cached(
        "SELECT id, name, reverse_male, reverse_female, reverse_neutral \
         FROM relationship_types WHERE id = ?1",
    )
    .db()?
    .query_row([type_id], relationship_type_from_row)
    .optional()
    .db()
}

fn contact_gender(conn: &Connection, contact_id: ContactId) -> RolodexResult<Option<Gender>> {
    let gender: Option<String> = conn
        .prepare_cached("SELECT gender FROM contacts WHERE id = ?1")
        .db()?
        .query_row([contact_id], |r| r.get(0))
        .optional()
        .db()?;
    Ok(gender.map(|g| Gender::from_db_str(&g).unwrap_or_default()))
}

fn unknown_type(type_id: i64) -> RolodexError {
    ValidationError::InvalidValue {
        field: "relationship_type_id".to_string(),
        reason: format!("unknown relationship type {}", type_id),
    }
    .into()
}

/// Decides whether a prospective edge is already represented by its reverse.
#[derive(Debug, Default, Clone, Copy)]
pub struct RelationshipMirrorResolver;

impl RelationshipMirrorResolver {
    /// Check `(related_contact_id, contact_id, reverse)` for the edge
    /// `(contact_id, related_contact_id, type_id)`.
    ///
    /// Anything that prevents resolving a reverse type (unknown contact,
    /// unknown type, no reverse name, reverse name not in the catalog) yields
    /// [`MirrorDecision::Insert`].
    pub fn resolve(
        &self,
        conn: &Connection,
        contact_id: ContactId,
        related_contact_id: ContactId,
        type_id: i64,
    ) -> RolodexResult<MirrorDecision> {
        let Some(gender) = contact_gender(conn, contact_id)? else {
            return Ok(MirrorDecision::Insert);
        };
        let Some(forward) = type_by_id(conn, type_id)? else {
            return Ok(MirrorDecision::Insert);
        };
        let Some(reverse_name) = forward.reverse_name_for(gender) else {
            return Ok(MirrorDecision::Insert);
        };
        let Some(reverse) = type_by_name(conn, reverse_name)? else {
            tracing::debug!(
                type_id,
                reverse_name,
                "Reverse relationship name has no catalog entry"
            );
            return Ok(MirrorDecision::Insert);
        };

        let exists: Option<i64> = conn
            .prepare_cached(
                "SELECT id FROM contact_relationships \
                 WHERE contact_id = ?1 AND related_contact_id = ?2 AND relationship_type_id = ?3",
            )
            .db()?
            .query_row(
                params![related_contact_id, contact_id, reverse.relationship_type_id],
                |r| r.get(0),
            )
            .optional()
            .db()?;

        Ok(match exists {
            Some(_) => MirrorDecision::AlreadyMirrored {
                reverse_type_id: reverse.relationship_type_id,
            },
            None => MirrorDecision::Insert,
        })
    }
}

/// Validate and write one edge owned by `contact_id`.
///
/// The owner must already be known to be active in the account; the related
/// contact is checked here.
pub(crate) fn write_edge(
    conn: &Connection,
    account_id: AccountId,
    contact_id: ContactId,
    related_contact_id: ContactId,
    type_id: i64,
) -> RolodexResult<EdgeOutcome> {
    if contact_id == related_contact_id {
        return Err(ValidationError::InvalidValue {
            field: "related_contact_id".to_string(),
            reason: "a contact cannot be related to itself".to_string(),
        }
        .into());
    }
    rows::load_active_parent(conn, account_id, related_contact_id)?;
    if type_by_id(conn, type_id)?.is_none() {
        return Err(unknown_type(type_id));
    }

    if let MirrorDecision::AlreadyMirrored { reverse_type_id } =
        RelationshipMirrorResolver.resolve(conn, contact_id, related_contact_id, type_id)?
    {
        return Ok(EdgeOutcome::Mirrored { reverse_type_id });
    }

    let inserted = conn
        .prepare_cached(
            "INSERT INTO contact_relationships (contact_id, related_contact_id, relationship_type_id) \
             VALUES (?1, ?2, ?3) \
             ON CONFLICT (contact_id, related_contact_id, relationship_type_id) DO NOTHING",
        )
        .db()?
        .execute(params![contact_id, related_contact_id, type_id])
        .db()?;

    if inserted == 0 {
        Ok(EdgeOutcome::AlreadyPresent)
    } else {
        Ok(EdgeOutcome::Inserted {
            relationship_id: conn.last_insert_rowid(),
        })
    }
}

impl ContactStore {
    /// Run the mirror check for a prospective edge without writing anything.
    pub fn resolve_mirror(
        &self,
        ctx: &OpContext,
        contact_id: ContactId,
        related_contact_id: ContactId,
        type_id: i64,
    ) -> RolodexResult<MirrorDecision> {
        ctx.check()?;
        let conn = self.lock()?;
        RelationshipMirrorResolver.resolve(&conn, contact_id, related_contact_id, type_id)
    }

    /// Add the edge "`related_contact_id` is `contact_id`'s `type_id`".
    ///
    /// Idempotent. Both endpoints are stamped when a row is written.
    pub fn add_relationship(
        &self,
        ctx: &OpContext,
        account_id: AccountId,
        contact_id: ContactId,
        related_contact_id: ContactId,
        type_id: i64,
    ) -> RolodexResult<EdgeOutcome> {
        ctx.check()?;
        let outcome = {
            let mut conn = self.lock()?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .db()?;
            rows::load_active_parent(&tx, account_id, contact_id)?;
            ctx.check()?;
            let outcome = write_edge(&tx, account_id, contact_id, related_contact_id, type_id)?;
            if let EdgeOutcome::Inserted { .. } = outcome {
                rows::mark_pending(&tx, contact_id)?;
                rows::mark_pending(&tx, related_contact_id)?;
            }
            tx.commit().db()?;
            outcome
        };

        match outcome {
            EdgeOutcome::Inserted { relationship_id } => {
                tracing::debug!(
                    account_id,
                    contact_id,
                    related_contact_id,
                    relationship_id,
                    "Relationship added"
                );
                self.stamp_after_commit(account_id, contact_id);
                self.stamp_after_commit(account_id, related_contact_id);
            }
            EdgeOutcome::Mirrored { reverse_type_id } => {
                tracing::debug!(
                    account_id,
                    contact_id,
                    related_contact_id,
                    reverse_type_id,
                    "Relationship already represented by its reverse"
                );
            }
            EdgeOutcome::AlreadyPresent => {}
        }
        Ok(outcome)
    }

    /// Delete one stored edge and stamp both of its contacts.
    pub fn remove_relationship(
        &self,
        ctx: &OpContext,
        account_id: AccountId,
        relationship_id: i64,
    ) -> RolodexResult<()> {
        ctx.check()?;
        let (contact_id, related_contact_id) = {
            let mut conn = self.lock()?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .db()?;
            let endpoints: Option<(ContactId, ContactId)> = tx
                .query_row(
                    "SELECT r.contact_id, r.related_contact_id FROM contact_relationships r \
                     JOIN contacts c ON c.id = r.contact_id \
                     WHERE r.id = ?1 AND c.account_id = ?2",
                    params![relationship_id, account_id],
                    |r| Ok((r.get(0)?, r.get(1)?)),
                )
                .optional()
                .db()?;
            let (contact_id, related_contact_id) = endpoints.ok_or_else(|| {
                RolodexError::not_found(EntityType::Relationship, relationship_id)
            })?;

            ctx.check()?;
            tx.execute(
                "DELETE FROM contact_relationships WHERE id = ?1",
                [relationship_id],
            )
            .db()?;
            rows::mark_pending(&tx, contact_id)?;
            rows::mark_pending(&tx, related_contact_id)?;
            tx.commit().db()?;
            (contact_id, related_contact_id)
        };

        tracing::debug!(
            account_id,
            contact_id,
            related_contact_id,
            relationship_id,
            "Relationship removed"
        );
        // Stamping a tombstoned endpoint finds no active row and is skipped.
        self.stamp_after_commit(account_id, contact_id);
        self.stamp_after_commit(account_id, related_contact_id);
        Ok(())
    }

    /// Relationships of one contact: stored edges plus reverse views of
    /// edges other contacts own.
    pub fn list_relationships(
        &self,
        ctx: &OpContext,
        account_id: AccountId,
        contact_id: ContactId,
    ) -> RolodexResult<Vec<RelationshipView>> {
        ctx.check()?;
        let conn = self.lock()?;
        rows::load_active_parent(&conn, account_id, contact_id)?;

        let mut views: Vec<RelationshipView> = conn
            .prepare_cached(
                "SELECT r.id, r.related_contact_id, c.uid, t.name \
                 FROM contact_relationships r \
                 JOIN contacts c ON c.id = r.related_contact_id \
                 JOIN relationship_types t ON t.id = r.relationship_type_id \
                 WHERE r.contact_id = ?1 AND c.deleted_at_ms IS NULL ORDER BY r.id",
            )
            .db()?
            .query_map([contact_id], |r| {
                Ok(RelationshipView {
                    relationship_id: r.get(0)?,
                    related_contact_id: r.get(1)?,
                    related_uid: r.get(2)?,
                    label: r.get(3)?,
                    direction: RelationshipDirection::Stored,
                })
            })
            .db()?
            .collect::<rusqlite::Result<Vec<_>>>()
            .db()?;

        let incoming = conn
            .prepare_cached(
                "SELECT r.id, r.contact_id, c.uid, c.gender, t.id, t.name, \
                 t.reverse_male, t.reverse_female, t.reverse_neutral \
                 FROM contact_relationships r \
                 JOIN contacts c ON c.id = r.contact_id \
                 JOIN relationship_types t ON t.id = r.relationship_type_id \
                 WHERE r.related_contact_id = ?1 AND c.deleted_at_ms IS NULL ORDER BY r.id",
            )
            .db()?
            .query_map([contact_id], |r| {
                let gender: String = r.get(3)?;
                let kind = RelationshipType {
                    relationship_type_id: r.get(4)?,
                    name: r.get(5)?,
                    reverse_male: r.get(6)?,
                    reverse_female: r.get(7)?,
                    reverse_neutral: r.get(8)?,
                };
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, ContactId>(1)?,
                    r.get::<_, String>(2)?,
                    Gender::from_db_str(&gender).unwrap_or_default(),
                    kind,
                ))
            })
            .db()?
            .collect::<rusqlite::Result<Vec<_>>>()
            .db()?;

        for (relationship_id, owner_id, owner_uid, owner_gender, kind) in incoming {
            // The owner's gender picks the name describing the owner.
            let Some(label) = kind.reverse_name_for(owner_gender) else {
                continue;
            };
            let duplicate = views.iter().any(|v| {
                v.direction == RelationshipDirection::Stored
                    && v.related_contact_id == owner_id
                    && v.label.eq_ignore_ascii_case(label)
            });
            if duplicate {
                continue;
            }
            views.push(RelationshipView {
                relationship_id,
                related_contact_id: owner_id,
                related_uid: owner_uid,
                label: label.to_string(),
                direction: RelationshipDirection::Mirrored,
            });
        }

        Ok(views)
    }
}
