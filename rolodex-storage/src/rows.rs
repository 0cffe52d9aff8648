//! Row mapping helpers shared by the engine modules.

use chrono::{DateTime, Utc};
use rolodex_core::{
    Address, Contact, ContactId, Email, EntityType, Gender, LabelCategory, Organization,
    OtherDate, OtherRelationship, Phone, Relationship, RolodexError, RolodexResult, StorageError,
    Timestamp, Url, ValidationError,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Map backend errors into the engine's error type.
pub(crate) trait DbResultExt<T> {
    fn db(self) -> RolodexResult<T>;
}

impl<T> DbResultExt<T> for rusqlite::Result<T> {
    fn db(self) -> RolodexResult<T> {
        self.map_err(backend_error)
    }
}

pub(crate) fn backend_error(e: rusqlite::Error) -> RolodexError {
    StorageError::Backend {
        reason: e.to_string(),
    }
    .into()
}

pub(crate) fn to_ms(ts: Timestamp) -> i64 {
    ts.timestamp_millis()
}

pub(crate) fn from_ms(ms: i64) -> Timestamp {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_default()
}

pub(crate) fn now_ms() -> i64 {
    to_ms(Utc::now())
}

/// Columns selected for a parent contact row, in `contact_from_row` order.
pub(crate) const CONTACT_COLUMNS: &str = "id, account_id, uid, prefix, given_name, middle_name, \
     family_name, suffix, nickname, full_name, gender, birthday, notes, version_token, \
     last_modified_token, etag, created_at_ms, updated_at_ms, deleted_at_ms";

pub(crate) fn contact_from_row(row: &Row<'_>) -> rusqlite::Result<Contact> {
    let gender: String = row.get(10)?;
    let deleted_at: Option<i64> = row.get(18)?;
    Ok(Contact {
        contact_id: row.get(0)?,
        account_id: row.get(1)?,
        uid: row.get(2)?,
        prefix: row.get(3)?,
        given_name: row.get(4)?,
        middle_name: row.get(5)?,
        family_name: row.get(6)?,
        suffix: row.get(7)?,
        nickname: row.get(8)?,
        full_name: row.get(9)?,
        gender: Gender::from_db_str(&gender).unwrap_or_default(),
        birthday: row.get(11)?,
        notes: row.get(12)?,
        version_token: row.get(13)?,
        last_modified_token: row.get(14)?,
        etag: row.get(15)?,
        created_at: Some(from_ms(row.get(16)?)),
        updated_at: Some(from_ms(row.get(17)?)),
        deleted_at: deleted_at.map(from_ms),
        ..Contact::default()
    })
}

/// Load an active parent row owned by the account.
pub(crate) fn load_active_parent(
    conn: &Connection,
    account_id: i64,
    contact_id: ContactId,
) -> RolodexResult<Contact> {
    let sql = format!(
        "SELECT {} FROM contacts WHERE id = ?1 AND account_id = ?2 AND deleted_at_ms IS NULL",
        CONTACT_COLUMNS
    );
    conn.query_row(&sql, params![contact_id, account_id], contact_from_row)
        .optional()
        .db()?
        .ok_or_else(|| RolodexError::not_found(EntityType::Contact, contact_id))
}

/// Load a parent row and every child collection.
pub(crate) fn load_aggregate(
    conn: &Connection,
    account_id: i64,
    contact_id: ContactId,
) -> RolodexResult<Contact> {
    let mut contact = load_active_parent(conn, account_id, contact_id)?;
    load_children(conn, &mut contact)?;
    Ok(contact)
}

/// Fill every child collection of a loaded parent.
pub(crate) fn load_children(conn: &Connection, contact: &mut Contact) -> RolodexResult<()> {
    let id = contact.contact_id;

    contact.emails = conn
        .prepare_cached(
            "SELECT id, label_type_id, address, is_primary FROM contact_emails \
             WHERE contact_id = ?1 ORDER BY id",
        )
        .db()?
        .query_map([id], |r| {
            Ok(Email {
                id: Some(r.get(0)?),
                label_type_id: r.get(1)?,
                address: r.get(2)?,
                is_primary: r.get(3)?,
            })
        })
        .db()?
        .collect::<rusqlite::Result<Vec<_>>>()
        .db()?;

    contact.phones = conn
        .prepare_cached(
            "SELECT id, label_type_id, number, is_primary FROM contact_phones \
             WHERE contact_id = ?1 ORDER BY id",
        )
        .db()?
        .query_map([id], |r| {
            Ok(Phone {
                id: Some(r.get(0)?),
                label_type_id: r.get(1)?,
                number: r.get(2)?,
                is_primary: r.get(3)?,
            })
        })
        .db()?
        .collect::<rusqlite::Result<Vec<_>>>()
        .db()?;

    contact.addresses = conn
        .prepare_cached(
            "SELECT id, label_type_id, street, extended, city, region, postal_code, country \
             FROM contact_addresses WHERE contact_id = ?1 ORDER BY id",
        )
        .db()?
        .query_map([id], |r| {
            Ok(Address {
                id: Some(r.get(0)?),
                label_type_id: r.get(1)?,
                street: r.get(2)?,
                extended: r.get(3)?,
                city: r.get(4)?,
                region: r.get(5)?,
                postal_code: r.get(6)?,
                country: r.get(7)?,
            })
        })
        .db()?
        .collect::<rusqlite::Result<Vec<_>>>()
        .db()?;

    contact.organizations = conn
        .prepare_cached(
            "SELECT id, name, title, department FROM contact_organizations \
             WHERE contact_id = ?1 ORDER BY id",
        )
        .db()?
        .query_map([id], |r| {
            Ok(Organization {
                id: Some(r.get(0)?),
                name: r.get(1)?,
                title: r.get(2)?,
                department: r.get(3)?,
            })
        })
        .db()?
        .collect::<rusqlite::Result<Vec<_>>>()
        .db()?;

    contact.urls = conn
        .prepare_cached(
            "SELECT id, label_type_id, url FROM contact_urls WHERE contact_id = ?1 ORDER BY id",
        )
        .db()?
        .query_map([id], |r| {
            Ok(Url {
                id: Some(r.get(0)?),
                label_type_id: r.get(1)?,
                url: r.get(2)?,
            })
        })
        .db()?
        .collect::<rusqlite::Result<Vec<_>>>()
        .db()?;

    contact.other_dates = conn
        .prepare_cached(
            "SELECT id, label, date FROM contact_other_dates WHERE contact_id = ?1 ORDER BY id",
        )
        .db()?
        .query_map([id], |r| {
            Ok(OtherDate {
                id: Some(r.get(0)?),
                label: r.get(1)?,
                date: r.get(2)?,
            })
        })
        .db()?
        .collect::<rusqlite::Result<Vec<_>>>()
        .db()?;

    // Edges pointing at a tombstoned contact stay stored until purge but are hidden.
    contact.relationships = conn
        .prepare_cached(
            "SELECT r.id, r.related_contact_id, r.relationship_type_id \
             FROM contact_relationships r \
             JOIN contacts c ON c.id = r.related_contact_id \
             WHERE r.contact_id = ?1 AND c.deleted_at_ms IS NULL ORDER BY r.id",
        )
        .db()?
        .query_map([id], |r| {
            Ok(Relationship {
                id: Some(r.get(0)?),
                related_contact_id: r.get(1)?,
                relationship_type_id: r.get(2)?,
            })
        })
        .db()?
        .collect::<rusqlite::Result<Vec<_>>>()
        .db()?;

    contact.other_relationships = conn
        .prepare_cached(
            "SELECT id, name, relationship_type_id FROM contact_other_relationships \
             WHERE contact_id = ?1 ORDER BY id",
        )
        .db()?
        .query_map([id], |r| {
            Ok(OtherRelationship {
                id: Some(r.get(0)?),
                name: r.get(1)?,
                relationship_type_id: r.get(2)?,
            })
        })
        .db()?
        .collect::<rusqlite::Result<Vec<_>>>()
        .db()?;

    Ok(())
}

/// Fail unless the label exists and belongs to `expected`.
pub(crate) fn check_label(
    conn: &Connection,
    label_type_id: Option<i64>,
    expected: LabelCategory,
) -> RolodexResult<()> {
    let Some(label_type_id) = label_type_id else {
        return Ok(());
    };
    let category: Option<String> = conn
        .prepare_cached("SELECT category FROM contact_label_types WHERE id = ?1")
        .db()?
        .query_row([label_type_id], |r| r.get(0))
        .optional()
        .db()?;
    match category {
        None => Err(RolodexError::not_found(EntityType::LabelType, label_type_id)),
        Some(c) if c == expected.as_db_str() => Ok(()),
        Some(_) => Err(ValidationError::LabelCategoryMismatch {
            label_type_id,
            expected: expected.as_db_str().to_string(),
        }
        .into()),
    }
}

/// Ensure the account row exists.
pub(crate) fn require_account(conn: &Connection, account_id: i64) -> RolodexResult<()> {
    let exists: Option<i64> = conn
        .prepare_cached("SELECT id FROM accounts WHERE id = ?1")
        .db()?
        .query_row([account_id], |r| r.get(0))
        .optional()
        .db()?;
    match exists {
        Some(_) => Ok(()),
        None => Err(StorageError::AccountNotFound { account_id }.into()),
    }
}

/// Flag contacts as written but not yet stamped.
pub(crate) fn mark_pending(conn: &Connection, contact_id: ContactId) -> RolodexResult<()> {
    conn.prepare_cached(
        "UPDATE contacts SET stamp_pending = 1, updated_at_ms = ?2 WHERE id = ?1",
    )
    .db()?
    .execute(params![contact_id, now_ms()])
    .db()?;
    Ok(())
}
