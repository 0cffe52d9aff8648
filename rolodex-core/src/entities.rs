//! Contact aggregate and its child collections.

use crate::{
    compose_full_name, AccountId, ContactId, Gender, LabelCategory, SyncToken, Timestamp,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// ACCOUNT
// ============================================================================

/// Tenant owning a private sync counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: AccountId,
    pub name: String,
    /// Last token issued for this account. Read-only outside the authority.
    pub sync_counter: SyncToken,
    pub created_at: Timestamp,
}

// ============================================================================
// CHILD COLLECTIONS
// ============================================================================

/// Email address of a contact.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Email {
    /// Row id; `None` until persisted. Ignored on write.
    pub id: Option<i64>,
    pub label_type_id: Option<i64>,
    pub address: String,
    pub is_primary: bool,
}

/// Phone number of a contact.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Phone {
    pub id: Option<i64>,
    pub label_type_id: Option<i64>,
    pub number: String,
    pub is_primary: bool,
}

/// Postal address of a contact.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Address {
    pub id: Option<i64>,
    pub label_type_id: Option<i64>,
    pub street: Option<String>,
    pub extended: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

/// Employer or affiliation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Organization {
    pub id: Option<i64>,
    pub name: String,
    pub title: Option<String>,
    pub department: Option<String>,
}

/// Web link of a contact.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Url {
    pub id: Option<i64>,
    pub label_type_id: Option<i64>,
    pub url: String,
}

/// Custom labelled date (anniversary, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherDate {
    pub id: Option<i64>,
    pub label: String,
    pub date: NaiveDate,
}

/// Directed edge: `related_contact_id` is this contact's `relationship_type_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: Option<i64>,
    pub related_contact_id: ContactId,
    pub relationship_type_id: i64,
}

/// Relation to a person who is not stored as a contact.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OtherRelationship {
    pub id: Option<i64>,
    pub name: String,
    pub relationship_type_id: Option<i64>,
}

// ============================================================================
// CONTACT
// ============================================================================

/// A contact plus all of its child rows, written and read as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Contact {
    /// Row id; zero before the contact is created.
    pub contact_id: ContactId,
    pub account_id: AccountId,
    /// Client-visible identifier. Synthesized on create when empty.
    pub uid: String,

    pub prefix: Option<String>,
    pub given_name: Option<String>,
    pub middle_name: Option<String>,
    pub family_name: Option<String>,
    pub suffix: Option<String>,
    pub nickname: Option<String>,
    /// Derived from the name parts on every write.
    pub full_name: String,
    pub gender: Gender,
    pub birthday: Option<NaiveDate>,
    pub notes: Option<String>,

    pub version_token: SyncToken,
    pub last_modified_token: SyncToken,
    pub etag: String,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
    pub deleted_at: Option<Timestamp>,

    pub emails: Vec<Email>,
    pub phones: Vec<Phone>,
    pub addresses: Vec<Address>,
    pub organizations: Vec<Organization>,
    pub urls: Vec<Url>,
    pub other_dates: Vec<OtherDate>,
    pub relationships: Vec<Relationship>,
    pub other_relationships: Vec<OtherRelationship>,
}

impl Contact {
    /// Start a contact with just a given and family name.
    pub fn named(given: impl Into<String>, family: impl Into<String>) -> Self {
        Self {
            given_name: Some(given.into()),
            family_name: Some(family.into()),
            ..Self::default()
        }
    }

    /// Display name derived from the current name parts.
    pub fn display_name(&self) -> String {
        compose_full_name(
            self.prefix.as_deref(),
            self.given_name.as_deref(),
            self.middle_name.as_deref(),
            self.family_name.as_deref(),
            self.suffix.as_deref(),
            self.nickname.as_deref(),
        )
    }

    /// Content used for etag fingerprints: everything except version bookkeeping.
    pub fn fingerprint_bytes(&self) -> Vec<u8> {
        let content = FingerprintView {
            uid: &self.uid,
            full_name: &self.full_name,
            prefix: &self.prefix,
            given_name: &self.given_name,
            middle_name: &self.middle_name,
            family_name: &self.family_name,
            suffix: &self.suffix,
            nickname: &self.nickname,
            gender: self.gender,
            birthday: &self.birthday,
            notes: &self.notes,
            emails: &self.emails,
            phones: &self.phones,
            addresses: &self.addresses,
            organizations: &self.organizations,
            urls: &self.urls,
            other_dates: &self.other_dates,
            relationships: &self.relationships,
            other_relationships: &self.other_relationships,
        };
        // Serializing plain data into a Vec cannot fail.
        serde_json::to_vec(&content).unwrap_or_default()
    }
}

#[derive(Serialize)]
struct FingerprintView<'a> {
    uid: &'a str,
    full_name: &'a str,
    prefix: &'a Option<String>,
    given_name: &'a Option<String>,
    middle_name: &'a Option<String>,
    family_name: &'a Option<String>,
    suffix: &'a Option<String>,
    nickname: &'a Option<String>,
    gender: Gender,
    birthday: &'a Option<NaiveDate>,
    notes: &'a Option<String>,
    emails: &'a [Email],
    phones: &'a [Phone],
    addresses: &'a [Address],
    organizations: &'a [Organization],
    urls: &'a [Url],
    other_dates: &'a [OtherDate],
    relationships: &'a [Relationship],
    other_relationships: &'a [OtherRelationship],
}

/// Lightweight listing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSummary {
    pub contact_id: ContactId,
    pub uid: String,
    pub full_name: String,
    pub etag: String,
    pub version_token: SyncToken,
}

/// Options for [`Contact`] replace-all updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOptions {
    /// Leave stored relationship edges untouched for this update.
    pub skip_relationships: bool,
}

impl UpdateOptions {
    pub fn skip_relationships() -> Self {
        Self {
            skip_relationships: true,
        }
    }
}

// ============================================================================
// LOOKUPS
// ============================================================================

/// Shared label (Home, Work, ...) scoped to one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactLabelType {
    pub label_type_id: i64,
    pub category: LabelCategory,
    pub name: String,
}

/// Named relationship with gender-specific reverse names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipType {
    pub relationship_type_id: i64,
    pub name: String,
    pub reverse_male: Option<String>,
    pub reverse_female: Option<String>,
    pub reverse_neutral: Option<String>,
}

impl RelationshipType {
    /// Reverse name for a counterpart of the given gender.
    ///
    /// Male and female pick their specific name; anything else, or an empty
    /// specific name, falls back to the neutral name.
    pub fn reverse_name_for(&self, gender: Gender) -> Option<&str> {
        let specific = match gender {
            Gender::Male => self.reverse_male.as_deref(),
            Gender::Female => self.reverse_female.as_deref(),
            Gender::Unspecified => None,
        };
        specific
            .filter(|name| !name.trim().is_empty())
            .or_else(|| {
                self.reverse_neutral
                    .as_deref()
                    .filter(|name| !name.trim().is_empty())
            })
    }
}

/// Outcome of the mirror check for a prospective edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorDecision {
    /// No reverse edge represents this relationship; insert it.
    Insert,
    /// The reverse edge already exists; do not insert.
    AlreadyMirrored { reverse_type_id: i64 },
}

impl MirrorDecision {
    pub fn should_insert(&self) -> bool {
        matches!(self, MirrorDecision::Insert)
    }
}

/// Result of adding a relationship edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// A new edge row was written.
    Inserted { relationship_id: i64 },
    /// The identical directed edge already existed.
    AlreadyPresent,
    /// The relationship is represented by the reverse edge.
    Mirrored { reverse_type_id: i64 },
}

/// Whether a relationship view comes from a stored edge or its reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipDirection {
    Stored,
    Mirrored,
}

/// Relationship as seen from one contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipView {
    pub relationship_id: i64,
    pub related_contact_id: ContactId,
    pub related_uid: String,
    pub label: String,
    pub direction: RelationshipDirection,
}

// ============================================================================
// CHANGE FEED
// ============================================================================

/// One contact as reported to a sync client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactChangeRecord {
    pub uid: String,
    pub etag: String,
    pub last_modified_token: SyncToken,
    /// Non-null signals a tombstone.
    pub deleted_at: Option<Timestamp>,
    pub version_token: SyncToken,
}

impl ContactChangeRecord {
    pub fn is_deletion(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Changes since a client baseline plus the baseline to persist next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub changes: Vec<ContactChangeRecord>,
    pub next_token: SyncToken,
}

impl ChangeSet {
    /// Build from ordered records; an empty set keeps the client's token.
    pub fn from_records(since: SyncToken, changes: Vec<ContactChangeRecord>) -> Self {
        let next_token = changes
            .iter()
            .map(|c| c.version_token)
            .max()
            .unwrap_or(since)
            .max(since);
        Self {
            changes,
            next_token,
        }
    }
}
