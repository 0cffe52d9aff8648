//! Rolodex Core - Entity Types
//!
//! Pure data structures for the contact engine. All other crates depend on this.
//! Nothing in here touches the database; storage lives in rolodex-storage.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

pub mod config;
pub mod context;
pub mod entities;
pub mod enums;
pub mod error;
pub mod name;
pub mod patch;

pub use config::{PurgeConfig, StoreConfig, DEFAULT_TOMBSTONE_RETENTION_DAYS};
pub use context::{CancelFlag, OpContext};
pub use entities::{
    Account, Address, ChangeSet, Contact, ContactChangeRecord, ContactLabelType, ContactSummary,
    EdgeOutcome, Email, MirrorDecision, Organization, OtherDate, OtherRelationship, Phone,
    Relationship, RelationshipDirection, RelationshipType, RelationshipView, UpdateOptions, Url,
};
pub use enums::{EntityType, Gender, GenderParseError, LabelCategory, LabelCategoryParseError};
pub use error::{ConfigError, RolodexError, RolodexResult, StorageError, ValidationError};
pub use name::{compose_full_name, UNNAMED_CONTACT};
pub use patch::{ContactColumn, ContactPatch, FieldUpdate, FieldValue};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Account (tenant) identifier. Each account owns one sync counter.
pub type AccountId = i64;

/// Account-local contact row identifier. Never reused after purge.
pub type ContactId = i64;

/// Monotonic per-account version stamp.
pub type SyncToken = i64;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Prefix carried by the etag of a tombstoned contact.
pub const TOMBSTONE_ETAG_PREFIX: &str = "DEL-";

/// Number of hex characters kept from the content digest.
pub const ETAG_HEX_LEN: usize = 32;

/// Generate a fresh client-visible contact uid.
///
/// UUIDv7 embeds the creation time, so uids sort by creation and are never
/// regenerated for the lifetime of a contact.
pub fn new_contact_uid() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Compute the entity tag for a stamped aggregate.
///
/// The digest covers the serialized content and the token, so two stamps of
/// identical content still yield different tags.
pub fn compute_etag(content: &[u8], token: SyncToken) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hasher.update(token.to_be_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..ETAG_HEX_LEN].to_string()
}

/// Entity tag written on a tombstoned contact.
pub fn tombstone_etag(token: SyncToken) -> String {
    format!("{}{}", TOMBSTONE_ETAG_PREFIX, token)
}
