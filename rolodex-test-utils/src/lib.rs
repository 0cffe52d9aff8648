//! Rolodex Test Utilities
//!
//! Shared test infrastructure for the rolodex workspace:
//! - A fault-injecting token authority
//! - Proptest generators for contacts and patches
//! - Fixtures for stores, accounts, and lookup ids
//! - Assertions for rolodex error variants

pub use rolodex_core::{
    AccountId, Contact, ContactId, ContactPatch, EntityType, Gender, LabelCategory, OpContext,
    RolodexError, RolodexResult, StorageError, StoreConfig, SyncToken, ValidationError,
};
pub use rolodex_storage::{ContactStore, SqlVersionAuthority, VersionAuthority};

use rolodex_storage::rusqlite::Transaction;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

// ============================================================================
// FAULT INJECTION
// ============================================================================

/// Token authority that fails on demand.
///
/// Delegates to [`SqlVersionAuthority`] until [`FailingAuthority::fail`] is
/// switched on; every issuance attempt after that returns a backend error.
#[derive(Debug, Default)]
pub struct FailingAuthority {
    failing: AtomicBool,
    attempts: AtomicU64,
}

impl FailingAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start or stop failing.
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Issuance attempts seen so far, including failed ones.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl VersionAuthority for FailingAuthority {
    fn increment_in(&self, tx: &Transaction<'_>, account_id: AccountId) -> RolodexResult<SyncToken> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Backend {
                reason: "injected token failure".to_string(),
            }
            .into());
        }
        SqlVersionAuthority.increment_in(tx, account_id)
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for rolodex types.

    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    /// Generate a Gender variant.
    pub fn arb_gender() -> impl Strategy<Value = Gender> {
        prop_oneof![
            Just(Gender::Male),
            Just(Gender::Female),
            Just(Gender::Unspecified),
        ]
    }

    /// Optional name part, sometimes blank or padded with whitespace.
    pub fn arb_name_part() -> impl Strategy<Value = Option<String>> {
        prop_oneof![
            Just(None),
            Just(Some(String::new())),
            Just(Some("   ".to_string())),
            "[A-Z][a-z]{1,10}".prop_map(Some),
            " [A-Z][a-z]{1,8} ".prop_map(Some),
        ]
    }

    /// Generate a calendar date between 1900 and 2030.
    pub fn arb_date() -> impl Strategy<Value = NaiveDate> {
        (1900i32..2030, 1u32..=12, 1u32..=28)
            .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default())
    }

    /// Generate a contact with parent fields and unlabeled child rows.
    pub fn arb_contact() -> impl Strategy<Value = Contact> {
        (
            (arb_name_part(), arb_name_part(), arb_name_part()),
            (arb_name_part(), arb_name_part(), arb_name_part()),
            arb_gender(),
            prop::option::of(arb_date()),
            prop::option::of("[a-z ]{0,40}"),
            prop::collection::vec("[a-z]{1,8}@example\\.com", 0..3),
        )
            .prop_map(
                |((prefix, given, middle), (family, suffix, nickname), gender, birthday, notes, emails)| {
                    Contact {
                        prefix,
                        given_name: given,
                        middle_name: middle,
                        family_name: family,
                        suffix,
                        nickname,
                        gender,
                        birthday,
                        notes,
                        emails: emails
                            .into_iter()
                            .map(|address| rolodex_core::Email {
                                address,
                                ..Default::default()
                            })
                            .collect(),
                        ..Contact::default()
                    }
                },
            )
    }

    /// Generate a non-empty patch.
    pub fn arb_patch() -> impl Strategy<Value = ContactPatch> {
        (
            arb_name_part(),
            arb_name_part(),
            arb_gender(),
            prop::option::of(arb_date()),
            prop::option::of("[a-z]{0,20}"),
        )
            .prop_map(|(given, family, gender, birthday, notes)| {
                ContactPatch::new()
                    .given_name(given.as_deref())
                    .family_name(family.as_deref())
                    .gender(gender)
                    .birthday(birthday)
                    .notes(notes.as_deref())
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built stores and lookups.

    use super::*;

    /// In-memory store with one fresh account.
    pub fn store_with_account() -> (Arc<ContactStore>, AccountId) {
        let store = ContactStore::open_in_memory().expect("open in-memory store");
        let account = store
            .create_account(&OpContext::background(), "test-account")
            .expect("create account");
        (Arc::new(store), account.account_id)
    }

    /// In-memory store backed by a [`FailingAuthority`], with one account.
    pub fn failing_store() -> (Arc<ContactStore>, Arc<FailingAuthority>, AccountId) {
        let authority = Arc::new(FailingAuthority::new());
        let store = ContactStore::with_authority(StoreConfig::in_memory(), authority.clone())
            .expect("open in-memory store");
        let account = store
            .create_account(&OpContext::background(), "test-account")
            .expect("create account");
        (Arc::new(store), authority, account.account_id)
    }

    /// Contact with a given name, family name, and gender.
    pub fn person(given: &str, family: &str, gender: Gender) -> Contact {
        let mut contact = Contact::named(given, family);
        contact.gender = gender;
        contact
    }

    /// Create a contact and return its id.
    pub fn create_person(
        store: &ContactStore,
        account_id: AccountId,
        given: &str,
        gender: Gender,
    ) -> ContactId {
        store
            .create_contact(
                &OpContext::background(),
                account_id,
                &person(given, "Test", gender),
            )
            .expect("create contact")
            .contact_id
    }

    /// Id of a seeded relationship type.
    pub fn relationship_type(store: &ContactStore, name: &str) -> i64 {
        store
            .relationship_type_by_name(&OpContext::background(), name)
            .expect("seeded relationship type")
            .relationship_type_id
    }

    /// Id of a seeded label.
    pub fn label(store: &ContactStore, category: LabelCategory, name: &str) -> i64 {
        store
            .label_type_id(&OpContext::background(), category, name)
            .expect("label lookup")
            .expect("seeded label")
    }

    /// Whether a contact is still waiting for its version stamp.
    pub fn stamp_pending(store: &ContactStore, contact_id: ContactId) -> bool {
        store
            .pending_contact_ids(&OpContext::background())
            .expect("pending ids")
            .contains(&contact_id)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for rolodex error variants.

    use super::*;

    /// Assert that a result is a NotFound error for the given entity.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &RolodexResult<T>, entity_type: EntityType) {
        match result {
            Err(RolodexError::Storage(StorageError::NotFound { entity_type: et, .. })) => {
                assert_eq!(*et, entity_type, "Wrong entity type in NotFound error");
            }
            other => panic!("Expected NotFound error for {:?}, got: {:?}", entity_type, other),
        }
    }

    /// Assert that a result is a Validation error.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &RolodexResult<T>) {
        match result {
            Err(RolodexError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Assert that a result is a Conflict error.
    #[track_caller]
    pub fn assert_conflict<T: std::fmt::Debug>(result: &RolodexResult<T>) {
        match result {
            Err(RolodexError::Storage(StorageError::Conflict { .. })) => {}
            other => panic!("Expected Conflict error, got: {:?}", other),
        }
    }

    /// Assert that tokens are strictly increasing.
    #[track_caller]
    pub fn assert_strictly_increasing(tokens: &[SyncToken]) {
        for pair in tokens.windows(2) {
            assert!(
                pair[0] < pair[1],
                "tokens not strictly increasing: {} then {}",
                pair[0],
                pair[1]
            );
        }
    }
}
