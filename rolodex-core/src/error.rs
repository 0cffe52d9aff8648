//! Error types for rolodex operations

use crate::{AccountId, ContactId, EntityType};
use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity_type:?} with id {id}")]
    NotFound { entity_type: EntityType, id: i64 },

    #[error("Contact not found for uid {uid}")]
    UidNotFound { uid: String },

    #[error("Account not found: {account_id}")]
    AccountNotFound { account_id: AccountId },

    #[error("Conflict on {entity_type:?}: {reason}")]
    Conflict {
        entity_type: EntityType,
        reason: String,
    },

    #[error("Stamp failed for contact {contact_id}: {reason}")]
    StampFailure { contact_id: ContactId, reason: String },

    #[error("Backend error: {reason}")]
    Backend { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation deadline exceeded")]
    DeadlineExceeded,
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Label {label_type_id} is not a {expected} label")]
    LabelCategoryMismatch { label_type_id: i64, expected: String },

    #[error("Patch contains no field updates")]
    EmptyPatch,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to read config file: {reason}")]
    Io { reason: String },

    #[error("Failed to parse config TOML: {reason}")]
    Parse { reason: String },
}

/// Master error type for all rolodex errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RolodexError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl RolodexError {
    /// Shorthand for a missing entity.
    pub fn not_found(entity_type: EntityType, id: i64) -> Self {
        StorageError::NotFound { entity_type, id }.into()
    }

    /// True when the error reports a missing (or tombstoned) entity.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RolodexError::Storage(StorageError::NotFound { .. } | StorageError::UidNotFound { .. })
        )
    }
}

/// Result type alias for rolodex operations.
pub type RolodexResult<T> = Result<T, RolodexError>;

// =============================================================================
// TESTS
// =============================================================================
