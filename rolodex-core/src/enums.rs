//! Closed enumerations stored as text columns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity type discriminator used in error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Contact,
    Relationship,
    RelationshipType,
    LabelType,
}

// ============================================================================
// GENDER
// ============================================================================

/// Gender of a contact. Drives reverse relationship naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unspecified,
}

impl Gender {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unspecified => "unspecified",
        }
    }

    /// Parse from database string representation.
    ///
    /// Accepts the single-letter vCard forms as well.
    pub fn from_db_str(s: &str) -> Result<Self, GenderParseError> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            "unspecified" | "" | "n" | "o" | "u" => Ok(Gender::Unspecified),
            _ => Err(GenderParseError(s.to_string())),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for Gender {
    type Err = GenderParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid gender string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenderParseError(pub String);

impl fmt::Display for GenderParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid gender: {}", self.0)
    }
}

impl std::error::Error for GenderParseError {}

// ============================================================================
// LABEL CATEGORY
// ============================================================================

/// Category scoping a shared contact label (Home, Work, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelCategory {
    Phone,
    Email,
    Address,
    Url,
}

impl LabelCategory {
    pub const ALL: [LabelCategory; 4] = [
        LabelCategory::Phone,
        LabelCategory::Email,
        LabelCategory::Address,
        LabelCategory::Url,
    ];

    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            LabelCategory::Phone => "phone",
            LabelCategory::Email => "email",
            LabelCategory::Address => "address",
            LabelCategory::Url => "url",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, LabelCategoryParseError> {
        match s.to_lowercase().as_str() {
            "phone" => Ok(LabelCategory::Phone),
            "email" => Ok(LabelCategory::Email),
            "address" => Ok(LabelCategory::Address),
            "url" => Ok(LabelCategory::Url),
            _ => Err(LabelCategoryParseError(s.to_string())),
        }
    }
}

impl fmt::Display for LabelCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for LabelCategory {
    type Err = LabelCategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid label category string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCategoryParseError(pub String);

impl fmt::Display for LabelCategoryParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid label category: {}", self.0)
    }
}

impl std::error::Error for LabelCategoryParseError {}
