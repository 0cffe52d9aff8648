//! Explicit field-update lists for partial contact patches.
//!
//! A patch is an ordered list of `(column, value)` pairs built by the caller.
//! The storage layer renders it into a parameterized `UPDATE` whose placeholder
//! order is exactly the list order.

use crate::{Gender, RolodexResult, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The parent-row columns a patch may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactColumn {
    Prefix,
    GivenName,
    MiddleName,
    FamilyName,
    Suffix,
    Nickname,
    Gender,
    Birthday,
    Notes,
}

impl ContactColumn {
    /// Every updatable column, in schema order.
    pub const ALL: [ContactColumn; 9] = [
        ContactColumn::Prefix,
        ContactColumn::GivenName,
        ContactColumn::MiddleName,
        ContactColumn::FamilyName,
        ContactColumn::Suffix,
        ContactColumn::Nickname,
        ContactColumn::Gender,
        ContactColumn::Birthday,
        ContactColumn::Notes,
    ];

    /// Column name in the `contacts` table.
    pub fn as_sql(&self) -> &'static str {
        match self {
            ContactColumn::Prefix => "prefix",
            ContactColumn::GivenName => "given_name",
            ContactColumn::MiddleName => "middle_name",
            ContactColumn::FamilyName => "family_name",
            ContactColumn::Suffix => "suffix",
            ContactColumn::Nickname => "nickname",
            ContactColumn::Gender => "gender",
            ContactColumn::Birthday => "birthday",
            ContactColumn::Notes => "notes",
        }
    }

    /// Whether changing this column changes the derived display name.
    pub fn affects_full_name(&self) -> bool {
        matches!(
            self,
            ContactColumn::Prefix
                | ContactColumn::GivenName
                | ContactColumn::MiddleName
                | ContactColumn::FamilyName
                | ContactColumn::Suffix
                | ContactColumn::Nickname
        )
    }

    /// Whether `value` has the type this column stores.
    pub fn accepts(&self, value: &FieldValue) -> bool {
        match self {
            ContactColumn::Gender => matches!(value, FieldValue::Gender(_)),
            ContactColumn::Birthday => matches!(value, FieldValue::Date(_)),
            _ => matches!(value, FieldValue::Text(_)),
        }
    }
}

/// Typed value for one column update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(Option<String>),
    Gender(Gender),
    Date(Option<NaiveDate>),
}

/// One `(column, value)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub column: ContactColumn,
    pub value: FieldValue,
}

/// Ordered list of field updates.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContactPatch {
    updates: Vec<FieldUpdate>,
}

impl ContactPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column. Setting a column twice keeps its first position and the
    /// last value.
    fn set(mut self, column: ContactColumn, value: FieldValue) -> Self {
        match self.updates.iter_mut().find(|u| u.column == column) {
            Some(existing) => existing.value = value,
            None => self.updates.push(FieldUpdate { column, value }),
        }
        self
    }

    pub fn prefix(self, value: Option<&str>) -> Self {
        self.set(ContactColumn::Prefix, text(value))
    }

    pub fn given_name(self, value: Option<&str>) -> Self {
        self.set(ContactColumn::GivenName, text(value))
    }

    pub fn middle_name(self, value: Option<&str>) -> Self {
        self.set(ContactColumn::MiddleName, text(value))
    }

    pub fn family_name(self, value: Option<&str>) -> Self {
        self.set(ContactColumn::FamilyName, text(value))
    }

    pub fn suffix(self, value: Option<&str>) -> Self {
        self.set(ContactColumn::Suffix, text(value))
    }

    pub fn nickname(self, value: Option<&str>) -> Self {
        self.set(ContactColumn::Nickname, text(value))
    }

    pub fn gender(self, value: Gender) -> Self {
        self.set(ContactColumn::Gender, FieldValue::Gender(value))
    }

    pub fn birthday(self, value: Option<NaiveDate>) -> Self {
        self.set(ContactColumn::Birthday, FieldValue::Date(value))
    }

    pub fn notes(self, value: Option<&str>) -> Self {
        self.set(ContactColumn::Notes, text(value))
    }

    pub fn updates(&self) -> &[FieldUpdate] {
        &self.updates
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn touches_name(&self) -> bool {
        self.updates.iter().any(|u| u.column.affects_full_name())
    }

    /// Reject updates whose value type does not match the column.
    ///
    /// The builder methods cannot produce a mismatch, but a deserialized
    /// patch can.
    pub fn validate(&self) -> RolodexResult<()> {
        if self.updates.is_empty() {
            return Err(ValidationError::EmptyPatch.into());
        }
        match self.updates.iter().find(|u| !u.column.accepts(&u.value)) {
            Some(bad) => Err(ValidationError::InvalidValue {
                field: bad.column.as_sql().to_string(),
                reason: format!("{:?} does not fit this column", bad.value),
            }
            .into()),
            None => Ok(()),
        }
    }
}

fn text(value: Option<&str>) -> FieldValue {
    FieldValue::Text(value.map(str::to_string))
}
