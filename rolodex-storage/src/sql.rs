//! Parameterized `UPDATE` builder.
//!
//! Assignments and filters are rendered with numbered placeholders in the
//! order they were added, and `params()` yields values in the same order.

use rolodex_core::{FieldUpdate, FieldValue};
use rusqlite::types::Value;
use rusqlite::ParamsFromIter;

#[derive(Debug, Clone)]
pub(crate) struct UpdateStatement {
    table: &'static str,
    assignments: Vec<(&'static str, Value)>,
    filters: Vec<(&'static str, Value)>,
    conditions: Vec<&'static str>,
}

impl UpdateStatement {
    pub(crate) fn new(table: &'static str) -> Self {
        Self {
            table,
            assignments: Vec::new(),
            filters: Vec::new(),
            conditions: Vec::new(),
        }
    }

    /// Add `column = ?n`.
    pub(crate) fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.assignments.push((column, value.into()));
        self
    }

    /// Add one assignment per patch entry, preserving patch order.
    pub(crate) fn set_fields(mut self, updates: &[FieldUpdate]) -> Self {
        for update in updates {
            self.assignments
                .push((update.column.as_sql(), field_value(&update.value)));
        }
        self
    }

    /// Add `column = ?n` to the WHERE clause.
    pub(crate) fn filter(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.filters.push((column, value.into()));
        self
    }

    /// Add a literal condition (no parameters) to the WHERE clause.
    pub(crate) fn condition(mut self, condition: &'static str) -> Self {
        self.conditions.push(condition);
        self
    }

    pub(crate) fn sql(&self) -> String {
        let mut n = 0;
        let mut next = || {
            n += 1;
            n
        };

        let set = self
            .assignments
            .iter()
            .map(|(column, _)| format!("{} = ?{}", column, next()))
            .collect::<Vec<_>>()
            .join(", ");

        let mut clauses: Vec<String> = self
            .filters
            .iter()
            .map(|(column, _)| format!("{} = ?{}", column, next()))
            .collect();
        clauses.extend(self.conditions.iter().map(|c| c.to_string()));

        if clauses.is_empty() {
            format!("UPDATE {} SET {}", self.table, set)
        } else {
            format!(
                "UPDATE {} SET {} WHERE {}",
                self.table,
                set,
                clauses.join(" AND ")
            )
        }
    }

    pub(crate) fn params(&self) -> ParamsFromIter<impl Iterator<Item = &Value>> {
        rusqlite::params_from_iter(
            self.assignments
                .iter()
                .chain(self.filters.iter())
                .map(|(_, value)| value),
        )
    }
}

fn field_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Text(Some(text)) => Value::Text(text.clone()),
        FieldValue::Gender(gender) => Value::Text(gender.as_db_str().to_string()),
        FieldValue::Date(Some(date)) => Value::Text(date.format("%Y-%m-%d").to_string()),
        FieldValue::Text(None) | FieldValue::Date(None) => Value::Null,
    }
}
