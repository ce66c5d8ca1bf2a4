use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::error::{TouchError, TouchResult};
use crate::utils::{quote_identifier, validate_identifier};

/// One batched timestamp update: every column gets the same value, every
/// listed primary key is affected.
///
/// Renders as:
/// `UPDATE "posts" SET "updated_at" = $1, "viewed_at" = $1 WHERE "id" IN (1, 2)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateStatement {
    pub table: String,
    pub primary_key_column: String,
    pub columns: Vec<String>,
    pub value: DateTime<Utc>,
    pub ids: Vec<i64>,
}

impl UpdateStatement {
    /// Build a statement, validating every identifier.
    pub fn new(
        table: &str,
        primary_key_column: &str,
        columns: Vec<String>,
        value: DateTime<Utc>,
        ids: Vec<i64>,
    ) -> TouchResult<Self> {
        validate_identifier(table)?;
        validate_identifier(primary_key_column)?;
        for column in &columns {
            validate_identifier(column)?;
        }

        if columns.is_empty() {
            return Err(crate::internal_error!("update statement for '{}' has no columns", table));
        }
        if ids.is_empty() {
            return Err(crate::internal_error!("update statement for '{}' has no ids", table));
        }

        Ok(Self {
            table: table.to_string(),
            primary_key_column: primary_key_column.to_string(),
            columns,
            value,
            ids,
        })
    }

    /// Render parameterized SQL; `$1` is the timestamp value.
    pub fn to_sql(&self) -> String {
        let assignments = self
            .columns
            .iter()
            .map(|c| format!("{} = $1", quote_identifier(c)))
            .collect::<Vec<_>>()
            .join(", ");

        let id_list = self
            .ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "UPDATE {} SET {} WHERE {} IN ({})",
            quote_identifier(&self.table),
            assignments,
            quote_identifier(&self.primary_key_column),
            id_list
        )
    }

    /// Bind parameters matching `to_sql`
    pub fn params(&self) -> Vec<String> {
        vec![self.value.to_rfc3339()]
    }

    /// Convert a store failure on this statement into a `TouchError`
    pub fn failed(&self, error: impl std::fmt::Display) -> TouchError {
        TouchError::store(self.to_sql(), error)
    }
}
