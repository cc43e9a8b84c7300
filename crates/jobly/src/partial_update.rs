//! Partial-update `SET` clause generation.
//!
//! A PATCH-style update only touches the fields the client sent. This module
//! turns such a sparse payload into a parameterized assignment list that the
//! data-access layer splices into its own `UPDATE` statement.
//!
//! # Example
//!
//! ```ignore
//! use jobly::{FieldNameMap, UpdatePayload, sql_for_partial_update};
//!
//! let payload = UpdatePayload::new()
//!     .with("firstName", "Yvonne")
//!     .with("email", "test@test.com");
//! let names = FieldNameMap::from([("firstName", "first_name")]);
//!
//! let update = sql_for_partial_update(payload, &names)?;
//! assert_eq!(update.set_cols, r#""first_name"=$1, "email"=$2"#);
//!
//! // The caller owns the WHERE placeholder: it comes right after the values.
//! let sql = format!(
//!     "UPDATE users SET {} WHERE username = ${}",
//!     update.set_cols,
//!     update.next_placeholder(),
//! );
//! ```

use crate::error::{JoblyError, JoblyResult};
use crate::value::SqlValue;
use std::collections::HashMap;
use std::fmt::Write;
use tokio_postgres::types::ToSql;

/// Ordered set of `(field, value)` pairs to write.
///
/// Order is the order fields were first inserted and decides placeholder
/// numbering. Field names are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdatePayload {
    fields: Vec<(String, SqlValue)>,
}

impl UpdatePayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `field` to `value`.
    ///
    /// A field that is already present keeps its position and gets the new value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<SqlValue>) -> &mut Self {
        let field = field.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((field, value)),
        }
        self
    }

    /// Chainable form of [`UpdatePayload::set`].
    pub fn with(mut self, field: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.set(field, value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&SqlValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Build a payload from a JSON object, keeping its key order.
    ///
    /// Values must be scalars; arrays and objects are a [`JoblyError::BadRequest`].
    pub fn from_json_object(object: serde_json::Map<String, serde_json::Value>) -> JoblyResult<Self> {
        let mut payload = Self::new();
        for (field, value) in object {
            let value = SqlValue::try_from(value).map_err(|_| {
                JoblyError::bad_request(format!("field '{field}' must be a scalar value"))
            })?;
            payload.set(field, value);
        }
        Ok(payload)
    }

    /// Build a payload from any JSON value; only objects are accepted.
    pub fn from_json(value: serde_json::Value) -> JoblyResult<Self> {
        match value {
            serde_json::Value::Object(object) => Self::from_json_object(object),
            other => Err(JoblyError::bad_request(format!(
                "update body must be a JSON object, got {other}"
            ))),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for UpdatePayload
where
    K: Into<String>,
    V: Into<SqlValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut payload = Self::new();
        for (field, value) in iter {
            payload.set(field, value);
        }
        payload
    }
}

impl IntoIterator for UpdatePayload {
    type Item = (String, SqlValue);
    type IntoIter = std::vec::IntoIter<(String, SqlValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// Logical field name → column name lookup.
///
/// Fields without an entry use their own name as the column name. Column names
/// are not checked; they must come from trusted code, never from input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldNameMap {
    columns: HashMap<String, String>,
}

impl FieldNameMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `field` to `column`.
    pub fn with(mut self, field: impl Into<String>, column: impl Into<String>) -> Self {
        self.columns.insert(field.into(), column.into());
        self
    }

    /// Column for `field`, falling back to `field` itself.
    pub fn column_for<'a>(&'a self, field: &'a str) -> &'a str {
        self.columns.get(field).map_or(field, String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for FieldNameMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K, V> FromIterator<(K, V)> for FieldNameMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            columns: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Output of [`sql_for_partial_update`].
///
/// `values[i]` is bound to placeholder `$<i + 1>` in `set_cols`.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialUpdate {
    /// `"col1"=$1, "col2"=$2, ...`
    pub set_cols: String,
    pub values: Vec<SqlValue>,
}

impl PartialUpdate {
    /// Index of the first placeholder after the assignment list.
    pub fn next_placeholder(&self) -> usize {
        self.values.len() + 1
    }

    /// Parameter refs for the assignment list followed by `trailing`.
    pub fn params_with<'a>(
        &'a self,
        trailing: &[&'a (dyn ToSql + Sync)],
    ) -> Vec<&'a (dyn ToSql + Sync)> {
        self.values
            .iter()
            .map(|v| v as &(dyn ToSql + Sync))
            .chain(trailing.iter().copied())
            .collect()
    }
}

/// Build the `SET` list for a partial update.
///
/// Each payload field becomes `"<column>"=$<n>` with `n` counting from 1 in
/// payload order; the column comes from `field_names` or is the field name
/// itself. Values are returned in the same order, nulls included.
///
/// An empty payload is a [`JoblyError::BadRequest`].
pub fn sql_for_partial_update(
    payload: UpdatePayload,
    field_names: &FieldNameMap,
) -> JoblyResult<PartialUpdate> {
    if payload.is_empty() {
        return Err(JoblyError::bad_request("No data submitted for update"));
    }

    let mut set_cols = String::new();
    let mut values = Vec::with_capacity(payload.len());

    for (idx, (field, value)) in payload.into_iter().enumerate() {
        if idx > 0 {
            set_cols.push_str(", ");
        }
        let _ = write!(
            &mut set_cols,
            "\"{}\"=${}",
            field_names.column_for(&field),
            idx + 1
        );
        values.push(value);
    }

    Ok(PartialUpdate { set_cols, values })
}
