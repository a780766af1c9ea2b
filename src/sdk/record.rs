use std::any::type_name;

use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("expected result rows to be an array, got: {0}")]
    NotAnArray(&'static str),

    #[error("expected row {row} to be an array, got: {got}")]
    RowNotAnArray { row: usize, got: &'static str },

    #[error("expected row {row} to be an object, got: {got}")]
    RowNotAnObject { row: usize, got: &'static str },

    #[error("column not in result: {0}")]
    UnknownColumn(String),

    #[error("column {col} (index {idx}) missing in row {row}")]
    MissingCell { col: String, idx: usize, row: usize },

    #[error("column {col} in row {row} is null")]
    NullCell { col: String, row: usize },

    #[error("failed to parse column {col} in row {row} as {type}: {reason}")]
    InvalidCell {
        col: String,
        r#type: &'static str,
        row: usize,
        reason: String,
    },

    #[error("failed to parse column {col} in row {row} as type {type}: {source}")]
    DeserializeTypedCell {
        col: String,
        r#type: String,
        row: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// A result set independent of the driver that produced it.
///
/// Snowflake hands back most cells as strings, whatever the column type, so the
/// typed accessors on [`RecordRef`] parse strings as well as native JSON values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl RowSet {
    pub fn new(columns: Vec<String>) -> Self {
        RowSet { columns, rows: Vec::new() }
    }

    /// Rows as returned in a JSON result: an array of arrays, positional on `columns`.
    pub fn from_json_rows(columns: Vec<String>, value: &Value) -> Result<Self, RecordError> {
        let rows = value.as_array().ok_or(RecordError::NotAnArray(json_kind(value)))?;
        let rows = rows
            .iter()
            .enumerate()
            .map(|(row, v)| {
                v.as_array().cloned().ok_or(RecordError::RowNotAnArray {
                    row,
                    got: json_kind(v),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RowSet { columns, rows })
    }

    /// Rows given as an array of objects. Columns are the union of keys, in first-seen order.
    pub fn from_objects(value: &Value) -> Result<Self, RecordError> {
        let objects = value.as_array().ok_or(RecordError::NotAnArray(json_kind(value)))?;
        let mut set = RowSet::default();
        for (row, object) in objects.iter().enumerate() {
            let object = object.as_object().ok_or(RecordError::RowNotAnObject {
                row,
                got: json_kind(object),
            })?;
            for key in object.keys() {
                if !set.columns.contains(key) {
                    set.columns.push(key.clone());
                }
            }
        }
        for object in objects.iter().filter_map(Value::as_object) {
            let row = set
                .columns
                .iter()
                .map(|c| object.get(c).cloned().unwrap_or(Value::Null))
                .collect();
            set.rows.push(row);
        }
        Ok(set)
    }

    pub fn push_row(&mut self, row: Vec<Value>) {
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter_records(&self) -> RecordsIter<'_> {
        RecordsIter {
            columns: &self.columns,
            rows: self.rows.iter(),
            row_idx: 0,
        }
    }

    pub fn first(&self) -> Option<RecordRef<'_>> {
        self.iter_records().next()
    }
}

/// View over one row of a [`RowSet`].
#[derive(Debug, Clone, Copy)]
pub struct RecordRef<'a> {
    columns: &'a [String],
    row: &'a [Value],
    row_idx: usize,
}

impl<'a> RecordRef<'a> {
    fn col_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn get(&self, name: &str) -> Option<&'a Value> {
        let idx = self.col_index(name)?;
        self.row.get(idx).filter(|v| !v.is_null())
    }

    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, RecordError> {
        let Some(v) = self.get(name) else { return Ok(None) };

        Ok(Some(T::deserialize(v).map_err(|e| RecordError::DeserializeTypedCell {
            r#type: type_name::<T>().to_string(),
            col: name.to_string(),
            row: self.row_idx,
            source: e,
        })?))
    }

    /// Like get(), but errors if not present
    pub fn require(&self, name: &str) -> Result<&'a Value, RecordError> {
        let idx = self
            .col_index(name)
            .ok_or_else(|| RecordError::UnknownColumn(name.to_string()))?;

        let v = self.row.get(idx).ok_or_else(|| RecordError::MissingCell {
            col: name.to_string(),
            idx,
            row: self.row_idx,
        })?;
        if v.is_null() {
            return Err(RecordError::NullCell {
                col: name.to_string(),
                row: self.row_idx,
            });
        }
        Ok(v)
    }

    pub fn require_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, RecordError> {
        let v = self.require(name)?;
        T::deserialize(v).map_err(|e| RecordError::DeserializeTypedCell {
            r#type: type_name::<T>().to_string(),
            col: name.to_string(),
            row: self.row_idx,
            source: e,
        })
    }

    /// Any scalar rendered as text. Null and absent columns are `None`.
    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get(name).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    pub fn require_string(&self, name: &str) -> Result<String, RecordError> {
        self.require(name)?;
        Ok(self.get_string(name).unwrap_or_default())
    }

    /// Empty strings count as absent.
    pub fn get_i64(&self, name: &str) -> Result<Option<i64>, RecordError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| self.invalid(name, "integer", n.to_string())),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| self.invalid(name, "integer", s.clone())),
            Some(other) => Err(self.invalid(name, "integer", other.to_string())),
        }
    }

    /// Accepts native booleans and the `true`/`false` strings Snowflake emits, in any case.
    pub fn get_bool(&self, name: &str) -> Result<Option<bool>, RecordError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(self.invalid(name, "boolean", s.clone())),
            },
            Some(other) => Err(self.invalid(name, "boolean", other.to_string())),
        }
    }

    fn invalid(&self, col: &str, r#type: &'static str, reason: String) -> RecordError {
        RecordError::InvalidCell {
            col: col.to_string(),
            r#type,
            row: self.row_idx,
            reason,
        }
    }
}

pub struct RecordsIter<'a> {
    columns: &'a [String],
    rows: std::slice::Iter<'a, Vec<Value>>,
    row_idx: usize,
}

impl<'a> Iterator for RecordsIter<'a> {
    type Item = RecordRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        let idx = self.row_idx;
        self.row_idx += 1;
        Some(RecordRef {
            columns: self.columns,
            row: row.as_slice(),
            row_idx: idx,
        })
    }
}

/// Helper because serde_json::Value doesn't expose a simple "kind()".
pub(crate) fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample() -> RowSet {
        RowSet::from_json_rows(
            vec!["name".into(), "max_nodes".into(), "auto_resume".into(), "comment".into()],
            &json!([["P1", "3", "true", null], ["P2", 5, false, ""]]),
        )
        .unwrap()
    }

    #[test]
    fn test_typed_accessors() {
        let rows = sample();
        let records: Vec<_> = rows.iter_records().collect();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].require_string("name").unwrap(), "P1");
        assert_eq!(records[0].get_i64("max_nodes").unwrap(), Some(3));
        assert_eq!(records[1].get_i64("max_nodes").unwrap(), Some(5));
        assert_eq!(records[0].get_bool("auto_resume").unwrap(), Some(true));
        assert_eq!(records[1].get_bool("auto_resume").unwrap(), Some(false));
        assert_eq!(records[0].get_string("comment"), None);
        assert_eq!(records[1].get_string("comment"), Some(String::new()));
    }

    #[test]
    fn test_missing_and_null_columns() {
        let rows = sample();
        let first = rows.first().unwrap();
        assert!(matches!(first.require("owner"), Err(RecordError::UnknownColumn(_))));
        assert!(matches!(first.require("comment"), Err(RecordError::NullCell { .. })));
        assert_eq!(first.get("owner"), None);
    }

    #[test]
    fn test_invalid_cells() {
        let rows = RowSet::from_json_rows(vec!["n".into()], &json!([["three"]])).unwrap();
        let first = rows.first().unwrap();
        assert!(matches!(first.get_i64("n"), Err(RecordError::InvalidCell { .. })));
        assert!(matches!(first.get_bool("n"), Err(RecordError::InvalidCell { .. })));
    }

    #[test]
    fn test_rejects_malformed_payloads() {
        assert!(matches!(
            RowSet::from_json_rows(vec![], &json!({"a": 1})),
            Err(RecordError::NotAnArray("object"))
        ));
        assert!(matches!(
            RowSet::from_json_rows(vec![], &json!([1])),
            Err(RecordError::RowNotAnArray { row: 0, got: "number" })
        ));
    }

    #[test]
    fn test_from_objects() {
        let rows = RowSet::from_objects(&json!([{"name": "A"}, {"name": "B", "comment": "c"}])).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.columns().contains(&"comment".to_string()));
        let first = rows.first().unwrap();
        assert_eq!(first.get_string("comment"), None);
    }
}
