//! The seam between a classified entry and the host that materializes rows.
//!
//! The listing never formats the host's transport representation. It fills
//! a [`FieldBuffer`] with typed values and null flags and hands both to a
//! [`TupleSink`].
use std::fmt::Display;

use crate::entry::EntryRecord;
use crate::entry::SpecialKind;
use crate::errors::Error;

/// Column types a row of the listing is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// UTF-8 text.
    Text,
    /// Signed 64 bit integer.
    Int64,
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Int64 => f.write_str("int8"),
        }
    }
}

/// Names of the listing's columns, in row order.
pub const ENTRY_COLUMN_NAMES: [&str; 5] = ["attributes", "size", "modified", "type", "name"];

/// Types of the listing's columns, in row order. Only `type` is nullable.
pub const ENTRY_COLUMN_TYPES: [ColumnType; 5] = [
    ColumnType::Text,
    ColumnType::Int64,
    ColumnType::Text,
    ColumnType::Text,
    ColumnType::Text,
];

const FIELD_ATTRIBUTES: usize = 0;
const FIELD_SIZE: usize = 1;
const FIELD_MODIFIED: usize = 2;
const FIELD_TYPE: usize = 3;
pub(crate) const FIELD_NAME: usize = 4;

/// One field value. Null fields hold [`Value::Null`] and have their null
/// flag set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Text field.
    Text(String),
    /// Integer field.
    Int64(i64),
    /// Placeholder for a null field.
    Null,
}

impl Value {
    fn into_text(self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s),
            Value::Int64(i) => Some(i.to_string()),
            Value::Null => None,
        }
    }
}

/// Host service that turns one record's values into an output row.
pub trait TupleSink {
    /// The host's row representation.
    type Row;

    /// Column types the caller expects each row to have.
    fn descriptor(&self) -> &[ColumnType];

    /// Builds a row. `values` and `nulls` have one slot per column.
    fn form_row(&mut self, values: &[Value], nulls: &[bool]) -> Result<Self::Row, Error>;
}

fn render(types: &[ColumnType]) -> String {
    let types: Vec<String> = types.iter().map(ToString::to_string).collect();
    format!("({})", types.join(", "))
}

/// Fails with `ResultTypeMismatch` unless `descriptor` is the listing's
/// row shape.
pub fn check_descriptor(descriptor: &[ColumnType]) -> Result<(), Error> {
    if descriptor == ENTRY_COLUMN_TYPES {
        Ok(())
    } else {
        Err(Error::ResultTypeMismatch {
            expected: render(&ENTRY_COLUMN_TYPES),
            found: render(descriptor),
        })
    }
}

/// Storage for one row's values and null flags.
///
/// A buffer lives for exactly one call and is released when it goes out of
/// scope, whether or not the row was formed.
#[derive(Debug)]
pub struct FieldBuffer {
    values: Vec<Value>,
    nulls: Vec<bool>,
}

impl FieldBuffer {
    fn reserve<T>(what: &str) -> Result<Vec<T>, Error> {
        let mut v = Vec::new();
        v.try_reserve_exact(ENTRY_COLUMN_TYPES.len())
            .map_err(|e| Error::Allocation {
                what: format!("{what}: {e}"),
            })?;
        Ok(v)
    }

    /// Moves the fields of `record` into a freshly reserved buffer.
    pub fn fill(record: EntryRecord) -> Result<Self, Error> {
        let mut values = Self::reserve("row values")?;
        let mut nulls = Self::reserve("row null flags")?;

        let kind = record.kind_tag();
        values.push(Value::Text(record.attributes));
        values.push(Value::Int64(record.size));
        values.push(Value::Text(record.modified));
        values.push(kind.map_or(Value::Null, |tag| Value::Text(tag.to_owned())));
        values.push(Value::Text(record.name));

        nulls.extend(values.iter().map(|v| *v == Value::Null));
        Ok(Self { values, nulls })
    }

    /// One value per column.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// One null flag per column.
    pub fn nulls(&self) -> &[bool] {
        &self.nulls
    }
}

/// Sink that rebuilds the [`EntryRecord`] from the row's fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordSink;

fn mismatch(column: usize, found: &Value) -> Error {
    Error::ResultTypeMismatch {
        expected: format!(
            "{} {}",
            ENTRY_COLUMN_NAMES[column], ENTRY_COLUMN_TYPES[column]
        ),
        found: format!("{found:?}"),
    }
}

fn text(values: &[Value], nulls: &[bool], column: usize) -> Result<Option<String>, Error> {
    match (&values[column], nulls[column]) {
        (_, true) => Ok(None),
        (Value::Text(s), false) => Ok(Some(s.clone())),
        (other, false) => Err(mismatch(column, other)),
    }
}

fn required_text(values: &[Value], nulls: &[bool], column: usize) -> Result<String, Error> {
    text(values, nulls, column)?.ok_or_else(|| mismatch(column, &Value::Null))
}

impl TupleSink for RecordSink {
    type Row = EntryRecord;

    fn descriptor(&self) -> &[ColumnType] {
        &ENTRY_COLUMN_TYPES
    }

    fn form_row(&mut self, values: &[Value], nulls: &[bool]) -> Result<EntryRecord, Error> {
        if values.len() != ENTRY_COLUMN_TYPES.len() || nulls.len() != values.len() {
            return Err(Error::ResultTypeMismatch {
                expected: render(&ENTRY_COLUMN_TYPES),
                found: format!("{} values, {} null flags", values.len(), nulls.len()),
            });
        }
        let size = match &values[FIELD_SIZE] {
            Value::Int64(size) => *size,
            other => return Err(mismatch(FIELD_SIZE, other)),
        };
        let kind = match text(values, nulls, FIELD_TYPE)? {
            Some(tag) => Some(
                SpecialKind::from_tag(&tag)
                    .ok_or_else(|| mismatch(FIELD_TYPE, &Value::Text(tag)))?,
            ),
            None => None,
        };
        Ok(EntryRecord {
            attributes: required_text(values, nulls, FIELD_ATTRIBUTES)?,
            size,
            modified: required_text(values, nulls, FIELD_MODIFIED)?,
            kind,
            name: required_text(values, nulls, FIELD_NAME)?,
        })
    }
}

/// Sink producing text cells, `None` standing for SQL `NULL`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextSink;

impl TupleSink for TextSink {
    type Row = Vec<Option<String>>;

    fn descriptor(&self) -> &[ColumnType] {
        &ENTRY_COLUMN_TYPES
    }

    fn form_row(&mut self, values: &[Value], nulls: &[bool]) -> Result<Self::Row, Error> {
        Ok(values
            .iter()
            .zip(nulls)
            .map(|(value, null)| if *null { None } else { value.clone().into_text() })
            .collect())
    }
}
