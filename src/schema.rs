//! Column schema parsed from the two header records, and the per-record
//! type check applied to every data row.

use std::fmt;
use std::str::FromStr;

use crate::error::{MalformedRecord, PipelineError, PipelineResult};
use crate::record::Record;

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// Any text.
    String,
    /// 64-bit signed integer.
    Long,
}

impl ColumnType {
    /// Canonical (lowercase) type name.
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Long => "long",
        }
    }

    /// Whether `item` is acceptable in a column of this type.
    pub fn accepts(self, item: &str) -> bool {
        match self {
            ColumnType::String => true,
            ColumnType::Long => item.parse::<i64>().is_ok(),
        }
    }
}

impl FromStr for ColumnType {
    type Err = PipelineError;

    /// Parse a type name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" => Ok(ColumnType::String),
            "long" => Ok(ColumnType::Long),
            _ => Err(PipelineError::format(format!(
                "invalid type name in .tsv file: '{s}'"
            ))),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single named, typed column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Ordered columns governing a TSV stream. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Build a schema from the column-name record and the type-name record.
    ///
    /// Fails with [`PipelineError::Format`] if either record is empty, their
    /// lengths differ, or a type name is not `string` or `long`.
    pub fn from_header(names: &Record, types: &Record) -> PipelineResult<Self> {
        if names.is_empty() || types.is_empty() {
            return Err(PipelineError::format(
                "header and type records must both declare at least one column",
            ));
        }
        if names.len() != types.len() {
            return Err(PipelineError::format(format!(
                "number of headers ({}) does not match number of types ({}) in .tsv file",
                names.len(),
                types.len()
            )));
        }

        let columns = names
            .items()
            .iter()
            .zip(types.items())
            .map(|(name, type_name)| Ok(Column::new(name.as_str(), type_name.parse()?)))
            .collect::<PipelineResult<Vec<_>>>()?;

        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterate column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Index of the first column named `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Check a data record against the schema.
    pub fn check(&self, record: &Record) -> Result<(), MalformedRecord> {
        if record.len() != self.columns.len() {
            return Err(MalformedRecord::WrongLength {
                expected: self.columns.len(),
                found: record.len(),
            });
        }
        for (column, item) in self.columns.iter().zip(record.items()) {
            if !column.column_type.accepts(item) {
                return Err(MalformedRecord::NotALong {
                    column: column.name.clone(),
                    item: item.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn is_well_formed(&self, record: &Record) -> bool {
        self.check(record).is_ok()
    }
}
