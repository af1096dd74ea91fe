//! Per-column terminal computations for one run.

use std::collections::BTreeMap;
use std::fmt;

use crate::computation::{Computation, Terminal};
use crate::error::{PipelineError, PipelineResult};
use crate::record::Record;
use crate::schema::{ColumnType, Schema};

/// Column name → requested terminal computation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationSpec {
    terminals: BTreeMap<String, Terminal>,
}

impl AggregationSpec {
    /// Request `terminal` for `column`, returning the kind it replaced.
    pub fn set(&mut self, column: impl Into<String>, terminal: Terminal) -> Option<Terminal> {
        self.terminals.insert(column.into(), terminal)
    }

    pub fn terminal_for(&self, column: &str) -> Option<Terminal> {
        self.terminals.get(column).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.terminals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Terminal)> {
        self.terminals.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Formatted status of one column's computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnReport {
    pub column: String,
    pub terminal: Terminal,
    pub status: String,
}

impl fmt::Display for ColumnReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.column, self.status)
    }
}

#[derive(Debug)]
struct Tally {
    index: usize,
    column: String,
    column_type: ColumnType,
    computation: Computation,
}

/// Running computations, one per configured schema column.
#[derive(Debug)]
pub struct Aggregator {
    tallies: Vec<Tally>,
    needs_record_text: bool,
}

impl Aggregator {
    /// Fresh computations for every schema column named in `spec`.
    ///
    /// Columns named in `spec` but missing from the schema are never updated
    /// and do not appear in the report.
    pub fn new(schema: &Schema, spec: &AggregationSpec) -> Self {
        for (column, terminal) in spec.iter() {
            if schema.index_of(column).is_none() {
                log::warn!("ignoring {terminal} on column '{column}', which is not in the schema");
            }
        }
        let tallies: Vec<Tally> = schema
            .columns()
            .iter()
            .enumerate()
            .filter_map(|(index, column)| {
                spec.terminal_for(&column.name).map(|terminal| Tally {
                    index,
                    column: column.name.clone(),
                    column_type: column.column_type,
                    computation: Computation::new(terminal),
                })
            })
            .collect();
        let needs_record_text = tallies
            .iter()
            .any(|t| t.computation.terminal() == Terminal::FirstDiff);
        Self {
            tallies,
            needs_record_text,
        }
    }

    /// Feed one accepted record to every computation.
    ///
    /// A numeric fault is fatal: it means a SUM or STATS computation was
    /// configured on a column holding non-integer text.
    pub fn update(&mut self, record: &Record) -> PipelineResult<()> {
        let text = if self.needs_record_text {
            record.to_line()
        } else {
            String::new()
        };
        for tally in &mut self.tallies {
            let item = record.item(tally.index).unwrap_or_default();
            tally
                .computation
                .update(item, tally.column_type, &text)
                .map_err(|fault| PipelineError::NumericType {
                    column: tally.column.clone(),
                    terminal: tally.computation.terminal(),
                    item: item.to_owned(),
                    fault,
                })?;
        }
        Ok(())
    }

    /// Current status of every computation, in schema column order.
    pub fn report(&self) -> Vec<ColumnReport> {
        self.tallies
            .iter()
            .map(|t| ColumnReport {
                column: t.column.clone(),
                terminal: t.computation.terminal(),
                status: t.computation.status(),
            })
            .collect()
    }

    /// Computation for `column`, if one is configured.
    pub fn computation(&self, column: &str) -> Option<&Computation> {
        self.tallies
            .iter()
            .find(|t| t.column == column)
            .map(|t| &t.computation)
    }

    pub fn is_empty(&self) -> bool {
        self.tallies.is_empty()
    }
}
