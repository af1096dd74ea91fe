//! "Match any of" record filtering.
//!
//! A [`FilterSpec`] maps column names to condition sets. A record passes when,
//! for every schema column that has a condition set, the record's item equals
//! at least one literal in that set.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{PipelineError, PipelineResult};
use crate::record::Record;
use crate::schema::Schema;

/// One condition value, as supplied to the builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Str(String),
    Long(i64),
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::Str(s.to_owned())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::Str(s)
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Literal::Long(v)
    }
}

impl From<i32> for Literal {
    fn from(v: i32) -> Self {
        Literal::Long(i64::from(v))
    }
}

/// Type-homogeneous set of literals a column must match one of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionSet {
    Strings(Vec<String>),
    Longs(Vec<i64>),
}

impl ConditionSet {
    /// Build a condition set, rejecting empty or mixed-type literal lists.
    pub fn from_literals(literals: Vec<Literal>) -> PipelineResult<Self> {
        let mut literals = literals.into_iter();
        let mut set = match literals.next() {
            None => {
                return Err(PipelineError::configuration(
                    "select_any needs at least one value",
                ));
            }
            Some(Literal::Str(s)) => ConditionSet::Strings(vec![s]),
            Some(Literal::Long(v)) => ConditionSet::Longs(vec![v]),
        };
        for literal in literals {
            match (&mut set, literal) {
                (ConditionSet::Strings(values), Literal::Str(s)) => values.push(s),
                (ConditionSet::Longs(values), Literal::Long(v)) => values.push(v),
                (set, literal) => {
                    return Err(mixed_types(set.kind(), &literal));
                }
            }
        }
        Ok(set)
    }

    /// Append another set of the same kind.
    pub fn extend(&mut self, other: ConditionSet) -> PipelineResult<()> {
        match (self, other) {
            (ConditionSet::Strings(values), ConditionSet::Strings(more)) => values.extend(more),
            (ConditionSet::Longs(values), ConditionSet::Longs(more)) => values.extend(more),
            (set, other) => {
                return Err(PipelineError::configuration(format!(
                    "cannot add {} values to a column already filtered by {} values",
                    other.kind(),
                    set.kind()
                )));
            }
        }
        Ok(())
    }

    /// Whether `item` string-equals one of the literals.
    pub fn matches(&self, item: &str) -> bool {
        match self {
            ConditionSet::Strings(values) => values.iter().any(|v| v == item),
            ConditionSet::Longs(values) => item
                .parse::<i64>()
                .is_ok_and(|n| values.contains(&n) && n.to_string() == item),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ConditionSet::Strings(values) => values.len(),
            ConditionSet::Longs(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn kind(&self) -> &'static str {
        match self {
            ConditionSet::Strings(_) => "string",
            ConditionSet::Longs(_) => "long",
        }
    }
}

impl fmt::Display for ConditionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = match self {
            ConditionSet::Strings(values) => values.iter().map(|v| format!("{v:?}")).collect(),
            ConditionSet::Longs(values) => values.iter().map(i64::to_string).collect(),
        };
        write!(f, "[{}]", rendered.join(", "))
    }
}

fn mixed_types(expected: &str, literal: &Literal) -> PipelineError {
    let found = match literal {
        Literal::Str(s) => format!("string {s:?}"),
        Literal::Long(v) => format!("long {v}"),
    };
    PipelineError::configuration(format!(
        "all values for one column must share a type: expected {expected} values, found {found}"
    ))
}

/// Column name → condition set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    conditions: BTreeMap<String, ConditionSet>,
}

impl FilterSpec {
    /// Add a condition set for `column`, merging with any existing one.
    pub fn add(&mut self, column: impl Into<String>, set: ConditionSet) -> PipelineResult<()> {
        let column = column.into();
        match self.conditions.get_mut(&column) {
            Some(existing) => existing.extend(set),
            None => {
                self.conditions.insert(column, set);
                Ok(())
            }
        }
    }

    /// Conditions configured for `column`, if any.
    pub fn conditions_for(&self, column: &str) -> Option<&ConditionSet> {
        self.conditions.get(column).filter(|set| !set.is_empty())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.conditions.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConditionSet)> {
        self.conditions.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A [`FilterSpec`] resolved against one schema.
#[derive(Debug)]
pub struct FilterEngine<'a> {
    checks: Vec<(usize, &'a ConditionSet)>,
}

impl<'a> FilterEngine<'a> {
    /// Resolve column names to positions.
    ///
    /// Conditions naming columns the schema lacks impose no constraint.
    pub fn new(schema: &Schema, spec: &'a FilterSpec) -> Self {
        for column in spec.columns() {
            if schema.index_of(column).is_none() {
                log::warn!("ignoring filter on column '{column}', which is not in the schema");
            }
        }
        let checks = schema
            .column_names()
            .enumerate()
            .filter_map(|(idx, name)| spec.conditions_for(name).map(|set| (idx, set)))
            .collect();
        Self { checks }
    }

    /// Whether `record` satisfies every applicable condition set.
    pub fn passes(&self, record: &Record) -> bool {
        self.checks
            .iter()
            .all(|(idx, set)| record.item(*idx).is_some_and(|item| set.matches(item)))
    }

    /// True when no condition applies, so every record passes.
    pub fn is_identity(&self) -> bool {
        self.checks.is_empty()
    }
}
