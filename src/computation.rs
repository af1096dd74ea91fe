//! Terminal computations: one-pass running aggregates over a single column.
//!
//! Each [`Computation`] variant carries only the state its [`Terminal`]
//! needs. Updating moves a computation forward; [`Computation::status`]
//! reads it without disturbing later updates.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{NumericFault, PipelineError};
use crate::schema::ColumnType;

/// Kind of terminal computation requested for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terminal {
    /// Whether every item so far has been the same.
    AllSame,
    /// Number of items.
    Count,
    /// Smallest item.
    Min,
    /// Largest item.
    Max,
    /// Sum of items; items must be longs.
    Sum,
    /// First record whose item differs from its predecessor's, and how often
    /// that rogue item recurs afterwards.
    FirstDiff,
    /// Count, mean and standard deviation; items must be longs.
    Stats,
}

impl Terminal {
    pub const ALL: [Terminal; 7] = [
        Terminal::AllSame,
        Terminal::Count,
        Terminal::Min,
        Terminal::Max,
        Terminal::Sum,
        Terminal::FirstDiff,
        Terminal::Stats,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Terminal::AllSame => "ALLSAME",
            Terminal::Count => "COUNT",
            Terminal::Min => "MIN",
            Terminal::Max => "MAX",
            Terminal::Sum => "SUM",
            Terminal::FirstDiff => "FIRSTDIFF",
            Terminal::Stats => "STATS",
        }
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Terminal {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Terminal::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                PipelineError::configuration(format!(
                    "unknown terminal computation '{s}' (expected one of: {})",
                    Terminal::ALL.map(Terminal::name).join(", ")
                ))
            })
    }
}

/// An item interpreted according to its column's declared type.
///
/// Within one column every value has the same variant, so the derived
/// ordering is numeric for longs and lexical for strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Value {
    Long(i64),
    Text(String),
}

impl Value {
    /// Interpret `item` as `column_type`, falling back to text when a long
    /// column's item does not parse (the type check normally prevents that).
    pub fn parse(item: &str, column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Long => item
                .parse()
                .map(Value::Long)
                .unwrap_or_else(|_| Value::Text(item.to_owned())),
            ColumnType::String => Value::Text(item.to_owned()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Long(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Count, mean and standard deviation read from a STATS computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSummary {
    pub count: u64,
    pub mean: f64,
    pub std_dev: f64,
}

/// Running state of one terminal computation.
#[derive(Debug, Clone, PartialEq)]
pub enum Computation {
    AllSame {
        all_same: bool,
        last: Option<Value>,
    },
    Count {
        count: u64,
    },
    Min {
        best: Option<Value>,
    },
    Max {
        best: Option<Value>,
    },
    Sum {
        total: i64,
    },
    FirstDiff {
        last: Option<Value>,
        rogue_record: Option<String>,
        recurrences: u64,
    },
    Stats {
        count: u64,
        sum: i128,
        sum_of_squares: f64,
    },
}

impl Computation {
    /// Fresh computation in its identity state.
    pub fn new(terminal: Terminal) -> Self {
        match terminal {
            Terminal::AllSame => Computation::AllSame {
                all_same: true,
                last: None,
            },
            Terminal::Count => Computation::Count { count: 0 },
            Terminal::Min => Computation::Min { best: None },
            Terminal::Max => Computation::Max { best: None },
            Terminal::Sum => Computation::Sum { total: 0 },
            Terminal::FirstDiff => Computation::FirstDiff {
                last: None,
                rogue_record: None,
                recurrences: 0,
            },
            Terminal::Stats => Computation::Stats {
                count: 0,
                sum: 0,
                sum_of_squares: 0.0,
            },
        }
    }

    pub fn terminal(&self) -> Terminal {
        match self {
            Computation::AllSame { .. } => Terminal::AllSame,
            Computation::Count { .. } => Terminal::Count,
            Computation::Min { .. } => Terminal::Min,
            Computation::Max { .. } => Terminal::Max,
            Computation::Sum { .. } => Terminal::Sum,
            Computation::FirstDiff { .. } => Terminal::FirstDiff,
            Computation::Stats { .. } => Terminal::Stats,
        }
    }

    /// Feed one accepted item.
    ///
    /// `record` is the full record text, kept by FIRSTDIFF when it finds the
    /// first divergence. On error the computation is left unchanged.
    pub fn update(
        &mut self,
        item: &str,
        column_type: ColumnType,
        record: &str,
    ) -> Result<(), NumericFault> {
        match self {
            Computation::AllSame { all_same, last } => {
                if *all_same {
                    let value = Value::parse(item, column_type);
                    if last.as_ref().is_some_and(|prev| *prev != value) {
                        *all_same = false;
                    } else {
                        *last = Some(value);
                    }
                }
            }
            Computation::Count { count } => *count += 1,
            Computation::Min { best } => {
                keep_best(best, Value::parse(item, column_type), Ordering::Less)
            }
            Computation::Max { best } => {
                keep_best(best, Value::parse(item, column_type), Ordering::Greater)
            }
            Computation::Sum { total } => {
                let v = parse_long(item)?;
                *total = total.checked_add(v).ok_or(NumericFault::Overflow)?;
            }
            Computation::FirstDiff {
                last,
                rogue_record,
                recurrences,
            } => {
                let value = Value::parse(item, column_type);
                if rogue_record.is_none() {
                    if last.as_ref().is_some_and(|prev| *prev != value) {
                        *rogue_record = Some(record.to_owned());
                    }
                    *last = Some(value);
                } else if last.as_ref() == Some(&value) {
                    *recurrences += 1;
                }
            }
            Computation::Stats {
                count,
                sum,
                sum_of_squares,
            } => {
                // Squares of large items overflow i128 within a few records.
                let v = parse_long(item)?;
                let x = v as f64;
                *count += 1;
                *sum += i128::from(v);
                *sum_of_squares += x * x;
            }
        }
        Ok(())
    }

    /// Mean and standard deviation so far; `None` for non-STATS computations
    /// and for a STATS computation that has seen no items.
    ///
    /// Uses the naive single-pass variance `E[x^2] - E[x]^2`, clamped at zero.
    pub fn stats_summary(&self) -> Option<StatsSummary> {
        match *self {
            Computation::Stats {
                count,
                sum,
                sum_of_squares,
            } if count > 0 => {
                let n = count as f64;
                let mean = sum as f64 / n;
                let variance = (sum_of_squares / n - mean * mean).max(0.0);
                Some(StatsSummary {
                    count,
                    mean,
                    std_dev: variance.sqrt(),
                })
            }
            _ => None,
        }
    }

    /// Human-readable state, meant to follow the column name in a report.
    pub fn status(&self) -> String {
        match self {
            Computation::AllSame { all_same: true, .. } => "is all the same".to_string(),
            Computation::AllSame { all_same: false, .. } => "is not all the same".to_string(),
            Computation::Count { count } => format!("has a count of {count}"),
            Computation::Min { best } => format!("has a min of {}", or_undefined(best)),
            Computation::Max { best } => format!("has a max of {}", or_undefined(best)),
            Computation::Sum { total } => format!("has a sum of {total}"),
            Computation::FirstDiff {
                last,
                rogue_record: Some(record),
                recurrences,
            } => format!(
                "has a rogue item of {} that appears {recurrences} times after first appearing in this record: {record}",
                or_undefined(last)
            ),
            Computation::FirstDiff { .. } => "has no rogue item".to_string(),
            Computation::Stats { .. } => match self.stats_summary() {
                Some(s) => format!(
                    "has a count of {}, an average of {:.6}, and a standard deviation of {:.6}",
                    s.count, s.mean, s.std_dev
                ),
                None => "has a count of 0, an average of undefined, and a standard deviation of undefined"
                    .to_string(),
            },
        }
    }
}

fn keep_best(best: &mut Option<Value>, candidate: Value, wanted: Ordering) {
    let replace = match best {
        Some(current) => candidate.cmp(current) == wanted,
        None => true,
    };
    if replace {
        *best = Some(candidate);
    }
}

fn parse_long(item: &str) -> Result<i64, NumericFault> {
    item.parse().map_err(|_| NumericFault::NotALong)
}

fn or_undefined(value: &Option<Value>) -> String {
    value
        .as_ref()
        .map_or_else(|| "undefined".to_string(), Value::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(terminal: Terminal, column_type: ColumnType, items: &[&str]) -> Computation {
        let mut c = Computation::new(terminal);
        for item in items {
            c.update(item, column_type, item).unwrap();
        }
        c
    }

    #[test]
    fn test_terminal_from_str() {
        assert_eq!("count".parse::<Terminal>().unwrap(), Terminal::Count);
        assert_eq!("FirstDiff".parse::<Terminal>().unwrap(), Terminal::FirstDiff);
        let err = "median".parse::<Terminal>().unwrap_err();
        assert!(err.to_string().contains("unknown terminal computation 'median'"));
    }

    #[test]
    fn test_count() {
        let c = run(Terminal::Count, ColumnType::String, &["a", "b", "a"]);
        assert_eq!(c.status(), "has a count of 3");
        assert_eq!(Computation::new(Terminal::Count).status(), "has a count of 0");
    }

    #[test]
    fn test_count_is_non_decreasing() {
        let mut c = Computation::new(Terminal::Count);
        let mut previous = 0;
        for item in ["x", "y", "z"] {
            c.update(item, ColumnType::String, item).unwrap();
            let Computation::Count { count } = &c else {
                panic!("not a count");
            };
            assert!(*count > previous);
            previous = *count;
        }
    }

    #[test]
    fn test_sum() {
        let c = run(Terminal::Sum, ColumnType::Long, &["18", "20", "-3"]);
        assert_eq!(c.status(), "has a sum of 35");
    }

    #[test]
    fn test_sum_rejects_non_long() {
        let mut c = Computation::new(Terminal::Sum);
        c.update("5", ColumnType::String, "5").unwrap();
        assert_eq!(
            c.update("Frank", ColumnType::String, "Frank"),
            Err(NumericFault::NotALong)
        );
        assert_eq!(c.status(), "has a sum of 5");
    }

    #[test]
    fn test_sum_overflow() {
        let mut c = Computation::new(Terminal::Sum);
        c.update("9223372036854775807", ColumnType::Long, "").unwrap();
        assert_eq!(
            c.update("1", ColumnType::Long, ""),
            Err(NumericFault::Overflow)
        );
    }

    #[test]
    fn test_min_max_numeric_for_long_columns() {
        let items = ["9", "10", "-2", "100"];
        assert_eq!(
            run(Terminal::Min, ColumnType::Long, &items).status(),
            "has a min of -2"
        );
        assert_eq!(
            run(Terminal::Max, ColumnType::Long, &items).status(),
            "has a max of 100"
        );
    }

    #[test]
    fn test_min_max_lexical_for_string_columns() {
        let items = ["9", "10", "Molly", "Frank"];
        assert_eq!(
            run(Terminal::Min, ColumnType::String, &items).status(),
            "has a min of 10"
        );
        assert_eq!(
            run(Terminal::Max, ColumnType::String, &items).status(),
            "has a max of Molly"
        );
    }

    #[test]
    fn test_min_max_ties_keep_earliest() {
        let c = run(Terminal::Min, ColumnType::Long, &["007", "7"]);
        assert_eq!(c, Computation::Min { best: Some(Value::Long(7)) });
        assert_eq!(c.status(), "has a min of 7");
    }

    #[test]
    fn test_min_max_undefined_when_empty() {
        assert_eq!(Computation::new(Terminal::Min).status(), "has a min of undefined");
        assert_eq!(Computation::new(Terminal::Max).status(), "has a max of undefined");
    }

    #[test]
    fn test_all_same() {
        assert_eq!(
            run(Terminal::AllSame, ColumnType::String, &["a", "a", "a"]).status(),
            "is all the same"
        );
        assert_eq!(
            run(Terminal::AllSame, ColumnType::String, &[]).status(),
            "is all the same"
        );
    }

    #[test]
    fn test_all_same_never_reverts() {
        let mut c = Computation::new(Terminal::AllSame);
        c.update("a", ColumnType::String, "").unwrap();
        c.update("b", ColumnType::String, "").unwrap();
        assert_eq!(c.status(), "is not all the same");
        c.update("a", ColumnType::String, "").unwrap();
        c.update("a", ColumnType::String, "").unwrap();
        assert_eq!(c.status(), "is not all the same");
    }

    #[test]
    fn test_first_diff() {
        let mut c = Computation::new(Terminal::FirstDiff);
        let rows = [
            ("10027", "Frank\t10027"),
            ("10027", "Molly\t10027"),
            ("10025", "Ann\t10025"),
            ("10027", "Bob\t10027"),
            ("10025", "Cal\t10025"),
            ("10025", "Dee\t10025"),
        ];
        for (item, record) in rows {
            c.update(item, ColumnType::Long, record).unwrap();
        }
        assert_eq!(
            c.status(),
            "has a rogue item of 10025 that appears 2 times after first appearing in this record: Ann\t10025"
        );
    }

    #[test]
    fn test_first_diff_without_divergence() {
        let c = run(Terminal::FirstDiff, ColumnType::String, &["x", "x"]);
        assert_eq!(c.status(), "has no rogue item");
    }

    #[test]
    fn test_stats_naive_variance() {
        let c = run(
            Terminal::Stats,
            ColumnType::Long,
            &["2", "4", "4", "4", "5", "5", "7", "9"],
        );
        let s = c.stats_summary().unwrap();
        assert_eq!(s.count, 8);
        assert!((s.mean - 5.0).abs() < 1e-12);
        assert!((s.std_dev - 2.0).abs() < 1e-12);
        assert_eq!(
            c.status(),
            "has a count of 8, an average of 5.000000, and a standard deviation of 2.000000"
        );
    }

    #[test]
    fn test_stats_accepts_extreme_longs() {
        let max = i64::MAX.to_string();
        let min = i64::MIN.to_string();
        let c = run(Terminal::Stats, ColumnType::Long, &[max.as_str(), max.as_str(), max.as_str()]);
        let s = c.stats_summary().unwrap();
        assert_eq!(s.count, 3);
        assert_eq!(s.mean, i64::MAX as f64);
        assert!(s.std_dev.is_finite());
        assert!(
            c.status()
                .starts_with("has a count of 3, an average of 9223372036854775808.000000,")
        );

        let c = run(Terminal::Stats, ColumnType::Long, &[min.as_str(), max.as_str()]);
        assert_eq!(c.stats_summary().map(|s| s.count), Some(2));
    }

    #[test]
    fn test_stats_empty() {
        let c = Computation::new(Terminal::Stats);
        assert_eq!(c.stats_summary(), None);
        assert!(c.status().starts_with("has a count of 0, an average of undefined"));
    }

    #[test]
    fn test_stats_rejects_non_long() {
        let mut c = Computation::new(Terminal::Stats);
        assert_eq!(
            c.update("abc", ColumnType::String, ""),
            Err(NumericFault::NotALong)
        );
        assert_eq!(c.stats_summary(), None);
    }

    #[test]
    fn test_status_is_non_destructive() {
        let mut c = Computation::new(Terminal::Sum);
        c.update("1", ColumnType::Long, "").unwrap();
        assert_eq!(c.status(), "has a sum of 1");
        assert_eq!(c.status(), "has a sum of 1");
        c.update("2", ColumnType::Long, "").unwrap();
        assert_eq!(c.status(), "has a sum of 3");
    }

    #[test]
    fn test_terminal_round_trip() {
        for t in Terminal::ALL {
            assert_eq!(Computation::new(t).terminal(), t);
        }
    }
}
