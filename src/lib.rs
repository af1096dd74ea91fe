//! # tsv-pipelines
//!
//! Single-pass copying of typed TSV files with filtering and aggregation.
//!
//! A source file starts with two header records: column names, then column
//! types (`string` or `long`). Every data record after that is streamed once,
//! in order, to a destination file.
//!
//! ## Overview
//!
//! Each data record goes through a fixed chain of stages:
//! - **TYPECHECK**: records of the wrong length, or with a non-integer in a
//!   `long` column, are skipped and reported to a [`PipelineObserver`]
//! - **FILTER**: records must hold one of the selected values in every
//!   filtered column
//! - **AGGREGATE**: per-column computations (COUNT, SUM, MIN, MAX, ALLSAME,
//!   FIRSTDIFF, STATS) see every surviving record
//! - **WRITE**: surviving records are appended to the destination
//!
//! The header is always copied verbatim. If anything goes wrong the
//! destination file is removed.
//!
//! ## Example
//!
//! ```
//! use tsv_pipelines::{PipelineConfig, Terminal, TsvPipeline};
//! # let dir = tempfile::TempDir::new().unwrap();
//! # let origin = dir.path().join("people.tsv");
//! # std::fs::write(&origin, "Name\tAge\nstring\tlong\nFrank\t18\nMolly\t20\n").unwrap();
//!
//! let config = PipelineConfig::builder(&origin)?
//!     .select_any("Age", [18])?
//!     .compute("Name", Terminal::Count)
//!     .done();
//!
//! let mut out = Vec::new();
//! let source = std::fs::File::open(&origin)?;
//! let summary = TsvPipeline::new(config).process(source, &mut out)?;
//!
//! assert_eq!(out, b"Name\tAge\nstring\tlong\nFrank\t18\n");
//! assert_eq!(summary.reports[0].to_string(), "Name has a count of 1");
//! # Ok::<(), tsv_pipelines::PipelineError>(())
//! ```

pub mod aggregator;
pub mod computation;
pub mod config;
pub mod dsl;
pub mod error;
pub mod executor;
pub mod filter;
pub mod observer;
pub mod pipeline;
pub mod reader;
pub mod record;
pub mod schema;
pub mod stage;

pub use aggregator::{AggregationSpec, Aggregator, ColumnReport};
pub use computation::{Computation, StatsSummary, Terminal, Value};
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use dsl::{Command, Located, apply_commands, configure, parse_commands};
pub use error::{MalformedRecord, NumericFault, PipelineError, PipelineResult};
pub use executor::{Execution, StageStats, execute_rat};
pub use filter::{ConditionSet, FilterEngine, FilterSpec, Literal};
pub use observer::{CompositeObserver, LogObserver, PipelineObserver};
pub use pipeline::{RunSummary, TsvPipeline, copy};
pub use reader::RecordReader;
pub use record::{ITEM_DELIMITER, RECORD_DELIMITER, Record};
pub use schema::{Column, ColumnType, Schema};
pub use stage::{RecordStage, TypeCheckStage, WriteStage, write_record};
