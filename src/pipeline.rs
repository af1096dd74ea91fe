//! Single-pass TSV copy with type checking, filtering and aggregation.
//!
//! A run moves through `Init → HeaderRead → Streaming → Done`, or to `Failed`
//! from any of them. All per-run state (reader position, schema,
//! computations) lives in the run itself, so one [`TsvPipeline`] can be run
//! any number of times and every run starts from scratch.
//!
//! ```no_run
//! use tsv_pipelines::{PipelineConfig, Terminal, TsvPipeline};
//!
//! # fn main() -> Result<(), tsv_pipelines::PipelineError> {
//! let config = PipelineConfig::builder("people.tsv")?
//!     .select_any("Age", [18, 20])?
//!     .compute("Name", Terminal::Count)
//!     .done();
//! let summary = TsvPipeline::new(config).copy_to("teens.tsv")?;
//! for report in &summary.reports {
//!     println!("{report}");
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

use crate::aggregator::{Aggregator, ColumnReport};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::executor::{StageStats, execute_rat};
use crate::filter::FilterEngine;
use crate::observer::{LogObserver, PipelineObserver};
use crate::reader::RecordReader;
use crate::schema::Schema;
use crate::stage::{TypeCheckStage, WriteStage, write_record};

/// What one completed run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Data records read (header and blank lines excluded).
    pub records_read: usize,
    /// Records skipped for not matching the schema.
    pub malformed: usize,
    /// Well-formed records rejected by the filter.
    pub filtered_out: usize,
    /// Records written after the header.
    pub written: usize,
    /// Per-stage counters, in chain order.
    pub stages: Vec<StageStats>,
    /// Final status of every configured computation, in column order.
    pub reports: Vec<ColumnReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Init,
    HeaderRead,
    Streaming,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Init => "INIT",
            RunState::HeaderRead => "HEADER_READ",
            RunState::Streaming => "STREAMING",
            RunState::Done => "DONE",
            RunState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

struct RunContext {
    state: RunState,
}

impl RunContext {
    fn new() -> Self {
        Self {
            state: RunState::Init,
        }
    }

    fn enter(&mut self, next: RunState) {
        log::debug!("{} -> {}", self.state, next);
        self.state = next;
    }

    /// Record a failure, passing the error through.
    fn fail(&mut self, err: PipelineError) -> PipelineError {
        log::debug!("{} -> {}: {err}", self.state, RunState::Failed);
        self.state = RunState::Failed;
        err
    }
}

/// Removes the destination file when dropped, unless the run completed.
struct DestinationGuard<'a> {
    path: &'a Path,
    keep: bool,
}

impl<'a> DestinationGuard<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, keep: false }
    }

    fn keep(mut self) {
        self.keep = true;
    }
}

impl Drop for DestinationGuard<'_> {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match fs::remove_file(self.path) {
            Ok(()) => log::debug!("removed partial destination {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!(
                "could not remove partial destination {}: {e}",
                self.path.display()
            ),
        }
    }
}

const TYPECHECK: usize = 0;
const FILTER: usize = 1;
const WRITE: usize = 3;

/// Copies one TSV file to a destination, one record at a time.
#[derive(Clone)]
pub struct TsvPipeline {
    config: PipelineConfig,
    observer: Arc<dyn PipelineObserver>,
}

impl fmt::Debug for TsvPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TsvPipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TsvPipeline {
    /// Pipeline reporting through [`LogObserver`].
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            observer: Arc::new(LogObserver),
        }
    }

    /// Send malformed-record notices and reports to `observer` instead.
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Copy the configured origin to `destination`.
    ///
    /// On success the destination holds the header and every passing record,
    /// and the reports have been sent to the observer. On any error the
    /// destination is removed.
    pub fn copy_to(&self, destination: impl AsRef<Path>) -> PipelineResult<RunSummary> {
        let destination = destination.as_ref();
        self.reject_self_copy(destination)?;
        let mut ctx = RunContext::new();

        let source = File::open(self.config.origin()).map_err(|e| {
            ctx.fail(match e.kind() {
                io::ErrorKind::NotFound => PipelineError::SourceNotFound {
                    path: self.config.origin().to_path_buf(),
                },
                _ => PipelineError::Io(e),
            })
        })?;
        let file = File::create(destination).map_err(|e| ctx.fail(e.into()))?;
        let guard = DestinationGuard::new(destination);

        let summary = {
            let mut writer = BufWriter::new(file);
            let summary = self.stream(&mut ctx, source, &mut writer)?;
            writer
                .into_inner()
                .map_err(|e| ctx.fail(e.into_error().into()))?
                .sync_all()
                .map_err(|e| ctx.fail(e.into()))?;
            summary
        };
        guard.keep();

        self.emit(&summary);
        Ok(summary)
    }

    /// Copy to `filename` inside `directory`.
    pub fn copy_to_dir(
        &self,
        directory: impl AsRef<Path>,
        filename: impl AsRef<Path>,
    ) -> PipelineResult<RunSummary> {
        self.copy_to(directory.as_ref().join(filename))
    }

    /// Run over arbitrary streams instead of the configured origin file.
    ///
    /// Nothing is removed on failure; the caller owns `destination`.
    pub fn process<R: Read, W: Write>(
        &self,
        source: R,
        mut destination: W,
    ) -> PipelineResult<RunSummary> {
        let mut ctx = RunContext::new();
        let summary = self.stream(&mut ctx, source, &mut destination)?;
        destination.flush().map_err(|e| ctx.fail(e.into()))?;
        drop(destination);
        self.emit(&summary);
        Ok(summary)
    }

    fn stream<R: Read, W: Write>(
        &self,
        ctx: &mut RunContext,
        source: R,
        writer: &mut W,
    ) -> PipelineResult<RunSummary> {
        let mut reader = RecordReader::new(source);

        ctx.enter(RunState::HeaderRead);
        let names = reader.next_record().map_err(|e| ctx.fail(e.into()))?;
        let types = reader.next_record().map_err(|e| ctx.fail(e.into()))?;
        let schema = Schema::from_header(&names, &types).map_err(|e| ctx.fail(e))?;
        write_record(writer, &names)
            .and_then(|()| write_record(writer, &types))
            .map_err(|e| ctx.fail(e.into()))?;

        ctx.enter(RunState::Streaming);
        let mut type_check = TypeCheckStage::new(&schema, self.observer.as_ref());
        let mut filter = FilterEngine::new(&schema, self.config.filter());
        let mut aggregator = Aggregator::new(&schema, self.config.aggregations());
        let mut write = WriteStage::new(&mut *writer);
        let execution = execute_rat(
            &mut reader,
            &mut [&mut type_check, &mut filter, &mut aggregator, &mut write],
        )
        .map_err(|e| ctx.fail(e))?;

        ctx.enter(RunState::Done);
        let stages = execution.stages;
        Ok(RunSummary {
            records_read: execution.records_read,
            malformed: stages[TYPECHECK].dropped(),
            filtered_out: stages[FILTER].dropped(),
            written: stages[WRITE].output,
            reports: aggregator.report(),
            stages,
        })
    }

    fn emit(&self, summary: &RunSummary) {
        for report in &summary.reports {
            self.observer.on_report(report);
        }
    }

    fn reject_self_copy(&self, destination: &Path) -> PipelineResult<()> {
        let same = match (
            fs::canonicalize(self.config.origin()),
            fs::canonicalize(destination),
        ) {
            (Ok(origin), Ok(dest)) => origin == dest,
            _ => false,
        };
        if same {
            return Err(PipelineError::configuration(format!(
                "destination {} is the origin file",
                destination.display()
            )));
        }
        Ok(())
    }
}

/// Copy `origin` to `destination` unchanged apart from dropping malformed
/// records and normalizing line endings.
pub fn copy(origin: impl AsRef<Path>, destination: impl AsRef<Path>) -> PipelineResult<RunSummary> {
    TsvPipeline::new(PipelineConfig::builder(origin)?.done()).copy_to(destination)
}
