//! Diagnostic sink for skipped records and aggregation reports.
//!
//! Nothing reported here is written to the destination TSV.

use std::fmt;
use std::sync::Arc;

use crate::aggregator::ColumnReport;
use crate::error::MalformedRecord;
use crate::record::Record;

/// Receives out-of-band notices from a pipeline run.
pub trait PipelineObserver: Send + Sync {
    /// Called once per skipped data record. `line` is 1-based.
    fn on_malformed(&self, _line: usize, _record: &Record, _reason: &MalformedRecord) {}

    /// Called once per configured computation after the streams are closed.
    fn on_report(&self, _report: &ColumnReport) {}
}

/// Forwards notices to the `log` facade.
#[derive(Debug, Default)]
pub struct LogObserver;

impl PipelineObserver for LogObserver {
    fn on_malformed(&self, line: usize, record: &Record, reason: &MalformedRecord) {
        log::warn!(
            "skipping line {line}: {reason}: {}",
            record.to_line().replace('\t', "\\t")
        );
    }

    fn on_report(&self, report: &ColumnReport) {
        log::info!("{report}");
    }
}

/// Fans notices out to several observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn PipelineObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl PipelineObserver for CompositeObserver {
    fn on_malformed(&self, line: usize, record: &Record, reason: &MalformedRecord) {
        for o in &self.observers {
            o.on_malformed(line, record, reason);
        }
    }

    fn on_report(&self, report: &ColumnReport) {
        for o in &self.observers {
            o.on_report(report);
        }
    }
}
