//! Record-at-a-time (RAT) executor.
//!
//! Reads one record, pushes it through the entire stage chain, and only then
//! reads the next. Aggregations carry order-sensitive state, so records are
//! never reordered or batched.

use std::io::Read;

use crate::error::PipelineResult;
use crate::reader::RecordReader;
use crate::record::Record;
use crate::stage::RecordStage;

/// Records seen entering and leaving one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageStats {
    pub name: String,
    pub input: usize,
    pub output: usize,
}

impl StageStats {
    /// Records the stage dropped.
    pub fn dropped(&self) -> usize {
        self.input - self.output
    }
}

/// Counters for one pass over the data records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Execution {
    /// Data records read, blank lines excluded.
    pub records_read: usize,
    /// Blank lines skipped before reaching any stage.
    pub blank_lines: usize,
    pub stages: Vec<StageStats>,
}

/// Push one record through the stages in order, stopping at the first
/// stage that drops it.
fn push_through_stages(
    line: usize,
    record: Record,
    stages: &mut [&mut dyn RecordStage],
    stats: &mut [StageStats],
) -> PipelineResult<()> {
    let mut current = record;
    for (stage, stat) in stages.iter_mut().zip(stats.iter_mut()) {
        stat.input += 1;
        match stage.process(line, current)? {
            Some(next) => {
                stat.output += 1;
                current = next;
            }
            None => return Ok(()),
        }
    }
    Ok(())
}

/// Drain `reader` through `stages` until end-of-stream.
///
/// Blank records never reach a stage. The first stage error stops the run.
pub fn execute_rat<R: Read>(
    reader: &mut RecordReader<R>,
    stages: &mut [&mut dyn RecordStage],
) -> PipelineResult<Execution> {
    let mut execution = Execution {
        stages: stages
            .iter()
            .map(|s| StageStats {
                name: s.name().to_string(),
                input: 0,
                output: 0,
            })
            .collect(),
        ..Default::default()
    };

    while !reader.at_eof() {
        let record = reader.next_record()?;
        if record.is_empty() {
            if !reader.at_eof() {
                execution.blank_lines += 1;
            }
            continue;
        }
        execution.records_read += 1;
        push_through_stages(
            reader.line_number(),
            record,
            stages,
            &mut execution.stages,
        )?;
    }

    Ok(execution)
}
