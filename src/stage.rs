//! Record-at-a-time stages.
//!
//! Each `RecordStage` takes one record and either passes it on or drops it.
//! A run chains type check → filter → aggregate → write, so a record only
//! reaches the aggregator and the destination after every earlier stage
//! has accepted it.

use std::io::Write;

use crate::aggregator::Aggregator;
use crate::error::PipelineResult;
use crate::filter::FilterEngine;
use crate::observer::PipelineObserver;
use crate::record::{RECORD_DELIMITER, Record};
use crate::schema::Schema;

/// A pipeline stage that processes records one at a time.
pub trait RecordStage {
    /// Process a single record read from source line `line`.
    ///
    /// `Ok(None)` drops the record; an error aborts the run.
    fn process(&mut self, line: usize, record: Record) -> PipelineResult<Option<Record>>;

    /// The display name of this stage.
    fn name(&self) -> &str;
}

/// Write one record and its terminator.
pub fn write_record<W: Write + ?Sized>(writer: &mut W, record: &Record) -> std::io::Result<()> {
    writer.write_all(record.to_line().as_bytes())?;
    let mut terminator = [0u8; 4];
    writer.write_all(RECORD_DELIMITER.encode_utf8(&mut terminator).as_bytes())
}

/// TYPECHECK - drops records that do not match the schema, notifying the observer.
pub struct TypeCheckStage<'a> {
    schema: &'a Schema,
    observer: &'a dyn PipelineObserver,
}

impl<'a> TypeCheckStage<'a> {
    pub fn new(schema: &'a Schema, observer: &'a dyn PipelineObserver) -> Self {
        Self { schema, observer }
    }
}

impl RecordStage for TypeCheckStage<'_> {
    fn process(&mut self, line: usize, record: Record) -> PipelineResult<Option<Record>> {
        match self.schema.check(&record) {
            Ok(()) => Ok(Some(record)),
            Err(reason) => {
                self.observer.on_malformed(line, &record, &reason);
                Ok(None)
            }
        }
    }

    fn name(&self) -> &str {
        "TYPECHECK"
    }
}

/// FILTER - keeps records satisfying every condition set.
impl RecordStage for FilterEngine<'_> {
    fn process(&mut self, _line: usize, record: Record) -> PipelineResult<Option<Record>> {
        Ok(self.passes(&record).then_some(record))
    }

    fn name(&self) -> &str {
        "FILTER"
    }
}

/// AGGREGATE - updates every configured computation, passing the record on.
impl RecordStage for Aggregator {
    fn process(&mut self, _line: usize, record: Record) -> PipelineResult<Option<Record>> {
        self.update(&record)?;
        Ok(Some(record))
    }

    fn name(&self) -> &str {
        "AGGREGATE"
    }
}

/// WRITE - appends each record to the destination.
pub struct WriteStage<W> {
    writer: W,
}

impl<W: Write> WriteStage<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordStage for WriteStage<W> {
    fn process(&mut self, _line: usize, record: Record) -> PipelineResult<Option<Record>> {
        write_record(&mut self.writer, &record)?;
        Ok(Some(record))
    }

    fn name(&self) -> &str {
        "WRITE"
    }
}
