//! Character-level record reader.
//!
//! The reader consumes its source one byte at a time, dropping carriage
//! returns and stopping at each newline, so a record never has to fit
//! anything larger than one line in memory. `\n`, `\r` and `\t` are ASCII,
//! so scanning bytes is safe for UTF-8 input; each completed line is then
//! decoded as a whole.

use std::io::{self, BufRead, BufReader, Read};

use crate::record::{RECORD_DELIMITER, Record};

const CARRIAGE_RETURN: u8 = b'\r';
const NEWLINE: u8 = RECORD_DELIMITER as u8;

/// Incremental tokenizer yielding one [`Record`] per source line.
pub struct RecordReader<R> {
    source: BufReader<R>,
    at_eof: bool,
    line: usize,
}

impl<R: Read> RecordReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source: BufReader::new(source),
            at_eof: false,
            line: 0,
        }
    }

    /// Read the next line and split it into items.
    ///
    /// Returns an empty record for a blank line and for the read that hits
    /// end-of-stream with nothing accumulated. Check [`Self::at_eof`] after
    /// each call to know whether the stream is exhausted.
    pub fn next_record(&mut self) -> io::Result<Record> {
        let mut buf = Vec::new();
        loop {
            match self.next_byte()? {
                None => {
                    self.at_eof = true;
                    break;
                }
                Some(NEWLINE) => break,
                Some(CARRIAGE_RETURN) => {}
                Some(byte) => buf.push(byte),
            }
        }
        if !buf.is_empty() || !self.at_eof {
            self.line += 1;
        }

        let line = String::from_utf8(buf).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line {} is not valid UTF-8: {e}", self.line),
            )
        })?;
        Ok(Record::from_line(&line))
    }

    /// True once end-of-stream has been observed.
    pub fn at_eof(&self) -> bool {
        self.at_eof
    }

    /// 1-based number of the line returned by the last [`Self::next_record`].
    pub fn line_number(&self) -> usize {
        self.line
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        if self.at_eof {
            return Ok(None);
        }
        let byte = match self.source.fill_buf()? {
            [] => None,
            [first, ..] => Some(*first),
        };
        if byte.is_some() {
            self.source.consume(1);
        }
        Ok(byte)
    }
}
