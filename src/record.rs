//! Tab-delimited records.

use std::fmt;

/// Item separator within a record.
pub const ITEM_DELIMITER: char = '\t';
/// Record separator within a stream.
pub const RECORD_DELIMITER: char = '\n';

/// One line of a TSV stream, split into its tab-delimited items.
///
/// A record with zero items stands for a blank line; the reader also
/// returns one when the stream is exhausted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    items: Vec<String>,
}

impl Record {
    /// Create a record from owned items.
    pub fn new(items: Vec<String>) -> Self {
        Self { items }
    }

    /// Split one line (without its terminator) into a record.
    ///
    /// An empty line yields zero items. Any other line, even one holding
    /// only tabs or spaces, yields at least one item.
    pub fn from_line(line: &str) -> Self {
        if line.is_empty() {
            return Self::default();
        }
        Self {
            items: line.split(ITEM_DELIMITER).map(str::to_owned).collect(),
        }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Item at `index`, if present.
    pub fn item(&self, index: usize) -> Option<&str> {
        self.items.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items joined by tabs, without a record terminator.
    pub fn to_line(&self) -> String {
        let mut delimiter = [0u8; 4];
        self.items.join(ITEM_DELIMITER.encode_utf8(&mut delimiter))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

impl<S: Into<String>> FromIterator<S> for Record {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}
