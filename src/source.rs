//! Row sources.
//!
//! A sensor reads from any iterator of `Result<Row>`. [`CsvSource`] is the
//! bundled implementation, reading delimited text from a file or a string.

use std::fmt;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use crate::config::{SensorParams, SourceLocation};
use crate::error::{Result, SensorError};

/// One raw row: the cell texts in column order.
pub type Row = Vec<String>;

/// A single-pass supplier of raw rows.
///
/// Implemented for every suitable iterator, so factories can return plain
/// iterators as well as [`CsvSource`].
pub trait RowSource: Iterator<Item = Result<Row>> + Send {}

impl<T> RowSource for T where T: Iterator<Item = Result<Row>> + Send {}

/// Delimited text reader yielding one [`Row`] per record.
///
/// Cells are trimmed, empty lines are skipped and rows may differ in length;
/// checking the row width is the sensor's job.
///
/// # Example
///
/// ```rust
/// use mokosh_sensor::source::CsvSource;
///
/// let rows: Vec<_> = CsvSource::from_text("a;b\n1; 2\n", b';')
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(rows, vec![vec!["a", "b"], vec!["1", "2"]]);
/// ```
pub struct CsvSource {
    records: csv::StringRecordsIntoIter<Box<dyn Read + Send>>,
}

impl fmt::Debug for CsvSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsvSource").finish_non_exhaustive()
    }
}

impl CsvSource {
    /// Reads records from any reader.
    pub fn from_reader<R: Read + Send + 'static>(reader: R, delimiter: u8) -> Self {
        let reader: Box<dyn Read + Send> = Box::new(reader);
        let records = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false) // The sensor interprets the header itself
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader)
            .into_records();
        Self { records }
    }

    /// Reads records from the file at `path`.
    pub fn from_path<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| SensorError::Source(format!("Failed to open {}: {e}", path.display())))?;
        Ok(Self::from_reader(file, delimiter))
    }

    /// Reads records from in-memory text.
    pub fn from_text(text: impl Into<String>, delimiter: u8) -> Self {
        Self::from_reader(Cursor::new(text.into().into_bytes()), delimiter)
    }

    /// Source factory for [`Sensor::builder`](crate::sensor::Sensor::builder).
    pub fn create(params: &SensorParams) -> Result<Self> {
        let delimiter = params.delimiter_byte()?;
        match &params.location {
            SourceLocation::Path(path) => Self::from_path(path, delimiter),
            SourceLocation::Inline(text) => Ok(Self::from_text(text.as_str(), delimiter)),
        }
    }
}

impl Iterator for CsvSource {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.next().map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect())
                .map_err(|e| SensorError::Source(e.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_header_and_rows() {
        let text = "timestamp, consumption\ndatetime,float\nT,\n\n7/2/10 0:00,21.2\n";
        let rows: Vec<Row> = CsvSource::from_text(text, b',')
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], vec!["timestamp", "consumption"]);
        assert_eq!(rows[2], vec!["T", ""]);
        assert_eq!(rows[3], vec!["7/2/10 0:00", "21.2"]);
    }

    #[test]
    fn test_create_from_params() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        std::fs::write(&path, "a|b\nint|bool\n|\n1|true\n").unwrap();

        let source = CsvSource::create(&SensorParams::path(&path).with_delimiter('|')).unwrap();
        let rows: Vec<Row> = source.collect::<Result<_>>().unwrap();
        assert_eq!(rows[3], vec!["1", "true"]);
    }

    #[test]
    fn test_missing_file() {
        let err = CsvSource::create(&SensorParams::path("/nonexistent/rows.csv")).unwrap_err();
        assert!(matches!(err, SensorError::Source(_)));
    }

    #[test]
    fn test_is_send() {
        fn assert_source<S: RowSource>(_: &S) {}
        assert_source(&CsvSource::from_text("", b','));
    }
}
