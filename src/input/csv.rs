//! CSV input reader.
//!
//! Reads a delimited file with a header row into fixed-size [`Batch`]es.
//! Only one batch is held in memory at a time.

use std::collections::HashSet;
use std::io::Read;

use crate::batch::Batch;
use crate::error::{Error, Result};
use crate::inference::{is_missing, typed_column, DEFAULT_NA_VALUES};

/// Number of rows per batch unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 100_000;

/// Options for [`CsvBatchReader`].
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Maximum rows per batch; the last batch may be smaller.
    pub batch_size: usize,
    /// Field delimiter byte.
    pub delimiter: u8,
    /// Cells equal to one of these are absent values.
    pub na_values: Vec<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            delimiter: b',',
            na_values: DEFAULT_NA_VALUES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// CSV reader that yields typed batches of rows.
pub struct CsvBatchReader<R: Read> {
    reader: csv::Reader<R>,
    headers: Vec<String>,
    options: CsvOptions,
    next_index: usize,
    finished: bool,
}

impl<R: Read> CsvBatchReader<R> {
    /// Create a new batch reader and read the header row.
    ///
    /// Fails if the batch size is zero or the header repeats a label.
    pub fn new(reader: R, options: CsvOptions) -> Result<Self> {
        if options.batch_size == 0 {
            return Err(Error::Configuration(
                "batch size must be at least 1".to_string(),
            ));
        }

        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(options.delimiter)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()
            .map_err(|e| Error::CsvParse(e.to_string()))?
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut seen = HashSet::with_capacity(headers.len());
        if let Some(duplicate) = headers.iter().find(|h| !seen.insert(h.as_str())) {
            return Err(Error::CsvParse(format!(
                "duplicate column label '{}' in header",
                duplicate
            )));
        }

        Ok(Self {
            reader: csv_reader,
            headers,
            options,
            next_index: 0,
            finished: false,
        })
    }

    /// Get the headers.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Read the next batch, or `None` once the input is exhausted.
    ///
    /// Short rows are padded with absent values and long rows are cut to
    /// the header width.
    pub fn read_batch(&mut self) -> Result<Option<Batch>> {
        if self.finished {
            return Ok(None);
        }

        let width = self.headers.len();
        let mut cells: Vec<Vec<Option<String>>> = (0..width)
            .map(|_| Vec::with_capacity(self.options.batch_size.min(DEFAULT_BATCH_SIZE)))
            .collect();
        let mut record = csv::StringRecord::new();
        let mut rows = 0;

        while rows < self.options.batch_size {
            match self.reader.read_record(&mut record) {
                Ok(true) => {
                    for (i, column) in cells.iter_mut().enumerate() {
                        let cell = record
                            .get(i)
                            .filter(|field| !is_missing(field, &self.options.na_values))
                            .map(str::to_string);
                        column.push(cell);
                    }
                    rows += 1;
                }
                Ok(false) => {
                    self.finished = true;
                    break;
                }
                Err(e) => {
                    self.finished = true;
                    // Physical line, so quoted newlines in earlier records count.
                    let line = e
                        .position()
                        .map_or_else(|| self.reader.position().line(), |p| p.line());
                    return Err(Error::Read {
                        batch: self.next_index,
                        message: format!("line {}: {}", line, e),
                    });
                }
            }
        }

        if rows == 0 {
            return Ok(None);
        }

        let columns = self
            .headers
            .iter()
            .zip(cells)
            .map(|(name, cells)| typed_column(name, cells))
            .collect();

        let batch = Batch::new(self.next_index, columns);
        self.next_index += 1;
        Ok(Some(batch))
    }
}

impl<R: Read> Iterator for CsvBatchReader<R> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_batch().transpose()
    }
}
