//! Flat-file rows keyed by 1-based line number.
//!
//! Only non-empty records are numbered; with `has_headers` the header row is
//! skipped and not counted. The reader stays open between windows so a run
//! reads the file once, front to back. A watermark that does not match the
//! open reader's position (a resumed run, or a different file) reopens the
//! file and fast-forwards.

use std::fs::File;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::debug;

use super::{BatchResult, BatchSource};
use crate::constants::{args, source_types, DEFAULT_PAGE_SIZE};
use crate::error::{BulkTaskError, Result, StoreError};
use crate::query::{IdRange, QueryArgs};
use crate::record::{CsvRow, Record};

const UNREADABLE: &str = "The CSV file does not exist or is not readable.";

#[derive(Debug, Clone, PartialEq, Eq)]
struct ReaderOptions {
    path: PathBuf,
    delimiter: u8,
    has_headers: bool,
}

impl ReaderOptions {
    fn from_args(query_args: &QueryArgs) -> Result<Self> {
        let path = query_args.get_str(args::CSV).unwrap_or_default();
        if path.is_empty() || !Path::new(path).is_file() {
            return Err(BulkTaskError::InvalidInput(UNREADABLE.to_string()));
        }

        let delimiter = match query_args.get_str(args::DELIMITER).map(str::as_bytes) {
            None | Some([]) => b',',
            Some([byte]) => *byte,
            Some(_) => {
                return Err(BulkTaskError::InvalidInput(
                    "CSV delimiter must be a single byte".to_string(),
                ))
            }
        };

        Ok(Self {
            path: PathBuf::from(path),
            delimiter,
            has_headers: query_args.get_bool(args::HAS_HEADERS).unwrap_or(false),
        })
    }

    fn open(&self) -> Result<csv::Reader<File>> {
        csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(self.has_headers)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|_| BulkTaskError::InvalidInput(UNREADABLE.to_string()))
    }
}

#[derive(Debug)]
struct OpenReader {
    options: ReaderOptions,
    reader: csv::Reader<File>,
    /// Line number of the last row read
    line: i64,
}

#[derive(Debug)]
pub struct CsvSource {
    default_page_size: i64,
    open: Mutex<Option<OpenReader>>,
}

impl Default for CsvSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvSource {
    pub fn new() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            open: Mutex::new(None),
        }
    }

    pub fn with_default_page_size(mut self, page_size: i64) -> Self {
        self.default_page_size = page_size;
        self
    }

    fn count_rows(options: &ReaderOptions) -> Result<i64> {
        let mut reader = options.open()?;
        let mut record = csv::StringRecord::new();
        let mut rows = 0;
        while reader.read_record(&mut record).map_err(csv_error)? {
            rows += 1;
        }
        Ok(rows)
    }

    fn read_window(&self, min_id: i64, stepping: i64, query_args: &QueryArgs) -> Result<BatchResult> {
        let options = ReaderOptions::from_args(query_args)?;
        let page_size = match self.page_size(query_args) {
            n if n > 0 => n.min(stepping),
            _ => stepping,
        };

        let mut open = self.open.lock();
        let positioned = matches!(
            open.as_ref(),
            Some(current) if current.options == options && current.line == min_id
        );
        if !positioned {
            debug!(path = %options.path.display(), min_id, "Opening CSV reader");
            let reader = options.open()?;
            *open = Some(OpenReader {
                options: options.clone(),
                reader,
                line: 0,
            });
        }
        let Some(current) = open.as_mut() else {
            return Err(BulkTaskError::Internal("CSV reader missing".to_string()));
        };

        let mut record = csv::StringRecord::new();
        while current.line < min_id {
            if !current.reader.read_record(&mut record).map_err(csv_error)? {
                break;
            }
            current.line += 1;
        }

        let mut records = Vec::new();
        if current.line == min_id {
            while (records.len() as i64) < page_size
                && current.reader.read_record(&mut record).map_err(csv_error)?
            {
                current.line += 1;
                records.push(Record::Row(CsvRow {
                    line_number: current.line,
                    fields: record.iter().map(str::to_string).collect(),
                }));
            }
        }

        Ok(BatchResult {
            records,
            token: None,
            range: IdRange::new(min_id, stepping),
            query_args: query_args.clone(),
        })
    }
}

/// I/O failures are the file going away mid-run; anything else (invalid
/// UTF-8, a malformed record) is a file that cannot be read as CSV
fn csv_error(e: csv::Error) -> BulkTaskError {
    if e.is_io_error() {
        return BulkTaskError::store_unavailable(source_types::CSV, StoreError::Csv(e));
    }
    BulkTaskError::InvalidInput(format!("{UNREADABLE} {e}"))
}

#[async_trait]
impl BatchSource for CsvSource {
    fn source_type(&self) -> &'static str {
        source_types::CSV
    }

    fn prepare_args(&self, query_args: QueryArgs) -> QueryArgs {
        query_args.with_defaults(&[
            (args::CSV, json!("")),
            (args::NUMBER, json!(self.default_page_size)),
            (args::DELIMITER, json!(",")),
            (args::HAS_HEADERS, Value::Bool(false)),
        ])
    }

    fn page_size(&self, query_args: &QueryArgs) -> i64 {
        query_args
            .get_i64(args::NUMBER)
            .unwrap_or(self.default_page_size)
    }

    /// Line number of the last row
    async fn max_bound(&self, query_args: &QueryArgs) -> Result<i64> {
        let options = ReaderOptions::from_args(query_args)?;
        Self::count_rows(&options)
    }

    async fn fetch_window(
        &self,
        min_id: i64,
        stepping: i64,
        query_args: &QueryArgs,
    ) -> Result<BatchResult> {
        self.read_window(min_id, stepping, query_args)
    }
}
