//! Company directory ingestion.
//!
//! Reads a CSV export of a company directory (one row per company, header row
//! first) into a [`CompanyDirectory`] keyed by `listing_title`, and checks the
//! `website` column for well-formed URLs (see [`validator`]).

pub mod validator;

use std::fs::File;
use std::path::{Path, PathBuf};

use copydesk_shared::{CompanyDirectory, CompanyRecord, CopydeskError, Result, fields};
use tracing::{debug, info, instrument};

pub use validator::{ValidationRow, WebsiteValidator, is_valid_url};

// ---------------------------------------------------------------------------
// CompanyLoader
// ---------------------------------------------------------------------------

/// Loads a directory CSV into a map of company name to row.
#[derive(Debug, Clone)]
pub struct CompanyLoader {
    csv_path: PathBuf,
    data_by_company: CompanyDirectory,
}

impl CompanyLoader {
    pub fn new(csv_path: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
            data_by_company: CompanyDirectory::new(),
        }
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    /// Read the file and populate the directory.
    ///
    /// Rows without a `listing_title` (or with an empty one) are skipped. A
    /// name seen twice keeps the later row. Values are stored exactly as read.
    #[instrument(skip_all, fields(path = %self.csv_path.display()))]
    pub fn load_data(&mut self) -> Result<()> {
        let table = read_table(&self.csv_path)?;
        info!(path = %self.csv_path.display(), "reading company directory");
        info!(columns = ?table.headers, "directory columns");

        let mut skipped = 0usize;
        for record in table.rows {
            let name = record.company_name();
            if name.is_empty() {
                skipped += 1;
                continue;
            }
            let name = name.to_string();
            self.data_by_company.insert(name, record);
        }

        debug!(
            companies = self.data_by_company.len(),
            skipped, "directory loaded"
        );
        Ok(())
    }

    /// Companies loaded so far, in first-seen order.
    pub fn data_by_company(&self) -> &CompanyDirectory {
        &self.data_by_company
    }

    pub fn into_directory(self) -> CompanyDirectory {
        self.data_by_company
    }
}

/// Load `path` and return its company directory.
pub fn load_companies(path: impl Into<PathBuf>) -> Result<CompanyDirectory> {
    let mut loader = CompanyLoader::new(path);
    loader.load_data()?;
    Ok(loader.into_directory())
}

// ---------------------------------------------------------------------------
// Raw table reading
// ---------------------------------------------------------------------------

/// A CSV file as header names plus one record per data row.
#[derive(Debug)]
pub(crate) struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<CompanyRecord>,
}

/// Parse a header-first CSV file without touching cell values.
///
/// Short rows are accepted and simply lack their trailing columns; cells past
/// the last header are dropped.
pub(crate) fn read_table(path: &Path) -> Result<Table> {
    let file = File::open(path).map_err(|e| CopydeskError::io(path, e))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| csv_error(path, "failed to read header row", e))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result
            .map_err(|e| csv_error(path, &format!("failed to parse row {}", index + 1), e))?;

        let row: CompanyRecord = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.as_str(), v))
            .collect();
        rows.push(row);
    }

    Ok(Table { headers, rows })
}

fn csv_error(path: &Path, context: &str, e: csv::Error) -> CopydeskError {
    if e.is_io_error() {
        CopydeskError::io(path, e.into())
    } else {
        CopydeskError::parse(format!("{}: {context}: {e}", path.display()))
    }
}

/// Whether the table declares a column named `field`.
pub(crate) fn has_column(table: &Table, field: &str) -> bool {
    table.headers.iter().any(|h| h == field)
}
