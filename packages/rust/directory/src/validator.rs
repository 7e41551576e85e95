//! Website column validation.
//!
//! A website is considered well formed when it splits (RFC 3986 style) into a
//! scheme and a non-empty `//authority`. Values without a scheme get a second
//! chance with `http://` prepended, so a bare `example.com` passes. Host
//! characters and ports are not checked; only a bracketed IPv6 literal has
//! to be a real address.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use copydesk_shared::{CompanyRecord, CopydeskError, Result, fields};
use regex::Regex;
use tracing::{debug, info, instrument};
use url::Host;

use crate::{Table, has_column, read_table};

/// Scheme used when a value has none of its own.
const FALLBACK_SCHEME_PREFIX: &str = "http://";

/// RFC 3986 scheme prefix: `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ) ":"`.
static SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("valid regex"));

/// `scheme ":" "//" authority`, the authority running to the next `/`, `?` or `#`.
static AUTHORITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://([^/?#]*)").expect("valid regex")
});

/// Check whether `value` looks like a usable website URL.
///
/// Never fails: empty or whitespace-only input, values without an authority
/// (`mailto:`, `http:example.com`, `http://`) and malformed IPv6 literals are
/// all simply invalid.
pub fn is_valid_url(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }

    let candidate = if has_scheme(value) {
        value.to_string()
    } else {
        format!("{FALLBACK_SCHEME_PREFIX}{value}")
    };

    match authority(&candidate) {
        Some(authority) if !authority.is_empty() => valid_brackets(authority),
        _ => {
            debug!(value, "website has no network location");
            false
        }
    }
}

fn has_scheme(value: &str) -> bool {
    SCHEME_RE.is_match(value)
}

fn authority(value: &str) -> Option<&str> {
    AUTHORITY_RE
        .captures(value)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Brackets must pair up, and what they enclose must be an IPv6 address.
fn valid_brackets(authority: &str) -> bool {
    let open = authority.find('[');
    let close = authority.find(']');
    match (open, close) {
        (None, None) => true,
        (Some(open), Some(close)) if open < close => {
            let literal = &authority[open..=close];
            let ok = matches!(Host::parse(literal), Ok(Host::Ipv6(_)));
            if !ok {
                debug!(authority, "bad IPv6 literal");
            }
            ok
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// WebsiteValidator
// ---------------------------------------------------------------------------

/// A directory row annotated with the outcome of the website check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRow {
    pub record: CompanyRecord,
    pub is_valid_website: bool,
}

impl ValidationRow {
    pub fn website(&self) -> &str {
        self.record.get(fields::WEBSITE)
    }
}

/// Loads a directory CSV and reports the rows whose website is malformed.
#[derive(Debug)]
pub struct WebsiteValidator {
    csv_path: PathBuf,
    table: Option<Table>,
    rows: Vec<ValidationRow>,
}

impl WebsiteValidator {
    pub fn new(csv_path: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
            table: None,
            rows: Vec::new(),
        }
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    /// Load every row of the file, keyed or not.
    pub fn load_csv(&mut self) -> Result<()> {
        let table = read_table(&self.csv_path)?;
        info!(rows = table.rows.len(), "directory loaded for validation");
        self.table = Some(table);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.table.is_some()
    }

    /// Check the `website` column of every row and return the failing rows
    /// in file order. Loads the file first if [`load_csv`](Self::load_csv)
    /// has not been called.
    ///
    /// A row with no value in the column counts as invalid. A file without
    /// the column at all is a validation error.
    #[instrument(skip_all, fields(path = %self.csv_path.display()))]
    pub fn validate_websites(&mut self) -> Result<Vec<ValidationRow>> {
        if self.table.is_none() {
            self.load_csv()?;
        }
        let Some(table) = self.table.as_ref() else {
            return Ok(Vec::new());
        };

        if !has_column(table, fields::WEBSITE) {
            return Err(CopydeskError::validation(format!(
                "{}: no `{}` column",
                self.csv_path.display(),
                fields::WEBSITE
            )));
        }

        self.rows = table
            .rows
            .iter()
            .map(|record| ValidationRow {
                is_valid_website: is_valid_url(record.get(fields::WEBSITE)),
                record: record.clone(),
            })
            .collect();

        let invalid: Vec<ValidationRow> = self
            .rows
            .iter()
            .filter(|row| !row.is_valid_website)
            .cloned()
            .collect();

        info!(
            checked = self.rows.len(),
            invalid = invalid.len(),
            "website validation complete"
        );
        Ok(invalid)
    }

    /// Every row with its validity flag, after [`validate_websites`](Self::validate_websites).
    pub fn rows(&self) -> &[ValidationRow] {
        &self.rows
    }
}
