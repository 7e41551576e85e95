//! Core domain types for company directories and generated copy.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Marker placed in `description_html` when a completion could not be parsed.
pub const PARSE_ERROR_MARKER: &str = "[Error parsing response]";

/// Column names read from the input directory.
pub mod fields {
    /// Company name; the directory's primary key.
    pub const LISTING_TITLE: &str = "listing_title";
    pub const WEBSITE: &str = "website";
    pub const EMPLOYEE_NUMBER: &str = "employee_number";
    pub const STATE: &str = "state";
    pub const CITY: &str = "city";
    pub const INDUSTRY: &str = "industry";
    pub const FOUNDED: &str = "founded";
    pub const SHORT_DESCRIPTION: &str = "short_description";
    /// Display-only ranking column.
    pub const RANK: &str = "Rank";
}

/// Header row of the generated descriptions file, in column order.
pub const OUTPUT_HEADERS: [&str; 10] = [
    "Company Name",
    "State",
    "City",
    "Employee Count",
    "Industry",
    "Website",
    "Founded",
    "Meta Title",
    "Meta Description",
    "Description (HTML)",
];

// ---------------------------------------------------------------------------
// CompanyRecord
// ---------------------------------------------------------------------------

/// One input row: header name to raw cell value, in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyRecord(IndexMap<String, String>);

impl CompanyRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `field`, or `""` when the row has no such column.
    pub fn get(&self, field: &str) -> &str {
        self.0.get(field).map(String::as_str).unwrap_or("")
    }

    /// Value of `field` only if the row actually carries that column.
    pub fn get_opt(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Set a field; a repeated header name overwrites the earlier value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn company_name(&self) -> &str {
        self.get(fields::LISTING_TITLE)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(field, value)` pairs in header order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CompanyRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// Company name to record, in first-seen order. Re-inserting an existing name
/// replaces its record but keeps its position.
pub type CompanyDirectory = IndexMap<String, CompanyRecord>;

// ---------------------------------------------------------------------------
// GeneratedContent
// ---------------------------------------------------------------------------

/// Marketing copy for one company, as returned by the completion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    /// SEO title, intended to stay within 60 characters.
    pub meta_title: String,
    /// SEO description, intended to stay within 160 characters.
    pub meta_description: String,
    /// Paragraphs, a highlights heading and a bulleted list.
    pub description_html: String,
}

impl GeneratedContent {
    /// Placeholder used whenever generation or parsing fails.
    pub fn sentinel() -> Self {
        Self {
            meta_title: String::new(),
            meta_description: String::new(),
            description_html: PARSE_ERROR_MARKER.to_string(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        *self == Self::sentinel()
    }
}

// ---------------------------------------------------------------------------
// OutputRow
// ---------------------------------------------------------------------------

/// One line of the descriptions file. Field order matches [`OUTPUT_HEADERS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRow {
    #[serde(rename = "Company Name")]
    pub company_name: String,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Employee Count")]
    pub employee_count: String,
    #[serde(rename = "Industry")]
    pub industry: String,
    #[serde(rename = "Website")]
    pub website: String,
    #[serde(rename = "Founded")]
    pub founded: String,
    #[serde(rename = "Meta Title")]
    pub meta_title: String,
    #[serde(rename = "Meta Description")]
    pub meta_description: String,
    #[serde(rename = "Description (HTML)")]
    pub description_html: String,
}

impl OutputRow {
    /// Flatten a record and its generated copy. `employee_count` is the
    /// already formatted display string.
    pub fn new(
        company_name: &str,
        record: &CompanyRecord,
        employee_count: String,
        content: GeneratedContent,
    ) -> Self {
        Self {
            company_name: company_name.to_string(),
            state: record.get(fields::STATE).to_string(),
            city: record.get(fields::CITY).to_string(),
            employee_count,
            industry: record.get(fields::INDUSTRY).to_string(),
            website: record.get(fields::WEBSITE).to_string(),
            founded: record.get(fields::FOUNDED).to_string(),
            meta_title: content.meta_title,
            meta_description: content.meta_description,
            description_html: content.description_html,
        }
    }

    /// Cell values in [`OUTPUT_HEADERS`] order.
    pub fn as_record(&self) -> [&str; 10] {
        [
            self.company_name.as_str(),
            self.state.as_str(),
            self.city.as_str(),
            self.employee_count.as_str(),
            self.industry.as_str(),
            self.website.as_str(),
            self.founded.as_str(),
            self.meta_title.as_str(),
            self.meta_description.as_str(),
            self.description_html.as_str(),
        ]
    }
}
