//! Unified record schema shared by both providers and the table writer.

use serde::Serialize;
use std::fmt;

/// Which provider produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Source {
    /// Google Books volumes API
    #[serde(rename = "GB")]
    Books,
    /// SerpAPI Google Scholar engine
    #[serde(rename = "GS")]
    Scholar,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Books => f.write_str("Google Books"),
            Source::Scholar => f.write_str("Google Scholar"),
        }
    }
}

/// One bibliographic entry projected onto the common table schema.
///
/// Every field except `source` is a plain string that stays empty when the
/// provider has nothing for it, so a row always has the full column set.
/// Field order is the table's column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnifiedRecord {
    #[serde(rename = "Source")]
    pub source: Source,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Snippet")]
    pub snippet: String,
    #[serde(rename = "Author Name")]
    pub author_name: String,
    #[serde(rename = "Publication Year")]
    pub publication_year: String,
    #[serde(rename = "Publisher")]
    pub publisher: String,
    #[serde(rename = "Publication Date")]
    pub publication_date: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "ISBN Identifiers")]
    pub isbn_identifiers: String,
    #[serde(rename = "Page Count")]
    pub page_count: String,
    #[serde(rename = "Categories")]
    pub categories: String,
    #[serde(rename = "Content Version")]
    pub content_version: String,
    #[serde(rename = "Image Links")]
    pub image_link: String,
    #[serde(rename = "Language")]
    pub language: String,
    #[serde(rename = "Resource Title")]
    pub resource_title: String,
    #[serde(rename = "Resource Link")]
    pub resource_link: String,
    #[serde(rename = "Cited By Link")]
    pub cited_by_link: String,
    #[serde(rename = "Versions Link")]
    pub versions_link: String,
}

/// Title column name, the identity key of a table
pub const TITLE_COLUMN: &str = "Title";

/// CSV header, in the same order as the fields of [`UnifiedRecord`]
pub const TABLE_COLUMNS: &[&str] = &[
    "Source",
    "Title",
    "Snippet",
    "Author Name",
    "Publication Year",
    "Publisher",
    "Publication Date",
    "Description",
    "ISBN Identifiers",
    "Page Count",
    "Categories",
    "Content Version",
    "Image Links",
    "Language",
    "Resource Title",
    "Resource Link",
    "Cited By Link",
    "Versions Link",
];

impl UnifiedRecord {
    /// Empty record for `source`; normalizers fill in what they find.
    pub fn new(source: Source) -> Self {
        Self {
            source,
            title: String::new(),
            snippet: String::new(),
            author_name: String::new(),
            publication_year: String::new(),
            publisher: String::new(),
            publication_date: String::new(),
            description: String::new(),
            isbn_identifiers: String::new(),
            page_count: String::new(),
            categories: String::new(),
            content_version: String::new(),
            image_link: String::new(),
            language: String::new(),
            resource_title: String::new(),
            resource_link: String::new(),
            cited_by_link: String::new(),
            versions_link: String::new(),
        }
    }
}
