//! Google Books API client.
//!
//! Issues one volumes search per call and projects each volume onto
//! [`UnifiedRecord`]. Failures are logged and yield an empty result set so the
//! other provider and the merge still run.

use crate::error::{BibmergeError, Result};
use crate::record::{Source, UnifiedRecord};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Google Books volumes endpoint
pub const BOOKS_API_URL: &str = "https://www.googleapis.com/books/v1/volumes";

/// Top-level volumes search response. A missing `items` means no results.
#[derive(Debug, Default, Deserialize)]
pub struct VolumesResponse {
    pub items: Option<Vec<Volume>>,
}

/// A single volume entry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub volume_info: Option<VolumeInfo>,
}

/// Descriptive metadata nested under `volumeInfo`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInfo {
    pub title: Option<String>,
    pub authors: Option<Vec<String>>,
    pub publisher: Option<String>,
    pub published_date: Option<String>,
    pub description: Option<String>,
    pub industry_identifiers: Option<Vec<IndustryIdentifier>>,
    pub page_count: Option<u64>,
    pub categories: Option<Vec<String>>,
    pub content_version: Option<String>,
    pub image_links: Option<ImageLinks>,
    pub language: Option<String>,
}

/// ISBN or other identifier, e.g. `{"type": "ISBN_13", "identifier": "..."}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndustryIdentifier {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub identifier: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageLinks {
    pub thumbnail: Option<String>,
}

/// Project one Google Books volume onto the unified schema.
pub fn normalize_volume(volume: Volume) -> UnifiedRecord {
    let info = volume.volume_info.unwrap_or_default();

    let published_date = info.published_date.unwrap_or_default();
    // Verbatim prefix; "19xx" or a short date string are kept as-is
    let publication_year: String = published_date.chars().take(4).collect();

    let isbn_identifiers = info
        .industry_identifiers
        .unwrap_or_default()
        .iter()
        .map(|id| format!("{}: {}", id.kind, id.identifier))
        .collect::<Vec<_>>()
        .join(", ");

    let description = info.description.unwrap_or_default();

    UnifiedRecord {
        title: info.title.unwrap_or_default(),
        snippet: description.clone(),
        author_name: info.authors.unwrap_or_default().join(", "),
        publication_year,
        publisher: info.publisher.unwrap_or_default(),
        publication_date: published_date,
        description,
        isbn_identifiers,
        page_count: info.page_count.map(|n| n.to_string()).unwrap_or_default(),
        categories: info.categories.unwrap_or_default().join(", "),
        content_version: info.content_version.unwrap_or_default(),
        image_link: info
            .image_links
            .and_then(|links| links.thumbnail)
            .unwrap_or_default(),
        language: info.language.unwrap_or_default(),
        ..UnifiedRecord::new(Source::Books)
    }
}

/// Google Books client. Holds no per-query state.
#[derive(Debug, Clone)]
pub struct BooksClient {
    client: Client,
    base_url: String,
}

impl BooksClient {
    /// Create a client against the public Google Books endpoint
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, BOOKS_API_URL)
    }

    /// Create a client against a custom endpoint (mirrors, mock servers)
    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Search volumes and return every item as a unified record.
    ///
    /// `max_results == 0` leaves the page size to the provider. Any failure
    /// is logged and reported as zero results.
    pub async fn fetch(
        &self,
        api_key: &str,
        query: &str,
        max_results: u32,
    ) -> Vec<UnifiedRecord> {
        match self.do_fetch(api_key, query, max_results).await {
            Ok(records) => {
                info!(count = records.len(), "Google Books fetch complete");
                records
            }
            Err(e) => {
                warn!(error = %e, "Error fetching data from Google Books");
                Vec::new()
            }
        }
    }

    async fn do_fetch(
        &self,
        api_key: &str,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<UnifiedRecord>> {
        let mut request = self
            .client
            .get(&self.base_url)
            .query(&[("q", query), ("key", api_key)]);
        if max_results > 0 {
            request = request.query(&[("maxResults", max_results)]);
        }

        debug!(query = query, max_results = max_results, "Querying Google Books");
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(BibmergeError::Api {
                code: status.as_u16(),
                message: format!("Google Books: {}", error_text),
            });
        }

        let body = response.text().await?;
        let data: VolumesResponse = serde_json::from_str(&body).map_err(|e| {
            BibmergeError::Parse(format!("Failed to parse Google Books response: {}", e))
        })?;

        let Some(items) = data.items else {
            info!("No results found on Google Books");
            return Ok(Vec::new());
        };

        Ok(items.into_iter().map(normalize_volume).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume_from(json: serde_json::Value) -> Volume {
        serde_json::from_value(json).expect("valid volume json")
    }

    #[test]
    fn test_normalize_full_volume() {
        let volume = volume_from(serde_json::json!({
            "volumeInfo": {
                "title": "Campbell Biology",
                "authors": ["Lisa A. Urry", "Michael L. Cain"],
                "publisher": "Pearson",
                "publishedDate": "2016-10-06",
                "description": "The best-selling biology textbook.",
                "industryIdentifiers": [
                    {"type": "ISBN_10", "identifier": "123"},
                    {"type": "ISBN_13", "identifier": "456"}
                ],
                "pageCount": 1488,
                "categories": ["Science", "Biology"],
                "contentVersion": "1.2.3.0.preview.1",
                "imageLinks": {"smallThumbnail": "http://s", "thumbnail": "http://t"},
                "language": "en"
            }
        }));

        let record = normalize_volume(volume);
        assert_eq!(record.source, Source::Books);
        assert_eq!(record.title, "Campbell Biology");
        assert_eq!(record.author_name, "Lisa A. Urry, Michael L. Cain");
        assert_eq!(record.publication_year, "2016");
        assert_eq!(record.publication_date, "2016-10-06");
        assert_eq!(record.isbn_identifiers, "ISBN_10: 123, ISBN_13: 456");
        assert_eq!(record.page_count, "1488");
        assert_eq!(record.categories, "Science, Biology");
        assert_eq!(record.image_link, "http://t");
        assert_eq!(record.snippet, record.description);
        assert_eq!(record.language, "en");
        assert!(record.resource_link.is_empty());
        assert!(record.cited_by_link.is_empty());
    }

    #[test]
    fn test_normalize_empty_volume() {
        let record = normalize_volume(volume_from(serde_json::json!({})));
        assert_eq!(record, UnifiedRecord::new(Source::Books));

        let record = normalize_volume(volume_from(serde_json::json!({"volumeInfo": {}})));
        assert_eq!(record, UnifiedRecord::new(Source::Books));
    }

    #[test]
    fn test_publication_year_is_verbatim_prefix() {
        let record = normalize_volume(volume_from(serde_json::json!({
            "volumeInfo": {"publishedDate": "19"}
        })));
        assert_eq!(record.publication_year, "19");

        let record = normalize_volume(volume_from(serde_json::json!({
            "volumeInfo": {"publishedDate": "circa 1900"}
        })));
        assert_eq!(record.publication_year, "circ");
    }

    #[test]
    fn test_thumbnail_missing() {
        let record = normalize_volume(volume_from(serde_json::json!({
            "volumeInfo": {"imageLinks": {"smallThumbnail": "http://s"}}
        })));
        assert!(record.image_link.is_empty());
    }

    #[test]
    fn test_missing_items_is_empty() {
        let data: VolumesResponse =
            serde_json::from_str(r#"{"kind": "books#volumes", "totalItems": 0}"#).expect("parse");
        assert!(data.items.is_none());
    }
}
