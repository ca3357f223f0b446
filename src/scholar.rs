//! Google Scholar search via SerpAPI.
//!
//! SerpAPI returns author, venue and year packed into one
//! `publication_info.summary` string such as
//! `"J Doe, A Smith - Nature, 2019 - nature.com"`; this module splits it back
//! into columns and flattens the resource and inline-link substructures.

use crate::error::{BibmergeError, Result};
use crate::record::{Source, UnifiedRecord};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

/// SerpAPI search endpoint
pub const SCHOLAR_API_URL: &str = "https://serpapi.com/search.json";

/// SerpAPI engine name for Google Scholar
const ENGINE: &str = "google_scholar";

/// Separator between author, venue and host in the summary line
const SUMMARY_SEPARATOR: &str = " - ";

/// Ellipsis as it appears after UTF-8 was decoded as Windows-1252
const MOJIBAKE_ELLIPSIS: &str = "\u{e2}\u{20ac}\u{a6}";

/// A year segment is exactly four digits, nothing else
static YEAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}$").expect("valid year regex"));

/// Top-level SerpAPI response. A missing `organic_results` means no results.
#[derive(Debug, Default, Deserialize)]
pub struct ScholarResponse {
    pub organic_results: Option<Vec<OrganicResult>>,
    /// SerpAPI reports some failures in-band with a success status
    pub error: Option<String>,
}

/// One search hit
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganicResult {
    pub title: Option<String>,
    pub snippet: Option<String>,
    pub publication_info: Option<PublicationInfo>,
    pub resources: Option<Vec<ScholarResource>>,
    pub inline_links: Option<InlineLinks>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublicationInfo {
    pub summary: Option<String>,
}

/// Full-text resource (PDF/HTML) attached to a hit
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScholarResource {
    pub title: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InlineLinks {
    pub cited_by: Option<InlineLink>,
    pub versions: Option<InlineLink>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InlineLink {
    pub link: Option<String>,
}

/// Split a summary line into `(author, year)`.
///
/// The author is the first segment; the year is the first later segment that
/// consists of exactly four digits. A year embedded in a longer segment such
/// as `"Nature, 2019"` is not picked up. A line without a separator yields
/// nothing.
pub fn parse_summary(summary: &str) -> (String, String) {
    let parts: Vec<&str> = summary.split(SUMMARY_SEPARATOR).collect();
    if parts.len() < 2 {
        return (String::new(), String::new());
    }

    let author = parts[0].trim().to_string();
    let year = parts[1..]
        .iter()
        .find(|part| YEAR_REGEX.is_match(part))
        .map(|part| part.to_string())
        .unwrap_or_default();

    (author, year)
}

/// Replace encoding artifacts in snippet text with three periods.
pub fn clean_snippet(snippet: &str) -> String {
    snippet
        .replace(MOJIBAKE_ELLIPSIS, "...")
        .replace('\u{2026}', "...")
}

/// Project one SerpAPI organic result onto the unified schema.
pub fn normalize_result(result: OrganicResult) -> UnifiedRecord {
    let summary = result
        .publication_info
        .and_then(|info| info.summary)
        .unwrap_or_default();
    let (author_name, publication_year) = parse_summary(&summary);

    let resource = result
        .resources
        .and_then(|resources| resources.into_iter().next())
        .unwrap_or_default();

    let inline_links = result.inline_links.unwrap_or_default();

    UnifiedRecord {
        title: result.title.unwrap_or_default(),
        snippet: clean_snippet(&result.snippet.unwrap_or_default()),
        author_name,
        publication_year,
        resource_title: resource.title.unwrap_or_default(),
        resource_link: resource.link.unwrap_or_default(),
        cited_by_link: inline_links
            .cited_by
            .and_then(|l| l.link)
            .unwrap_or_default(),
        versions_link: inline_links
            .versions
            .and_then(|l| l.link)
            .unwrap_or_default(),
        ..UnifiedRecord::new(Source::Scholar)
    }
}

/// SerpAPI Google Scholar client. Holds no per-query state.
#[derive(Debug, Clone)]
pub struct ScholarClient {
    client: Client,
    base_url: String,
}

impl ScholarClient {
    /// Create a client against the public SerpAPI endpoint
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, SCHOLAR_API_URL)
    }

    /// Create a client against a custom endpoint (mirrors, mock servers)
    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Search Google Scholar and return every hit as a unified record.
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
                info!(count = records.len(), "Google Scholar fetch complete");
                records
            }
            Err(e) => {
                warn!(error = %e, "Error fetching data from Google Scholar");
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
            .query(&[("engine", ENGINE), ("q", query), ("api_key", api_key)]);
        if max_results > 0 {
            request = request.query(&[("num", max_results)]);
        }

        debug!(query = query, max_results = max_results, "Querying Google Scholar");
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(BibmergeError::Api {
                code: status.as_u16(),
                message: format!("Google Scholar: {}", error_text),
            });
        }

        let body = response.text().await?;
        let data: ScholarResponse = serde_json::from_str(&body).map_err(|e| {
            BibmergeError::Parse(format!("Failed to parse Google Scholar response: {}", e))
        })?;

        let Some(results) = data.organic_results else {
            match data.error {
                Some(message) => warn!(error = %message, "Google Scholar returned no results"),
                None => info!("No results found on Google Scholar"),
            }
            return Ok(Vec::new());
        };

        Ok(results.into_iter().map(normalize_result).collect())
    }
}
