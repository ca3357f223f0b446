//! Retrieval pipeline: Google Books, then Google Scholar, then merge.

use crate::books::BooksClient;
use crate::credentials::{Credentials, Provider};
use crate::error::{BibmergeError, Result};
use crate::scholar::ScholarClient;
use crate::store::{self, MergeReport};
use reqwest::Client;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Default timeout for one provider request
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Build the HTTP client shared by both providers.
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(concat!("bibmerge/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(|e| BibmergeError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Result of one retrieval run
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalOutcome {
    pub table: PathBuf,
    pub books_count: usize,
    pub scholar_count: usize,
    #[serde(flatten)]
    pub report: MergeReport,
}

impl RetrievalOutcome {
    /// Status line for the operator
    pub fn message(&self) -> String {
        let mut message = format!(
            "Data retrieval successful! Data saved to `{}` ({} from Google Books, {} from Google Scholar; {} new, {} duplicates skipped)",
            self.table.display(),
            self.books_count,
            self.scholar_count,
            self.report.appended,
            self.report.skipped
        );
        if self.report.schema_warning {
            message.push_str(". Warning: the table has no 'Title' column, so duplicates were not detected");
        }
        message
    }
}

/// Runs both providers and merges their records into a table.
#[derive(Debug, Clone)]
pub struct Retriever {
    books: BooksClient,
    scholar: ScholarClient,
}

impl Retriever {
    /// Retriever against the public endpoints
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = build_http_client(timeout)?;
        Ok(Self {
            books: BooksClient::new(client.clone()),
            scholar: ScholarClient::new(client),
        })
    }

    /// Retriever over preconfigured provider clients
    pub fn with_clients(books: BooksClient, scholar: ScholarClient) -> Self {
        Self { books, scholar }
    }

    /// Fetch from both providers and merge into the table at `table`.
    ///
    /// # Errors
    ///
    /// `Config` when the query or either key is empty (no request is made);
    /// `Io`/`Csv` when the table cannot be read or written. Provider failures
    /// are not errors and count as zero results.
    pub async fn retrieve(
        &self,
        credentials: &Credentials,
        query: &str,
        max_results: u32,
        table: &Path,
    ) -> Result<RetrievalOutcome> {
        validate_request(credentials, query)?;
        let query = query.trim();

        info!(
            query = query,
            max_results = max_results,
            table = %table.display(),
            "Starting retrieval"
        );

        let mut records = self
            .books
            .fetch(credentials.get(Provider::GoogleBooks), query, max_results)
            .await;
        let books_count = records.len();

        let scholar_records = self
            .scholar
            .fetch(credentials.get(Provider::GoogleScholar), query, max_results)
            .await;
        let scholar_count = scholar_records.len();
        records.extend(scholar_records);

        let report = store::merge_into_table(table, &records)?;

        Ok(RetrievalOutcome {
            table: table.to_path_buf(),
            books_count,
            scholar_count,
            report,
        })
    }
}

fn validate_request(credentials: &Credentials, query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(BibmergeError::Config("Please enter a search query.".to_string()));
    }
    if !credentials.is_configured(Provider::GoogleBooks)
        || !credentials.is_configured(Provider::GoogleScholar)
    {
        return Err(BibmergeError::Config(
            "Please provide API keys for both Google Books and Google Scholar.".to_string(),
        ));
    }
    Ok(())
}
