//! HTTP front end.
//!
//! Serves a single-page form plus a small JSON API: edit API keys, run a
//! retrieval into a chosen table, list tables and download them.

use crate::credentials::{CredentialStore, Credentials, Provider};
use crate::error::{BibmergeError, Result};
use crate::pipeline::{RetrievalOutcome, Retriever};
use crate::store::{self, TableInfo, DEFAULT_TABLE_NAME};
use axum::{
    extract::{Path as UrlPath, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared server state
pub struct AppState {
    retriever: Retriever,
    store: CredentialStore,
    credentials: Mutex<Credentials>,
    data_dir: PathBuf,
}

impl AppState {
    /// Loads the credential file once; later edits go through the API.
    pub fn new(
        retriever: Retriever,
        store: CredentialStore,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        let credentials = store.load();
        Self {
            retriever,
            store,
            credentials: Mutex::new(credentials),
            data_dir: data_dir.into(),
        }
    }

    fn credentials(&self) -> std::sync::MutexGuard<'_, Credentials> {
        self.credentials
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Build the router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/credentials", get(get_credentials).put(put_credentials))
        .route("/api/retrieve", post(retrieve_handler))
        .route("/api/tables", get(list_tables_handler))
        .route("/api/tables/{name}", get(download_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `host:port` and serve until the process exits.
pub async fn serve(state: Arc<AppState>, host: &str, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| BibmergeError::Config(format!("Invalid host:port: {}", e)))?;
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, state).await
}

/// Serve on an already bound listener.
pub async fn serve_on(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    info!(addr = %listener.local_addr()?, "Front end listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ============================================================================
// Errors
// ============================================================================

/// Error response: `{"status": "error", "message": ...}`
pub struct ApiError(BibmergeError);

impl From<BibmergeError> for ApiError {
    fn from(err: BibmergeError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            err if err.is_user_error() => StatusCode::BAD_REQUEST,
            BibmergeError::NotFound(_) => StatusCode::NOT_FOUND,
            other => {
                error!(error = %other, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (
            status,
            Json(json!({ "status": "error", "message": self.0.to_string() })),
        )
            .into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_handler() -> &'static str {
    "OK"
}

/// Which providers have a key; keys themselves are never returned
#[derive(Debug, Serialize)]
struct CredentialStatus {
    google_books: bool,
    google_scholar: bool,
}

impl From<&Credentials> for CredentialStatus {
    fn from(credentials: &Credentials) -> Self {
        Self {
            google_books: credentials.is_configured(Provider::GoogleBooks),
            google_scholar: credentials.is_configured(Provider::GoogleScholar),
        }
    }
}

async fn get_credentials(State(state): State<Arc<AppState>>) -> Json<CredentialStatus> {
    Json(CredentialStatus::from(&*state.credentials()))
}

#[derive(Debug, Deserialize)]
struct CredentialUpdate {
    google_books: Option<String>,
    google_scholar: Option<String>,
}

async fn put_credentials(
    State(state): State<Arc<AppState>>,
    Json(update): Json<CredentialUpdate>,
) -> std::result::Result<Json<CredentialStatus>, ApiError> {
    let mut credentials = state.credentials();
    let changes = [
        (Provider::GoogleBooks, update.google_books),
        (Provider::GoogleScholar, update.google_scholar),
    ];
    for (provider, key) in changes {
        if let Some(key) = key {
            if state.store.update(&mut credentials, provider, key.trim())? {
                info!(provider = %provider, "API key updated");
            }
        }
    }
    Ok(Json(CredentialStatus::from(&*credentials)))
}

#[derive(Debug, Deserialize)]
struct RetrieveRequest {
    query: String,
    /// 0 lets each provider decide
    #[serde(default)]
    max_results: u32,
    file_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct RetrieveResponse {
    status: &'static str,
    message: String,
    #[serde(flatten)]
    outcome: RetrievalOutcome,
}

async fn retrieve_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RetrieveRequest>,
) -> std::result::Result<Json<RetrieveResponse>, ApiError> {
    let file_name = req
        .file_name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(DEFAULT_TABLE_NAME);
    let table = store::resolve_table_path(&state.data_dir, file_name)?;
    let credentials = state.credentials().clone();

    let outcome = state
        .retriever
        .retrieve(&credentials, &req.query, req.max_results, &table)
        .await?;

    Ok(Json(RetrieveResponse {
        status: "success",
        message: outcome.message(),
        outcome,
    }))
}

async fn list_tables_handler(
    State(state): State<Arc<AppState>>,
) -> std::result::Result<Json<Vec<TableInfo>>, ApiError> {
    Ok(Json(store::list_tables(&state.data_dir)?))
}

async fn download_handler(
    State(state): State<Arc<AppState>>,
    UrlPath(name): UrlPath<String>,
) -> std::result::Result<Response, ApiError> {
    let bytes = store::read_table(&state.data_dir, &name)?;
    let disposition = format!("attachment; filename=\"{}\"", name.trim().replace('"', ""));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>bibmerge</title>
<style>
body { font-family: sans-serif; max-width: 48rem; margin: 2rem auto; }
fieldset { margin-bottom: 1rem; }
label { display: block; margin: .5rem 0; }
#status.error { color: #b00020; }
#status.success { color: #1b5e20; }
</style>
</head>
<body>
<h1>Data Retrieval for Books and Scholar Information</h1>

<fieldset>
<legend>API Keys</legend>
<label>Google Books API Key <input id="books-key" type="password"></label>
<label>Google Scholar API Key <input id="scholar-key" type="password"></label>
<button id="save-keys">Save keys</button>
<span id="key-status"></span>
</fieldset>

<fieldset>
<legend>Retrieve</legend>
<label>Search Query <input id="query"></label>
<label>Max Results From Each Source (0 for all data) <input id="max-results" type="number" min="0" step="1" value="0"></label>
<label>Table <select id="table-select"><option value="">&lt;New File&gt;</option></select></label>
<label>New CSV File Name <input id="new-name" value="combined_data.csv"></label>
<button id="retrieve">Retrieve Data</button>
<p id="status"></p>
</fieldset>

<fieldset>
<legend>Download Data</legend>
<ul id="downloads"></ul>
</fieldset>

<script>
const $ = (id) => document.getElementById(id);

async function refreshKeys() {
  const res = await fetch('/api/credentials');
  const s = await res.json();
  $('key-status').textContent =
    `Google Books: ${s.google_books ? 'set' : 'missing'}, Google Scholar: ${s.google_scholar ? 'set' : 'missing'}`;
}

async function refreshTables() {
  const res = await fetch('/api/tables');
  const tables = await res.json();
  const select = $('table-select');
  select.length = 1;
  $('downloads').innerHTML = '';
  for (const t of tables) {
    select.add(new Option(t.name, t.name));
    const li = document.createElement('li');
    const a = document.createElement('a');
    a.href = '/api/tables/' + encodeURIComponent(t.name);
    a.textContent = `${t.name} (${t.size_bytes} bytes, ${t.modified})`;
    li.appendChild(a);
    $('downloads').appendChild(li);
  }
}

$('save-keys').onclick = async () => {
  const body = {};
  if ($('books-key').value) body.google_books = $('books-key').value;
  if ($('scholar-key').value) body.google_scholar = $('scholar-key').value;
  await fetch('/api/credentials', {
    method: 'PUT',
    headers: {'Content-Type': 'application/json'},
    body: JSON.stringify(body),
  });
  $('books-key').value = '';
  $('scholar-key').value = '';
  refreshKeys();
};

$('retrieve').onclick = async () => {
  const status = $('status');
  status.className = '';
  status.textContent = 'Retrieving...';
  const res = await fetch('/api/retrieve', {
    method: 'POST',
    headers: {'Content-Type': 'application/json'},
    body: JSON.stringify({
      query: $('query').value,
      max_results: parseInt($('max-results').value || '0', 10),
      file_name: $('table-select').value || $('new-name').value,
    }),
  });
  const out = await res.json();
  status.className = out.status;
  status.textContent = out.message;
  refreshTables();
};

refreshKeys();
refreshTables();
</script>
</body>
</html>
"#;
