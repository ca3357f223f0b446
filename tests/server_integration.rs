//! Front end routes driven over HTTP against a live listener.

use bibmerge::books::BooksClient;
use bibmerge::credentials::CredentialStore;
use bibmerge::pipeline::{build_http_client, Retriever};
use bibmerge::scholar::ScholarClient;
use bibmerge::server::{self, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct TestApp {
    base_url: String,
    dir: TempDir,
    _providers: MockServer,
}

impl TestApp {
    fn keys_path(&self) -> std::path::PathBuf {
        self.dir.path().join("api_keys.json")
    }
}

async fn spawn_app() -> TestApp {
    let providers = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"volumeInfo": {"title": "Intro to Biology", "authors": ["Jane Roe"]}}]
        })))
        .mount(&providers)
        .await;
    Mock::given(method("GET"))
        .and(path("/scholar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "organic_results": [{"title": "Cell Biology Review"}]
        })))
        .mount(&providers)
        .await;

    let http = build_http_client(Duration::from_secs(5)).expect("http client");
    let retriever = Retriever::with_clients(
        BooksClient::with_base_url(http.clone(), format!("{}/books", providers.uri())),
        ScholarClient::with_base_url(http, format!("{}/scholar", providers.uri())),
    );

    let dir = TempDir::new().expect("tempdir");
    let store = CredentialStore::new(dir.path().join("api_keys.json"));
    let state = Arc::new(AppState::new(retriever, store, dir.path()));

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(server::serve_on(listener, state));

    TestApp {
        base_url: format!("http://{}", addr),
        dir,
        _providers: providers,
    }
}

async fn set_keys(client: &reqwest::Client, app: &TestApp) {
    let res = client
        .put(format!("{}/api/credentials", app.base_url))
        .json(&json!({"google_books": "books-key", "google_scholar": "serp-key"}))
        .send()
        .await
        .expect("request");
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn test_health_and_index() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/health", app.base_url)).send().await.expect("request");
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.expect("body"), "OK");

    let res = client.get(&app.base_url).send().await.expect("request");
    assert_eq!(res.status(), 200);
    assert!(res.text().await.expect("body").contains("Retrieve Data"));
}

#[tokio::test]
async fn test_credentials_are_persisted_and_not_echoed() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let status: Value = client
        .get(format!("{}/api/credentials", app.base_url))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert_eq!(status, json!({"google_books": false, "google_scholar": false}));

    let res = client
        .put(format!("{}/api/credentials", app.base_url))
        .json(&json!({"google_books": "books-key"}))
        .send()
        .await
        .expect("request");
    let body = res.text().await.expect("body");
    assert!(!body.contains("books-key"));
    let status: Value = serde_json::from_str(&body).expect("json");
    assert_eq!(status, json!({"google_books": true, "google_scholar": false}));

    let stored = CredentialStore::new(app.keys_path()).load();
    assert_eq!(stored.google_books, "books-key");
    assert!(stored.google_scholar.is_empty());
}

#[tokio::test]
async fn test_retrieve_requires_keys() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/retrieve", app.base_url))
        .json(&json!({"query": "biology", "max_results": 5}))
        .send()
        .await
        .expect("request");
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.expect("json");
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap_or_default().contains("API keys"));
    assert!(!app.dir.path().join("combined_data.csv").exists());
}

#[tokio::test]
async fn test_retrieve_rejects_unsafe_file_name() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    set_keys(&client, &app).await;

    let res = client
        .post(format!("{}/api/retrieve", app.base_url))
        .json(&json!({"query": "biology", "file_name": "../outside.csv"}))
        .send()
        .await
        .expect("request");
    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn test_retrieve_list_and_download() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    set_keys(&client, &app).await;

    let res = client
        .post(format!("{}/api/retrieve", app.base_url))
        .json(&json!({"query": "biology", "max_results": 0, "file_name": "bio.csv"}))
        .send()
        .await
        .expect("request");
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.expect("json");
    assert_eq!(body["status"], "success");
    assert_eq!(body["appended"], 2);
    assert_eq!(body["books_count"], 1);
    assert_eq!(body["scholar_count"], 1);

    let tables: Value = client
        .get(format!("{}/api/tables", app.base_url))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert_eq!(tables[0]["name"], "bio.csv");

    let res = client
        .get(format!("{}/api/tables/bio.csv", app.base_url))
        .send()
        .await
        .expect("request");
    assert_eq!(res.status(), 200);
    let content_type = res
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/csv"));
    let bytes = res.bytes().await.expect("body");
    assert_eq!(&bytes[..], std::fs::read(app.dir.path().join("bio.csv")).expect("table"));

    // Second run adds nothing
    let body: Value = client
        .post(format!("{}/api/retrieve", app.base_url))
        .json(&json!({"query": "biology", "file_name": "bio.csv"}))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert_eq!(body["appended"], 0);
    assert_eq!(body["skipped"], 2);
}

#[tokio::test]
async fn test_download_missing_and_invalid() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/tables/absent.csv", app.base_url))
        .send()
        .await
        .expect("request");
    assert_eq!(res.status(), 404);

    let res = client
        .get(format!("{}/api/tables/api_keys.json", app.base_url))
        .send()
        .await
        .expect("request");
    assert_eq!(res.status(), 400);
}
