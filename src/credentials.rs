//! API key persistence.
//!
//! Keys live in a small JSON object keyed by provider name,
//! `{"google_books": "...", "google_scholar": "..."}`, loaded once at startup
//! and written back whenever a value changes.

use crate::error::{BibmergeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Default credential file, relative to the working directory
pub const DEFAULT_CREDENTIALS_FILE: &str = "api_keys.json";

/// Provider that needs an API key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    GoogleBooks,
    GoogleScholar,
}

impl Provider {
    /// Key name in the credential file
    pub fn key_name(self) -> &'static str {
        match self {
            Provider::GoogleBooks => "google_books",
            Provider::GoogleScholar => "google_scholar",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::GoogleBooks => f.write_str("Google Books"),
            Provider::GoogleScholar => f.write_str("Google Scholar"),
        }
    }
}

impl FromStr for Provider {
    type Err = BibmergeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "google_books" | "books" => Ok(Provider::GoogleBooks),
            "google_scholar" | "scholar" => Ok(Provider::GoogleScholar),
            other => Err(BibmergeError::Validation(format!(
                "Unknown provider '{}', expected google_books or google_scholar",
                other
            ))),
        }
    }
}

/// API keys for both providers. Empty string means not configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub google_books: String,
    #[serde(default)]
    pub google_scholar: String,
}

impl Credentials {
    pub fn get(&self, provider: Provider) -> &str {
        match provider {
            Provider::GoogleBooks => &self.google_books,
            Provider::GoogleScholar => &self.google_scholar,
        }
    }

    /// Set a key; returns whether the stored value changed.
    pub fn set(&mut self, provider: Provider, key: impl Into<String>) -> bool {
        let key = key.into();
        let slot = match provider {
            Provider::GoogleBooks => &mut self.google_books,
            Provider::GoogleScholar => &mut self.google_scholar,
        };
        if *slot == key {
            return false;
        }
        *slot = key;
        true
    }

    pub fn is_configured(&self, provider: Provider) -> bool {
        !self.get(provider).is_empty()
    }
}

/// Credential file manager for loading and saving keys
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the credential file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load keys from file
    ///
    /// Returns empty keys if the file doesn't exist or is invalid
    pub fn load(&self) -> Credentials {
        if !self.path.exists() {
            debug!("Credential file not found: {:?}", self.path);
            return Credentials::default();
        }

        match std::fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<Credentials>(&content) {
                Ok(credentials) => {
                    info!("Loaded API keys from {:?}", self.path);
                    credentials
                }
                Err(e) => {
                    warn!("Failed to parse credential file: {}", e);
                    Credentials::default()
                }
            },
            Err(e) => {
                warn!("Failed to read credential file: {}", e);
                Credentials::default()
            }
        }
    }

    /// Save keys to file
    pub fn save(&self, credentials: &Credentials) -> Result<()> {
        let content = serde_json::to_string_pretty(credentials)?;
        std::fs::write(&self.path, content)?;
        info!("Saved API keys to {:?}", self.path);
        Ok(())
    }

    /// Update one key and persist immediately if it changed.
    pub fn update(
        &self,
        credentials: &mut Credentials,
        provider: Provider,
        key: impl Into<String>,
    ) -> Result<bool> {
        let changed = credentials.set(provider, key);
        if changed {
            self.save(credentials)?;
        }
        Ok(changed)
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new(DEFAULT_CREDENTIALS_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_load_missing() {
        let store = CredentialStore::new("/nonexistent/path/api_keys.json");
        assert_eq!(store.load(), Credentials::default());
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let temp = NamedTempFile::new()?;
        let store = CredentialStore::new(temp.path());

        let credentials = Credentials {
            google_books: "books-key".to_string(),
            google_scholar: "serp-key".to_string(),
        };
        store.save(&credentials)?;
        assert_eq!(store.load(), credentials);

        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(temp.path())?)?;
        assert_eq!(raw["google_books"], "books-key");
        assert_eq!(raw["google_scholar"], "serp-key");
        Ok(())
    }

    #[test]
    fn test_load_partial_and_invalid() -> Result<()> {
        let temp = NamedTempFile::new()?;
        let store = CredentialStore::new(temp.path());

        std::fs::write(temp.path(), r#"{"google_books": "only-books"}"#)?;
        let loaded = store.load();
        assert_eq!(loaded.google_books, "only-books");
        assert!(!loaded.is_configured(Provider::GoogleScholar));

        std::fs::write(temp.path(), "not json")?;
        assert_eq!(store.load(), Credentials::default());
        Ok(())
    }

    #[test]
    fn test_update_persists_only_on_change() -> Result<()> {
        let dir = TempDir::new()?;
        let store = CredentialStore::new(dir.path().join("keys.json"));
        let mut credentials = store.load();

        assert!(!store.update(&mut credentials, Provider::GoogleBooks, "")?);
        assert!(!store.path().exists());

        assert!(store.update(&mut credentials, Provider::GoogleBooks, "k1")?);
        assert_eq!(store.load().google_books, "k1");
        assert!(!store.update(&mut credentials, Provider::GoogleBooks, "k1")?);
        Ok(())
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("google_books".parse::<Provider>().ok(), Some(Provider::GoogleBooks));
        assert_eq!("Google-Scholar".parse::<Provider>().ok(), Some(Provider::GoogleScholar));
        assert_eq!("scholar".parse::<Provider>().ok(), Some(Provider::GoogleScholar));
        assert!("bing".parse::<Provider>().is_err());
    }
}
