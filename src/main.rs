//! bibmerge - Books and Scholar metadata retrieval into CSV tables
//!
//! ## Usage
//!
//! ### CLI Mode
//! ```bash
//! bibmerge keys set google_books <KEY>
//! bibmerge keys set google_scholar <KEY>
//! bibmerge search "biology" --max-results 10 --file biology.csv
//! ```
//!
//! ### HTTP Server Mode
//! ```bash
//! bibmerge serve --port 8501
//! ```

use anyhow::{Context, Result};
use bibmerge::credentials::{CredentialStore, Provider, DEFAULT_CREDENTIALS_FILE};
use bibmerge::pipeline::{Retriever, DEFAULT_TIMEOUT_SECS};
use bibmerge::server::{self, AppState};
use bibmerge::store::{self, DEFAULT_TABLE_NAME};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Retrieve Google Books and Google Scholar metadata into deduplicated CSV tables
#[derive(Parser)]
#[command(name = "bibmerge")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// API key file
    #[arg(long, global = true, default_value = DEFAULT_CREDENTIALS_FILE)]
    keys: PathBuf,

    /// Directory holding the CSV tables
    #[arg(long, global = true, default_value = ".")]
    data_dir: PathBuf,

    /// Timeout for each provider request, in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query both providers and merge the results into a table
    Search {
        /// Search query
        query: String,

        /// Max results from each source (0 for all data)
        #[arg(short, long, default_value_t = 0)]
        max_results: u32,

        /// Table file name inside the data directory
        #[arg(short, long, default_value = DEFAULT_TABLE_NAME)]
        file: String,
    },

    /// Run the web front end
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8501")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Manage API keys
    Keys {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// List tables in the data directory
    Tables,
}

#[derive(Subcommand)]
enum KeyAction {
    /// Store the key for a provider (google_books or google_scholar)
    Set { provider: String, key: String },
    /// Show which keys are configured
    Show,
    /// Show key file path
    Path,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    if cli.log_json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .init();
    }

    let credential_store = CredentialStore::new(&cli.keys);
    let timeout = Duration::from_secs(cli.timeout);

    match cli.command {
        Commands::Search {
            query,
            max_results,
            file,
        } => run_search(&credential_store, cli.data_dir, timeout, query, max_results, file).await,
        Commands::Serve { port, host } => {
            let retriever = Retriever::new(timeout)?;
            let state = Arc::new(AppState::new(retriever, credential_store, cli.data_dir));
            println!("Starting server at http://{}:{}", host, port);
            server::serve(state, &host, port)
                .await
                .context("Server error")
        }
        Commands::Keys { action } => handle_keys(&credential_store, action),
        Commands::Tables => list_tables(cli.data_dir),
    }
}

async fn run_search(
    credential_store: &CredentialStore,
    data_dir: PathBuf,
    timeout: Duration,
    query: String,
    max_results: u32,
    file: String,
) -> Result<()> {
    let credentials = credential_store.load();
    let table = store::resolve_table_path(&data_dir, &file)?;
    let retriever = Retriever::new(timeout)?;

    let outcome = retriever
        .retrieve(&credentials, &query, max_results, &table)
        .await
        .context("Retrieval failed")?;

    println!("{}", outcome.message());
    Ok(())
}

fn handle_keys(credential_store: &CredentialStore, action: KeyAction) -> Result<()> {
    match action {
        KeyAction::Set { provider, key } => {
            let provider: Provider = provider.parse()?;
            let mut credentials = credential_store.load();
            if credential_store.update(&mut credentials, provider, key.trim())? {
                println!("{} API key saved.", provider);
            } else {
                println!("{} API key unchanged.", provider);
            }
        }
        KeyAction::Show => {
            let credentials = credential_store.load();
            for provider in [Provider::GoogleBooks, Provider::GoogleScholar] {
                let state = if credentials.is_configured(provider) { "set" } else { "missing" };
                println!("{}: {}", provider.key_name(), state);
            }
        }
        KeyAction::Path => {
            println!("Key file: {:?}", credential_store.path());
        }
    }
    Ok(())
}

fn list_tables(data_dir: PathBuf) -> Result<()> {
    let tables = store::list_tables(&data_dir)
        .with_context(|| format!("Failed to list tables in {:?}", data_dir))?;

    if tables.is_empty() {
        println!("No CSV tables in {:?}", data_dir);
        return Ok(());
    }

    for table in tables {
        println!("{:<40} {:>10} bytes  {}", table.name, table.size_bytes, table.modified);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_logging_flags() {
        let cli = Cli::try_parse_from(["bibmerge", "tables", "--log-json", "--debug"])
            .expect("valid args");
        assert!(cli.log_json);
        assert!(cli.debug);
        assert!(matches!(cli.command, Commands::Tables));

        let cli = Cli::try_parse_from(["bibmerge", "tables"]).expect("valid args");
        assert!(!cli.log_json);
        assert_eq!(cli.timeout, DEFAULT_TIMEOUT_SECS);
    }
}
