//! Command-line interface parsing for bookdrill
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! a validated `StartupConfig`: where the cache files and database live, the
//! books API credential and page size, the network timeout, and how charts
//! and recommendations are sourced.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use directories::ProjectDirs;
use thiserror::Error;

use crate::data::books::{DEFAULT_MAX_RESULTS, MAX_RESULTS_LIMIT};
use crate::store::DATABASE_FILE;

/// Default per-request network timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// Page size outside what the books API accepts
    #[error("Invalid --max-results: {0}. Must be between 1 and 40")]
    InvalidMaxResults(u32),

    /// A zero timeout would fail every request
    #[error("Invalid --timeout: must be at least 1 second")]
    InvalidTimeout,
}

/// bookdrill - Search books, look up their authors, and chart the results
#[derive(Parser, Debug)]
#[command(name = "bookdrill")]
#[command(about = "Search books, look up their authors, and chart the results")]
#[command(version)]
pub struct Cli {
    /// Directory for the response caches and the results database
    #[arg(long, value_name = "DIR", env = "BOOKDRILL_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Google Books API key
    #[arg(long, value_name = "KEY", env = "GOOGLE_BOOKS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Number of books requested per search (1-40)
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_RESULTS)]
    pub max_results: u32,

    /// Network timeout per request, in seconds
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Read recommendation titles from a file (one per line) instead of the web
    #[arg(long, value_name = "FILE")]
    pub seed_file: Option<PathBuf>,

    /// Print charts as text instead of opening the full-screen viewer
    #[arg(long)]
    pub text_charts: bool,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub data_dir: PathBuf,
    pub api_key: Option<String>,
    pub max_results: u32,
    pub timeout: Duration,
    pub seed_file: Option<PathBuf>,
    pub text_charts: bool,
    pub verbose: bool,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            api_key: None,
            max_results: DEFAULT_MAX_RESULTS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            seed_file: None,
            text_charts: false,
            verbose: false,
        }
    }
}

/// XDG data directory (`~/.local/share/bookdrill` on Linux), else the working directory
pub fn default_data_dir() -> PathBuf {
    ProjectDirs::from("", "", "bookdrill")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Arguments
    /// * `cli` - The parsed CLI struct
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with validated settings
    /// * `Err(CliError)` if a numeric option is out of range
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        if !(1..=MAX_RESULTS_LIMIT).contains(&cli.max_results) {
            return Err(CliError::InvalidMaxResults(cli.max_results));
        }
        if cli.timeout == 0 {
            return Err(CliError::InvalidTimeout);
        }

        Ok(StartupConfig {
            data_dir: cli.data_dir.clone().unwrap_or_else(default_data_dir),
            api_key: cli.api_key.clone().filter(|key| !key.trim().is_empty()),
            max_results: cli.max_results,
            timeout: Duration::from_secs(cli.timeout),
            seed_file: cli.seed_file.clone(),
            text_charts: cli.text_charts,
            verbose: cli.verbose,
        })
    }

    /// Path of the SQLite results database
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}
