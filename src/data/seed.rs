//! Recommendation seed list
//!
//! A short list of suggested titles offered under the "inspired" command. The
//! list is fetched lazily on first use and then kept for the rest of the
//! process; a failed or empty fetch leaves it unpopulated so the next request
//! tries again.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{info, warn};

use super::SourceError;

/// Listicle page the default seed list is scraped from
pub const DEFAULT_SEED_URL: &str = "https://www.elle.com/culture/books/g29954140/best-books-2020/";

/// Elements holding one slide heading each
const HEADING_SELECTOR: &str = ".listicle-slide-hed-text";

/// The book title is the italic text inside a heading
const TITLE_SELECTOR: &str = "i";

/// Something that can produce the recommendation titles
#[async_trait]
pub trait SeedSource: Send + Sync {
    async fn fetch_titles(&self) -> Result<Vec<String>, SourceError>;
}

/// Scrapes titles from a listicle web page
#[derive(Debug, Clone)]
pub struct ListicleSeedSource {
    client: Client,
    url: String,
}

impl ListicleSeedSource {
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: DEFAULT_SEED_URL.to_string(),
        })
    }
}

#[async_trait]
impl SeedSource for ListicleSeedSource {
    async fn fetch_titles(&self) -> Result<Vec<String>, SourceError> {
        let html = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        extract_titles(&html)
    }
}

/// Pulls the italic title out of every slide heading, in page order
pub fn extract_titles(html: &str) -> Result<Vec<String>, SourceError> {
    let heading = Selector::parse(HEADING_SELECTOR)
        .map_err(|e| SourceError::Malformed(format!("bad selector: {e:?}")))?;
    let italic = Selector::parse(TITLE_SELECTOR)
        .map_err(|e| SourceError::Malformed(format!("bad selector: {e:?}")))?;

    let document = Html::parse_document(html);
    let titles = document
        .select(&heading)
        .filter_map(|element| element.select(&italic).next())
        .map(|title| title.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
        .collect();
    Ok(titles)
}

/// Reads titles from a newline-separated text file
#[derive(Debug, Clone)]
pub struct FileSeedSource {
    path: PathBuf,
}

impl FileSeedSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SeedSource for FileSeedSource {
    async fn fetch_titles(&self) -> Result<Vec<String>, SourceError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SourceError::Io {
                path: self.path.display().to_string(),
                source,
            })?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

/// A fixed in-memory list of titles
#[derive(Debug, Clone, Default)]
pub struct StaticSeedSource(pub Vec<String>);

#[async_trait]
impl SeedSource for StaticSeedSource {
    async fn fetch_titles(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.0.clone())
    }
}

/// The process-lifetime recommendation list
pub struct RecommendationSeed {
    source: Box<dyn SeedSource>,
    titles: Option<Vec<String>>,
}

impl RecommendationSeed {
    pub fn new(source: Box<dyn SeedSource>) -> Self {
        Self {
            source,
            titles: None,
        }
    }

    /// Returns the titles, fetching them on first successful use
    ///
    /// # Returns
    /// * `Ok(titles)` - the populated list, or an empty slice if the source had none
    /// * `Err(SourceError)` - the fetch failed; a later call retries
    pub async fn titles(&mut self) -> Result<&[String], SourceError> {
        if self.titles.is_none() {
            let fetched = self.source.fetch_titles().await?;
            if fetched.is_empty() {
                warn!("recommendation source returned no titles");
                return Ok(&[]);
            }
            info!(count = fetched.len(), "recommendation list populated");
            self.titles = Some(fetched);
        }
        Ok(self.titles.as_deref().unwrap_or_default())
    }

    /// Whether the list has been populated
    pub fn is_populated(&self) -> bool {
        self.titles.is_some()
    }
}
