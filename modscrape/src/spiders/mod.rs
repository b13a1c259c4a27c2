//! Page scrapers and the state they share.
//!
//! A page fetch is sequential and fatal on failure. Every item on the page is
//! then completed independently: secondary fetches go through the shared
//! caches and a bounded pool of permits, and any failure is recorded as an
//! [`ItemIssue`] instead of aborting the page.

mod listing;
pub use listing::ListingScraper;

mod search;
pub use search::SearchScraper;

use std::{future::Future, sync::Arc};

use futures::StreamExt;
use tokio::{sync::Semaphore, time::Instant};

use crate::{
    cache::ResponseCache,
    config::ScraperConfig,
    detail::DetailPage,
    error::{FetchError, NormalizationError},
    fetch::{Fetch, HttpFetcher},
    history::VersionHistory,
    links,
    models::VersionEntry,
    FromHtml,
};

/// Records scraped from one page plus everything that went wrong per item.
#[derive(Debug, Clone)]
pub struct Scraped<T> {
    pub url: String,
    pub items: Vec<T>,
    pub issues: Vec<ItemIssue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemIssue {
    /// Position of the item on its page.
    pub index: usize,
    pub link: Option<String>,
    pub kind: IssueKind,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum IssueKind {
    #[error("secondary fetch failed: {0}")]
    SecondaryFetch(FetchError),

    #[error("{0}")]
    Normalization(NormalizationError),

    #[error("no record id in detail link")]
    MissingIdentifier,
}

/// Fetcher, caches and fetch permits, built once and shared by every scraper.
pub struct ScrapeContext {
    config: ScraperConfig,
    fetcher: Arc<dyn Fetch>,
    details: ResponseCache<DetailPage>,
    histories: ResponseCache<VersionHistory>,
    permits: Semaphore,
}

impl ScrapeContext {
    pub fn new(config: ScraperConfig, fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            details: ResponseCache::new(config.cache_capacity()),
            histories: ResponseCache::new(config.cache_capacity()),
            permits: Semaphore::new(config.mode().limit()),
            fetcher,
            config,
        }
    }

    /// Context backed by a pooled [`HttpFetcher`].
    pub fn http(config: ScraperConfig) -> Result<Self, FetchError> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::new(config, Arc::new(fetcher)))
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    pub fn details(&self) -> &ResponseCache<DetailPage> {
        &self.details
    }

    pub fn histories(&self) -> &ResponseCache<VersionHistory> {
        &self.histories
    }

    /// Primary page fetch.
    pub(crate) async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        log::info!("visiting: {}", url);
        self.fetch(url).await
    }

    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        tokio::time::timeout(self.config.request_timeout(), self.fetcher.fetch(url))
            .await
            .map_err(|_| FetchError::Timeout(url.to_string()))?
    }

    async fn cached<T>(
        &self,
        cache: &ResponseCache<T>,
        url: &str,
        deadline: Instant,
    ) -> Result<T, FetchError>
    where
        T: FromHtml + Clone,
    {
        let value = cache
            .get_or_try_compute(url, || async {
                let _permit = self
                    .permits
                    .acquire()
                    .await
                    .map_err(|err| FetchError::Network(err.to_string()))?;
                let body = tokio::time::timeout_at(deadline, self.fetch(url))
                    .await
                    .map_err(|_| FetchError::Timeout(url.to_string()))??;
                Ok::<_, FetchError>(T::from_html(&body, self.config.base_url()))
            })
            .await;
        if value.is_ok() {
            log::debug!("resolved: {}", url);
        }
        value
    }

    /// Detail page and, when enabled, version history for one canonical link.
    pub(crate) async fn secondary(&self, mod_link: &str, deadline: Instant) -> Secondary {
        let history_url = links::history_url(mod_link, self.config.history_path());
        let history = async {
            if self.config.fetch_history() {
                Some(self.cached(&self.histories, &history_url, deadline).await)
            } else {
                None
            }
        };
        let (detail, history) = tokio::join!(self.cached(&self.details, mod_link, deadline), history);

        let mut secondary = Secondary::default();
        match detail {
            Ok(detail) => {
                secondary.issues.extend(detail.issues.iter().cloned().map(IssueKind::Normalization));
                secondary.detail = Some(detail);
            }
            Err(err) => secondary.issues.push(IssueKind::SecondaryFetch(err)),
        }
        match history {
            Some(Ok(history)) => {
                secondary
                    .issues
                    .extend(history.issues.into_iter().map(IssueKind::Normalization));
                secondary.versions = history.entries;
            }
            Some(Err(err)) => secondary.issues.push(IssueKind::SecondaryFetch(err)),
            None => {}
        }
        secondary
    }

    /// Completes every item with at most `mode().limit()` in flight, then
    /// restores document order.
    pub(crate) async fn complete_all<I, F, Fut, T>(&self, items: Vec<I>, complete: F) -> Vec<T>
    where
        F: Fn(usize, I) -> Fut,
        Fut: Future<Output = T>,
    {
        let complete = &complete;
        let mut done: Vec<(usize, T)> = futures::stream::iter(items.into_iter().enumerate())
            .map(|(index, item)| async move { (index, complete(index, item).await) })
            .buffer_unordered(self.config.mode().limit())
            .collect()
            .await;
        done.sort_by_key(|(index, _)| *index);
        done.into_iter().map(|(_, outcome)| outcome).collect()
    }

    pub(crate) fn log_cache_stats(&self) {
        log::debug!("detail cache: {}", self.details.stats());
        log::debug!("history cache: {}", self.histories.stats());
    }

    pub(crate) fn deadline(&self) -> Instant {
        Instant::now() + self.config.page_deadline()
    }
}

/// What the secondary fetches of one item produced.
#[derive(Debug, Default)]
pub(crate) struct Secondary {
    pub detail: Option<DetailPage>,
    pub versions: Vec<VersionEntry>,
    pub issues: Vec<IssueKind>,
}

/// A completed item: its record, if it could be keyed, and its issues.
pub(crate) struct ItemOutcome<T> {
    pub item: Option<T>,
    pub issues: Vec<ItemIssue>,
}

impl<T> ItemOutcome<T> {
    pub(crate) fn gather(url: &str, outcomes: Vec<ItemOutcome<T>>) -> Scraped<T> {
        let mut scraped = Scraped {
            url: url.to_string(),
            items: Vec::with_capacity(outcomes.len()),
            issues: Vec::new(),
        };
        for outcome in outcomes {
            scraped.items.extend(outcome.item);
            scraped.issues.extend(outcome.issues);
        }
        for issue in &scraped.issues {
            log::warn!(
                "item {} ({}): {}",
                issue.index,
                issue.link.as_deref().unwrap_or(crate::models::UNKNOWN),
                issue.kind
            );
        }
        scraped
    }
}

pub(crate) fn issue(index: usize, link: Option<&str>, kind: IssueKind) -> ItemIssue {
    ItemIssue {
        index,
        link: link.map(str::to_string),
        kind,
    }
}
