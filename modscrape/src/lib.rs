//! Catalog scraper for a mod marketplace: listing and search pages,
//! detail-page metadata and version histories, normalised into
//! [`ModRecord`]s and upserted into a [`Repository`].

pub mod cache;
pub mod config;
pub mod detail;
pub mod document;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod history;
pub mod links;
pub mod models;
pub mod repository;
pub mod spiders;

mod crawler;
pub use crawler::{
    Crawler, CrawlerBuilder, PageFailure, PageReport, PersistFailure, PersistOutcome,
    PersistSummary, Processor, RunReport,
};

mod traits;
pub use traits::{FromHtml, Spider};

pub use cache::ResponseCache;
pub use config::{ExecutionMode, ScraperConfig};
pub use error::{FetchError, NormalizationError, RepositoryError, ScrapeError};
pub use fetch::{Fetch, HttpFetcher};
pub use links::Order;
pub use models::{Author, ModRecord, VersionEntry};
pub use repository::{CatalogPage, Repository, SqliteRepository};
pub use spiders::{IssueKind, ItemIssue, ListingScraper, ScrapeContext, Scraped, SearchScraper};
