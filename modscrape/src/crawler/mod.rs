mod crawler_builder;
pub use crawler_builder::CrawlerBuilder;

mod processor;
pub use processor::{PersistFailure, PersistOutcome, PersistSummary, Processor};

use std::{fmt::Display, sync::Arc, time::Duration};

use serde::Serialize;
use tokio::{sync::mpsc, time::sleep};

use crate::{models::ModRecord, repository::Repository, Spider};

/// Drives a spider over its start pages and feeds every record into the
/// persistence stage.
pub struct Crawler {
    /// Pause between consecutive page fetches.
    delay: Duration,

    /// Records buffered between the scraper and the repository.
    processing_queue_capacity: usize,
}

/// Outcome of one scraped page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageReport {
    pub url: String,
    pub records: usize,
    pub issues: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageFailure {
    pub url: String,
    pub error: String,
}

/// Summary of a whole crawl.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub spider: String,
    pub pages: Vec<PageReport>,
    pub page_failures: Vec<PageFailure>,
    pub saved: usize,
    pub persist_failures: Vec<PersistFailure>,
}

impl RunReport {
    pub fn records(&self) -> usize {
        self.pages.iter().map(|page| page.records).sum()
    }

    pub fn issues(&self) -> usize {
        self.pages.iter().map(|page| page.issues).sum()
    }
}

impl Crawler {
    /// Constructs a new `Crawler` instance.
    ///
    /// # Arguments
    ///
    /// * `delay` - The pause between consecutive page fetches.
    /// * `processing_queue_capacity` - The number of records buffered ahead of
    ///   the repository. Zero is treated as one.
    ///
    /// # Returns
    ///
    /// A new `Crawler` instance with the specified configurations.
    pub fn new(delay: Duration, processing_queue_capacity: usize) -> Self {
        Self {
            delay,
            processing_queue_capacity: processing_queue_capacity.max(1),
        }
    }

    /// Scrapes every start url in order and upserts each record.
    ///
    /// # Arguments
    ///
    /// * `spider` - The `Spider` that lists and scrapes the pages.
    /// * `repository` - The `Repository` every record is upserted into.
    ///
    /// # Remarks
    ///
    /// A failure on the first page aborts the run with the spider's error.
    /// Later page failures are recorded in the report and skipped.
    pub async fn crawl<S>(
        &self,
        spider: S,
        repository: Arc<dyn Repository>,
    ) -> Result<RunReport, S::Error>
    where
        S: Spider<Item = ModRecord>,
        S::Error: Display,
    {
        let (items_tx, items_rx) = mpsc::channel::<ModRecord>(self.processing_queue_capacity);
        let processor = Processor::new(repository);

        let produce = async move {
            let mut report = RunReport {
                spider: spider.name(),
                ..Default::default()
            };
            for (position, url) in spider.start_urls().into_iter().enumerate() {
                if position > 0 {
                    sleep(self.delay).await;
                }
                match spider.scrape(&url).await {
                    Ok(scraped) => {
                        report.pages.push(PageReport {
                            url: scraped.url,
                            records: scraped.items.len(),
                            issues: scraped.issues.len(),
                        });
                        for item in scraped.items {
                            if items_tx.send(item).await.is_err() {
                                log::error!("persistence stage closed early");
                                break;
                            }
                        }
                    }
                    Err(err) if position == 0 => {
                        log::error!("{}: {}", url, err);
                        return Err(err);
                    }
                    Err(err) => {
                        log::error!("{}: {}", url, err);
                        report.page_failures.push(PageFailure {
                            url,
                            error: err.to_string(),
                        });
                    }
                }
            }
            Ok(report)
        };

        let (report, summary) = tokio::join!(produce, processor.process_items(items_rx));
        let mut report = report?;
        report.saved = summary.saved;
        report.persist_failures = summary.failures;

        log::info!(
            "{}: {} pages, {} records, {} saved, {} failed",
            report.spider,
            report.pages.len(),
            report.records(),
            report.saved,
            report.persist_failures.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::{
        error::{FetchError, RepositoryError, ScrapeError},
        models::Author,
        spiders::Scraped,
    };

    fn record(id: u64) -> ModRecord {
        ModRecord {
            id,
            title: Some(format!("mod {id}")),
            tag: None,
            description: None,
            icon_url: None,
            avatar_url: None,
            mod_link: format!("https://www.beamng.com/resources/mod.{id}/"),
            download_link: None,
            author: Author::default(),
            rating: None,
            rating_count: None,
            download_count: None,
            subscription_count: None,
            last_updated: None,
            current_version: None,
            content_type: None,
            versions: Vec::new(),
        }
    }

    /// Serves canned pages; urls without a page fail.
    struct StubSpider {
        pages: Vec<(&'static str, Option<Vec<u64>>)>,
    }

    #[async_trait]
    impl Spider for StubSpider {
        type Item = ModRecord;
        type Error = ScrapeError;

        fn name(&self) -> String {
            String::from("stub")
        }

        fn start_urls(&self) -> Vec<String> {
            self.pages.iter().map(|(url, _)| url.to_string()).collect()
        }

        async fn scrape(&self, url: &str) -> Result<Scraped<ModRecord>, ScrapeError> {
            let ids = self
                .pages
                .iter()
                .find(|(page, _)| *page == url)
                .and_then(|(_, ids)| ids.clone())
                .ok_or_else(|| FetchError::Status {
                    status: 500,
                    url: url.to_string(),
                })?;
            Ok(Scraped {
                url: url.to_string(),
                items: ids.into_iter().map(record).collect(),
                issues: Vec::new(),
            })
        }
    }

    /// Keeps saved ids; refuses odd ones.
    #[derive(Default)]
    struct PickyRepository {
        saved: Mutex<Vec<u64>>,
    }

    impl Repository for PickyRepository {
        fn upsert(&self, record: &ModRecord) -> Result<(), RepositoryError> {
            if record.id % 2 == 1 {
                return Err(RepositoryError::Poisoned);
            }
            self.saved.lock().unwrap().push(record.id);
            Ok(())
        }
    }

    fn crawler() -> Crawler {
        CrawlerBuilder::new().delay(Duration::ZERO).build()
    }

    #[tokio::test]
    async fn persists_in_order_and_reports_failures() {
        let spider = StubSpider {
            pages: vec![("p1", Some(vec![2, 3, 4])), ("p2", Some(vec![6]))],
        };
        let repository = Arc::new(PickyRepository::default());
        let report = crawler().crawl(spider, repository.clone()).await.unwrap();

        assert_eq!(report.spider, "stub");
        assert_eq!(report.pages.len(), 2);
        assert_eq!(report.records(), 4);
        assert_eq!(report.saved, 3);
        assert_eq!(report.persist_failures.len(), 1);
        assert_eq!(report.persist_failures[0].id, 3);
        assert_eq!(*repository.saved.lock().unwrap(), [2, 4, 6]);
    }

    #[tokio::test]
    async fn first_page_failure_is_fatal() {
        let spider = StubSpider {
            pages: vec![("p1", None), ("p2", Some(vec![2]))],
        };
        let repository = Arc::new(PickyRepository::default());
        let err = crawler().crawl(spider, repository.clone()).await.unwrap_err();

        assert!(matches!(err, ScrapeError::Fetch(FetchError::Status { status: 500, .. })));
        assert!(repository.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn later_page_failure_is_recorded() {
        let spider = StubSpider {
            pages: vec![("p1", Some(vec![2])), ("p2", None), ("p3", Some(vec![4]))],
        };
        let report = crawler()
            .crawl(spider, Arc::new(PickyRepository::default()))
            .await
            .unwrap();

        assert_eq!(report.pages.len(), 2);
        assert_eq!(report.page_failures.len(), 1);
        assert_eq!(report.page_failures[0].url, "p2");
        assert_eq!(report.saved, 2);
    }
}
