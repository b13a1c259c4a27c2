use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::{
    document::Document,
    error::ScrapeError,
    extract::{
        tables::{SEARCH_ITEM, SEARCH_ITEM_SELECTOR},
        Extraction, Field,
    },
    links,
    models::{Author, ModRecord},
    Spider,
};

use super::{issue, IssueKind, ItemOutcome, ScrapeContext, Scraped};

/// Scrapes resource search results for one query.
///
/// Search items carry no stats of their own, so download link, counts,
/// rating and last update all come from the item's detail page.
pub struct SearchScraper {
    context: Arc<ScrapeContext>,
    query: String,
    title_only: bool,
    first_page: u32,
    page_count: u32,
}

impl SearchScraper {
    pub fn new(context: Arc<ScrapeContext>, query: impl Into<String>) -> Self {
        Self {
            context,
            query: query.into(),
            title_only: true,
            first_page: 1,
            page_count: 1,
        }
    }

    /// Match the query against titles only (the default) or all fields.
    pub fn title_only(mut self, title_only: bool) -> Self {
        self.title_only = title_only;
        self
    }

    pub fn pages(mut self, first_page: u32, page_count: u32) -> Self {
        self.first_page = first_page.max(1);
        self.page_count = page_count;
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub async fn scrape_page(&self, url: &str) -> Result<Scraped<ModRecord>, ScrapeError> {
        let html = self.context.fetch_page(url).await?;
        let items = parse_items(&html, self.context.config().base_url());
        log::info!("found {} results for {:?} on {}", items.len(), self.query(), url);

        let deadline = self.context.deadline();
        let outcomes = self
            .context
            .complete_all(items, |index, item| self.complete(index, item, deadline))
            .await;
        self.context.log_cache_stats();

        Ok(ItemOutcome::gather(url, outcomes))
    }

    async fn complete(&self, index: usize, item: Extraction, deadline: Instant) -> ItemOutcome<ModRecord> {
        let raw_link = item.text(Field::ModLink);
        let Some((id, mod_link)) = raw_link
            .as_deref()
            .map(links::canonical_mod_link)
            .and_then(|link| Some((links::mod_id(&link)?, link)))
        else {
            let mut issues: Vec<_> = item
                .issues()
                .iter()
                .cloned()
                .map(|err| issue(index, raw_link.as_deref(), IssueKind::Normalization(err)))
                .collect();
            issues.push(issue(index, raw_link.as_deref(), IssueKind::MissingIdentifier));
            return ItemOutcome { item: None, issues };
        };

        let secondary = self.context.secondary(&mod_link, deadline).await;
        let detail = secondary.detail.unwrap_or_default();
        let issues = item
            .issues()
            .iter()
            .cloned()
            .map(IssueKind::Normalization)
            .chain(secondary.issues)
            .map(|kind| issue(index, Some(&mod_link), kind))
            .collect();

        let record = ModRecord {
            id,
            title: item.text(Field::Title),
            tag: item.text(Field::Tag),
            description: item.text(Field::Description),
            icon_url: item.text(Field::Icon),
            avatar_url: None,
            download_link: detail.download_link,
            author: Author {
                name: item.text(Field::AuthorName),
                profile_url: None,
            },
            rating: detail.rating,
            rating_count: detail.rating_count,
            download_count: detail.download_count,
            subscription_count: None,
            last_updated: detail.last_updated,
            current_version: item.text(Field::CurrentVersion),
            content_type: item.text(Field::ContentType),
            versions: secondary.versions,
            mod_link,
        };
        ItemOutcome {
            item: Some(record),
            issues,
        }
    }
}

fn parse_items(html: &str, base: &url::Url) -> Vec<Extraction> {
    let document = Document::parse(html);
    document
        .find_all(&SEARCH_ITEM_SELECTOR)
        .into_iter()
        .map(|node| SEARCH_ITEM.apply(node, base))
        .collect()
}

#[async_trait]
impl Spider for SearchScraper {
    type Item = ModRecord;
    type Error = ScrapeError;

    fn name(&self) -> String {
        String::from("search")
    }

    fn start_urls(&self) -> Vec<String> {
        let base = self.context.config().base_url();
        (self.first_page..self.first_page.saturating_add(self.page_count))
            .map(|page| links::search_url(base, &self.query, page, self.title_only).to_string())
            .collect()
    }

    async fn scrape(&self, url: &str) -> Result<Scraped<ModRecord>, ScrapeError> {
        self.scrape_page(url).await
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
    };

    use super::*;
    use crate::{
        config::{ExecutionMode, ScraperConfig},
        error::FetchError,
        Fetch,
    };

    const SEARCH: &str = include_str!("../../tests/fixtures/search.html");
    const DETAIL: &str = include_str!("../../tests/fixtures/detail.html");
    const HISTORY: &str = include_str!("../../tests/fixtures/history.html");

    const PAGE: &str = "https://www.beamng.com/search/search?q=car";
    const CAR: &str = "https://www.beamng.com/resources/fast-car.12345/";

    /// Serves fixtures and counts requests per url.
    struct Fixtures {
        pages: HashMap<String, String>,
        requests: Mutex<HashMap<String, usize>>,
        total: AtomicUsize,
    }

    impl Fixtures {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.to_string()))
                    .collect(),
                requests: Mutex::new(HashMap::new()),
                total: AtomicUsize::new(0),
            }
        }

        fn requests(&self, url: &str) -> usize {
            self.requests.lock().unwrap().get(url).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl Fetch for Fixtures {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.total.fetch_add(1, Ordering::SeqCst);
            *self.requests.lock().unwrap().entry(url.to_string()).or_default() += 1;
            // Let overlapping callers pile up on the same key.
            tokio::task::yield_now().await;
            self.pages.get(url).cloned().ok_or(FetchError::Status {
                status: 404,
                url: url.to_string(),
            })
        }
    }

    fn site() -> Arc<Fixtures> {
        let history = format!("{CAR}historyImproved");
        Arc::new(Fixtures::new(&[
            (PAGE, SEARCH),
            (CAR, DETAIL),
            (history.as_str(), HISTORY),
        ]))
    }

    fn scraper(fixtures: Arc<Fixtures>, mode: ExecutionMode) -> SearchScraper {
        let config = ScraperConfig::default().with_mode(mode);
        SearchScraper::new(Arc::new(ScrapeContext::new(config, fixtures)), "car")
    }

    #[tokio::test]
    async fn update_variants_share_one_detail_fetch() {
        let fixtures = site();
        let page = scraper(fixtures.clone(), ExecutionMode::Concurrent { limit: 8 })
            .scrape_page(PAGE)
            .await
            .unwrap();

        assert_eq!(page.items.len(), 3);
        assert_eq!(page.items[0].mod_link, CAR);
        assert_eq!(page.items[0].mod_link, page.items[1].mod_link);
        assert_eq!(page.items[0].id, page.items[1].id);
        assert_eq!(fixtures.requests(CAR), 1);
    }

    #[tokio::test]
    async fn metadata_comes_from_the_detail_page() {
        let page = scraper(site(), ExecutionMode::Sequential)
            .scrape_page(PAGE)
            .await
            .unwrap();
        let first = &page.items[0];

        assert_eq!(first.id, 12345);
        assert_eq!(first.title.as_deref(), Some("Fast Car"));
        assert_eq!(first.tag.as_deref(), Some("Cars"));
        assert_eq!(first.current_version.as_deref(), Some("1.2"));
        assert_eq!(first.content_type.as_deref(), Some("Resource Update"));
        assert_eq!(first.description.as_deref(), Some("Fixed the brakes."));
        assert_eq!(first.author.name.as_deref(), Some("speedy"));
        assert_eq!(
            first.icon_url.as_deref(),
            Some("https://www.beamng.com/data/avatars/s/0/42.jpg")
        );
        assert_eq!(
            first.download_link.as_deref(),
            Some("https://www.beamng.com/resources/fast-car.12345/download?version=3")
        );
        assert_eq!(first.download_count, Some(54321));
        assert_eq!(first.rating, Some(4.5));
        assert_eq!(first.rating_count, Some(12345));
        assert_eq!(first.last_updated.as_deref(), Some("Mar 3, 2024"));
        assert_eq!(first.versions.len(), 3);
    }

    #[tokio::test]
    async fn missing_author_and_detail_degrade_to_none() {
        let page = scraper(site(), ExecutionMode::Sequential)
            .scrape_page(PAGE)
            .await
            .unwrap();
        let drift = &page.items[2];

        assert_eq!(drift.id, 555);
        assert_eq!(drift.author.name, None);
        assert_eq!(drift.download_link, None);
        assert_eq!(drift.download_count, None);
        assert_eq!(drift.rating, None);
        let fetch_failures: Vec<_> = page
            .issues
            .iter()
            .filter(|i| matches!(i.kind, IssueKind::SecondaryFetch(_)))
            .collect();
        // Detail and history of the uncached mod.
        assert_eq!(fetch_failures.len(), 2);
        assert!(fetch_failures.iter().all(|i| i.index == 2));
        assert!(matches!(
            fetch_failures[0].kind,
            IssueKind::SecondaryFetch(FetchError::Status { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn sequential_and_concurrent_agree() {
        let sequential = scraper(site(), ExecutionMode::Sequential)
            .scrape_page(PAGE)
            .await
            .unwrap();
        let concurrent = scraper(site(), ExecutionMode::Concurrent { limit: 3 })
            .scrape_page(PAGE)
            .await
            .unwrap();
        assert_eq!(sequential.items, concurrent.items);
    }

    #[tokio::test]
    async fn history_can_be_switched_off() {
        let fixtures = site();
        let config = ScraperConfig::default().with_fetch_history(false);
        let scraper = SearchScraper::new(Arc::new(ScrapeContext::new(config, fixtures.clone())), "car");
        let page = scraper.scrape_page(PAGE).await.unwrap();

        assert!(page.items.iter().all(|r| r.versions.is_empty()));
        assert_eq!(fixtures.requests(&format!("{CAR}historyImproved")), 0);
    }

    #[test]
    fn start_urls_carry_the_query() {
        let scraper = scraper(site(), ExecutionMode::Sequential)
            .title_only(false)
            .pages(1, 2);
        let urls = scraper.start_urls();
        assert_eq!(urls.len(), 2);
        assert!(urls[0].contains("q=car"));
        assert!(!urls[0].contains("title_only"));
        assert!(urls[1].ends_with("page=2"));
    }
}
