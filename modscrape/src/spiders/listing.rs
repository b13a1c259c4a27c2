use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::{
    document::Document,
    error::ScrapeError,
    extract::{
        tables::{LISTING_ITEM, LISTING_ITEM_SELECTOR},
        Extraction, Field,
    },
    links::{self, Order},
    models::{Author, ModRecord},
    Spider,
};

use super::{issue, IssueKind, ItemOutcome, ScrapeContext, Scraped};

/// Scrapes the paginated resource listing.
pub struct ListingScraper {
    context: Arc<ScrapeContext>,
    order: Order,
    first_page: u32,
    page_count: u32,
}

impl ListingScraper {
    pub fn new(context: Arc<ScrapeContext>) -> Self {
        Self {
            context,
            order: Order::default(),
            first_page: 1,
            page_count: 1,
        }
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    pub fn pages(mut self, first_page: u32, page_count: u32) -> Self {
        self.first_page = first_page.max(1);
        self.page_count = page_count;
        self
    }

    pub async fn scrape_page(&self, url: &str) -> Result<Scraped<ModRecord>, ScrapeError> {
        let html = self.context.fetch_page(url).await?;
        let items = parse_items(&html, self.context.config().base_url());
        log::info!("found {} items on {}", items.len(), url);

        let deadline = self.context.deadline();
        let outcomes = self
            .context
            .complete_all(items, |index, item| self.complete(index, item, deadline))
            .await;
        self.context.log_cache_stats();

        Ok(ItemOutcome::gather(url, outcomes))
    }

    async fn complete(&self, index: usize, item: Extraction, deadline: Instant) -> ItemOutcome<ModRecord> {
        let mod_link = item.text(Field::ModLink).map(|link| links::canonical_mod_link(&link));
        let mut issues: Vec<_> = item
            .issues()
            .iter()
            .cloned()
            .map(|err| issue(index, mod_link.as_deref(), IssueKind::Normalization(err)))
            .collect();

        let Some((id, mod_link)) = mod_link.and_then(|link| Some((links::mod_id(&link)?, link))) else {
            issues.push(issue(
                index,
                item.text(Field::ModLink).as_deref(),
                IssueKind::MissingIdentifier,
            ));
            return ItemOutcome { item: None, issues };
        };

        let secondary = self.context.secondary(&mod_link, deadline).await;
        issues.extend(
            secondary
                .issues
                .into_iter()
                .map(|kind| issue(index, Some(&mod_link), kind)),
        );

        let record = ModRecord {
            id,
            title: item.text(Field::Title),
            tag: item.text(Field::Tag),
            description: item.text(Field::Description),
            icon_url: item.text(Field::Icon),
            avatar_url: item.text(Field::Avatar),
            download_link: secondary.detail.and_then(|detail| detail.download_link),
            author: Author {
                name: item.text(Field::AuthorName),
                profile_url: item.text(Field::AuthorLink),
            },
            rating: item.decimal(Field::Rating),
            rating_count: item.count(Field::RatingCount),
            download_count: item.count(Field::DownloadCount),
            subscription_count: item.count(Field::SubscriptionCount),
            last_updated: item.text(Field::LastUpdated),
            current_version: None,
            content_type: None,
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
        .find_all(&LISTING_ITEM_SELECTOR)
        .into_iter()
        .map(|node| LISTING_ITEM.apply(node, base))
        .collect()
}

#[async_trait]
impl Spider for ListingScraper {
    type Item = ModRecord;
    type Error = ScrapeError;

    fn name(&self) -> String {
        String::from("listing")
    }

    fn start_urls(&self) -> Vec<String> {
        let base = self.context.config().base_url();
        (self.first_page..self.first_page.saturating_add(self.page_count))
            .map(|page| links::listing_url(base, page, self.order).to_string())
            .collect()
    }

    async fn scrape(&self, url: &str) -> Result<Scraped<ModRecord>, ScrapeError> {
        self.scrape_page(url).await
    }
}
