use async_trait::async_trait;

use crate::spiders::Scraped;

#[async_trait]
pub trait Spider: Send + Sync {
    type Item;
    type Error;

    fn name(&self) -> String;
    fn start_urls(&self) -> Vec<String>;
    async fn scrape(&self, url: &str) -> Result<Scraped<Self::Item>, Self::Error>;
}
