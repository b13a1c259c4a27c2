use std::time::Duration;

use crate::Crawler;

/// Builder for [`Crawler`], starting from a 250 ms delay and a queue of 64.
pub struct CrawlerBuilder {
    /// A `Duration` indicating the delay between page fetches.
    delay: Duration,

    /// A `usize` indicating how many records may wait for the repository.
    processing_queue_capacity: usize,
}

impl Default for CrawlerBuilder {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(250),
            processing_queue_capacity: 64,
        }
    }
}

impl CrawlerBuilder {
    /// Creates a builder with the default delay and queue capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pause between consecutive page fetches.
    ///
    /// # Arguments
    ///
    /// * `delay` - The duration to sleep before every page after the first.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the capacity of the channel between scraping and persistence.
    ///
    /// # Arguments
    ///
    /// * `processing_queue_capacity` - The number of records buffered ahead
    ///   of the repository.
    pub fn processing_queue_capacity(mut self, processing_queue_capacity: usize) -> Self {
        self.processing_queue_capacity = processing_queue_capacity;
        self
    }

    /// Builds the `Crawler` with the configured settings.
    pub fn build(self) -> Crawler {
        Crawler::new(self.delay, self.processing_queue_capacity)
    }
}
