use std::time::Duration;

use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.beamng.com/";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// How per-item secondary fetches are scheduled within one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One item, and one fetch, at a time.
    Sequential,
    /// At most `limit` secondary fetches in flight.
    Concurrent { limit: usize },
}

impl ExecutionMode {
    pub fn limit(&self) -> usize {
        match self {
            Self::Sequential => 1,
            Self::Concurrent { limit } => (*limit).max(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    base_url: Url,
    user_agent: String,
    request_timeout: Duration,
    page_deadline: Duration,
    mode: ExecutionMode,
    cache_capacity: usize,
    history_path: String,
    fetch_history: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(10),
            page_deadline: Duration::from_secs(120),
            mode: ExecutionMode::Concurrent { limit: 8 },
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            history_path: "historyImproved".to_string(),
            fetch_history: true,
        }
    }
}

impl ScraperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_page_deadline(mut self, page_deadline: Duration) -> Self {
        self.page_deadline = page_deadline;
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_cache_capacity(mut self, cache_capacity: usize) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }

    pub fn with_history_path(mut self, history_path: impl Into<String>) -> Self {
        self.history_path = history_path.into();
        self
    }

    pub fn with_fetch_history(mut self, fetch_history: bool) -> Self {
        self.fetch_history = fetch_history;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn page_deadline(&self) -> Duration {
        self.page_deadline
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity
    }

    pub fn history_path(&self) -> &str {
        &self.history_path
    }

    pub fn fetch_history(&self) -> bool {
        self.fetch_history
    }
}
