/// Failure to retrieve a resource over HTTP.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network Error: {0}")]
    Network(String),

    #[error("Timeout fetching: {0}")]
    Timeout(String),

    #[error("HTTP {status} for: {url}")]
    Status { status: u16, url: String },
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(url.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Numeric text that does not match the expected pattern.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to normalize field '{field}', found value: {value:?}")]
pub struct NormalizationError {
    pub field: &'static str,
    pub value: String,
}

#[derive(thiserror::Error, Debug)]
pub enum RepositoryError {
    #[error("Sqlite Error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("repository connection lock poisoned")]
    Poisoned,
}

/// Terminal failure of a whole page scrape.
#[derive(thiserror::Error, Debug, Clone)]
pub enum ScrapeError {
    #[error("Page fetch failed: {0}")]
    Fetch(#[from] FetchError),
}
