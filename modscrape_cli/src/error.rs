use modscrape::{FetchError, RepositoryError, ScrapeError};

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Scrape Error: {0}")]
    Scrape(#[from] ScrapeError),

    #[error("Client Error: {0}")]
    Client(#[from] FetchError),

    #[error("Repository Error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}
