use serde::{Deserialize, Serialize};

/// How an absent text field is rendered for humans. Absence itself is `None`.
pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub name: Option<String>,
    pub profile_url: Option<String>,
}

/// One released version from a mod's history table, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub version: Option<String>,
    pub state: Option<String>,
    pub release_date: Option<String>,
    pub download_count: Option<u64>,
    pub download_url: Option<String>,
}

/// One catalog entry, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModRecord {
    pub id: u64,
    pub title: Option<String>,
    pub tag: Option<String>,
    pub description: Option<String>,
    pub icon_url: Option<String>,
    pub avatar_url: Option<String>,
    pub mod_link: String,
    pub download_link: Option<String>,
    pub author: Author,
    pub rating: Option<f64>,
    pub rating_count: Option<u64>,
    pub download_count: Option<u64>,
    pub subscription_count: Option<u64>,
    pub last_updated: Option<String>,
    pub current_version: Option<String>,
    pub content_type: Option<String>,
    pub versions: Vec<VersionEntry>,
}

impl ModRecord {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(UNKNOWN)
    }
}
