//! URL handling: absolutising scraped hrefs, canonical mod links, record ids
//! and the listing/search endpoints.

use std::fmt;

use url::Url;

/// Query parameter that marks an "update" variant of a mod link.
const UPDATE_PARAM: &str = "update";

/// Resolves a scraped href against the site root. Empty hrefs are absent.
pub fn absolutize(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    match base.join(href) {
        Ok(url) => Some(url.to_string()),
        Err(err) => {
            log::warn!("unresolvable link {:?}: {}", href, err);
            None
        }
    }
}

/// Drops the `update` query parameter (and the fragment), so that every
/// variant of a mod's detail link collapses to one cache key and one
/// stored `mod_link`.
pub fn canonical_mod_link(link: &str) -> String {
    let Ok(mut url) = Url::parse(link) else {
        return link.to_string();
    };
    url.set_fragment(None);

    if url.query_pairs().any(|(key, _)| key == UPDATE_PARAM) {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != UPDATE_PARAM)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }
    url.to_string()
}

/// Record id: the trailing numeric segment of the link's path, e.g.
/// `resources/fast-car.12345/` -> `12345`.
pub fn mod_id(link: &str) -> Option<u64> {
    let url = Url::parse(link).ok()?;
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let tail = segment.rsplit('.').next()?;
    if tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    tail.parse().ok()
}

/// `<mod link>/<history_path>`.
pub fn history_url(mod_link: &str, history_path: &str) -> String {
    format!(
        "{}/{}",
        mod_link.trim_end_matches('/'),
        history_path.trim_start_matches('/')
    )
}

/// Sort orders understood by the listing and search endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Last updated; the site default.
    #[default]
    Date,
    /// Submission date.
    ResourceDate,
    RatingWeighted,
    DownloadCount,
    Title,
}

impl Order {
    pub const ALL: [Order; 5] = [
        Order::Date,
        Order::ResourceDate,
        Order::RatingWeighted,
        Order::DownloadCount,
        Order::Title,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::ResourceDate => "resource_date",
            Self::RatingWeighted => "rating_weighted",
            Self::DownloadCount => "download_count",
            Self::Title => "title",
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for Order {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|order| order.key() == s)
            .ok_or_else(|| format!("unknown order: {s}"))
    }
}

/// `resources/?page=N[&order=KEY]`.
pub fn listing_url(base: &Url, page: u32, order: Order) -> Url {
    let mut url = base.join("resources/").unwrap_or_else(|_| base.clone());
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("page", &page.to_string());
        if order != Order::Date {
            query.append_pair("order", order.key());
        }
    }
    url
}

/// `search/search?q=…&t=resource_update&o=date[&c[title_only]=1]&page=N`.
pub fn search_url(base: &Url, query: &str, page: u32, title_only: bool) -> Url {
    let mut url = base.join("search/search").unwrap_or_else(|_| base.clone());
    {
        let mut pairs = url.query_pairs_mut();
        pairs
            .append_pair("q", query)
            .append_pair("t", "resource_update")
            .append_pair("o", "date");
        if title_only {
            pairs.append_pair("c[title_only]", "1");
        }
        pairs.append_pair("page", &page.to_string());
    }
    url
}
