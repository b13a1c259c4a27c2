use url::Url;

use crate::{
    document::Document,
    error::NormalizationError,
    extract::{tables::DETAIL_PAGE, Field},
    FromHtml,
};

/// Metadata read from a mod's detail page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailPage {
    pub download_link: Option<String>,
    pub download_count: Option<u64>,
    pub rating: Option<f64>,
    pub rating_count: Option<u64>,
    pub last_updated: Option<String>,
    pub issues: Vec<NormalizationError>,
}

impl FromHtml for DetailPage {
    fn from_html(html: &str, base: &Url) -> Self {
        let document = Document::parse(html);
        let ex = DETAIL_PAGE.apply(document.root(), base);
        Self {
            download_link: ex.text(Field::DownloadLink),
            download_count: ex.count(Field::DownloadCount),
            rating: ex.decimal(Field::Rating),
            rating_count: ex.count(Field::RatingCount),
            last_updated: ex.text(Field::LastUpdated),
            issues: ex.into_issues(),
        }
    }
}
