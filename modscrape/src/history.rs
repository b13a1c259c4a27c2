use url::Url;

use crate::{
    document::Document,
    error::NormalizationError,
    extract::{
        tables::{HISTORY_HEADER_CELL_SELECTOR, HISTORY_ROW, HISTORY_ROW_SELECTOR},
        Field,
    },
    models::VersionEntry,
    FromHtml,
};

/// The version history table of a mod, in source order (newest first).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VersionHistory {
    pub entries: Vec<VersionEntry>,
    pub issues: Vec<NormalizationError>,
}

impl VersionHistory {
    /// Every data row yields an entry, even one with no extractable field.
    /// Heading rows (`th` cells) are not data.
    pub fn extract(document: &Document, base: &Url) -> Self {
        let mut history = Self::default();
        for row in document.find_all(&HISTORY_ROW_SELECTOR) {
            if row.find(&HISTORY_HEADER_CELL_SELECTOR).is_some() {
                continue;
            }
            let ex = HISTORY_ROW.apply(row, base);
            history.entries.push(VersionEntry {
                version: ex.text(Field::Version),
                state: ex.text(Field::State),
                release_date: ex.text(Field::ReleaseDate),
                download_count: ex.count(Field::DownloadCount),
                download_url: ex.text(Field::DownloadUrl),
            });
            history.issues.extend(ex.into_issues());
        }
        history
    }
}

impl FromHtml for VersionHistory {
    fn from_html(html: &str, base: &Url) -> Self {
        Self::extract(&Document::parse(html), base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HISTORY: &str = include_str!("../tests/fixtures/history.html");

    fn base() -> Url {
        Url::parse("https://www.beamng.com/").unwrap()
    }

    #[test]
    fn extracts_rows_in_order() {
        let history = VersionHistory::from_html(HISTORY, &base());
        assert_eq!(history.entries.len(), 3);

        let newest = &history.entries[0];
        assert_eq!(newest.version.as_deref(), Some("1.2"));
        assert_eq!(newest.state.as_deref(), Some("Approved"));
        assert_eq!(newest.release_date.as_deref(), Some("Mar 3, 2024"));
        assert_eq!(newest.download_count, Some(1234));
        assert_eq!(
            newest.download_url.as_deref(),
            Some("https://www.beamng.com/resources/fast-car.12345/download?version=3")
        );
        assert_eq!(history.entries[1].version.as_deref(), Some("1.1"));
    }

    #[test]
    fn empty_row_keeps_its_slot() {
        let history = VersionHistory::from_html(HISTORY, &base());
        assert_eq!(history.entries[2], VersionEntry::default());
    }

    #[test]
    fn malformed_count_degrades_to_none() {
        let history = VersionHistory::from_html(HISTORY, &base());
        assert_eq!(history.entries[1].download_count, None);
        assert_eq!(history.issues.len(), 1);
        assert_eq!(history.issues[0].field, "download_count");
    }

    #[test]
    fn missing_table_is_empty_history() {
        let history = VersionHistory::from_html("<html><body>gone</body></html>", &base());
        assert!(history.entries.is_empty());
        assert!(history.issues.is_empty());
    }
}
