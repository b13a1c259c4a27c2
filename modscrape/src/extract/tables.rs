//! Extraction tables for each document variant the scrapers read.
//!
//! Markup changes on the marketplace should only ever need edits here.

use std::sync::LazyLock;

use scraper::Selector;

use super::{ExtractionTable, Field, FieldRule, Locate, Transform};

macro_rules! selector {
    ($name:ident, $css:expr) => {
        pub(crate) static $name: LazyLock<Selector> =
            LazyLock::new(|| Selector::parse($css).expect("static selector"));
    };
}

macro_rules! table {
    ($name:ident, [$($rule:expr),* $(,)?]) => {
        pub static $name: LazyLock<ExtractionTable> =
            LazyLock::new(|| ExtractionTable::new(vec![$($rule),*]));
    };
}

fn css(selector: &str) -> Locate {
    Locate::Css(Selector::parse(selector).expect("static selector"))
}

fn labelled(pairs: &str, label: &'static str) -> Locate {
    Locate::Labelled {
        pairs: Selector::parse(pairs).expect("static selector"),
        label,
    }
}

selector!(DT_SELECTOR, "dt");
selector!(DD_SELECTOR, "dd");

// Item enumeration.
selector!(LISTING_ITEM_SELECTOR, "li.resourceListItem");
selector!(SEARCH_ITEM_SELECTOR, "li.searchResult.resourceUpdate");
selector!(HISTORY_ROW_SELECTOR, "table.resourceHistory tr.dataRow");
selector!(HISTORY_HEADER_CELL_SELECTOR, "th");

// One `li.resourceListItem` on a listing page. The header carries two
// anchors: the tag (`a.prefixLink`) and the title + detail link.
table!(LISTING_ITEM, [
    FieldRule::new(Field::Icon, css(".listBlockInner a.resourceIcon img"))
        .attr("src")
        .transform(Transform::AbsoluteUrl),
    FieldRule::new(Field::Avatar, css(".listBlockInner a.avatar img"))
        .attr("src")
        .transform(Transform::AbsoluteUrl),
    FieldRule::new(Field::Tag, css("h3.title a.prefixLink")),
    FieldRule::new(Field::Title, css("h3.title a:not(.prefixLink)")),
    FieldRule::new(Field::ModLink, css("h3.title a:not(.prefixLink)"))
        .attr("href")
        .transform(Transform::AbsoluteUrl),
    FieldRule::new(Field::AuthorName, css(".resourceDetails a[href*='resources/authors/']")),
    FieldRule::new(Field::AuthorLink, css(".resourceDetails a[href*='resources/authors/']"))
        .attr("href")
        .transform(Transform::AbsoluteUrl),
    FieldRule::new(Field::Description, css("div.tagLine")),
    FieldRule::new(Field::Rating, css(".resourceStats span.ratings"))
        .attr("title")
        .transform(Transform::Decimal),
    FieldRule::new(Field::RatingCount, css(".resourceStats span.Hint"))
        .transform(Transform::Count),
    FieldRule::new(Field::DownloadCount, labelled(".resourceStats dl.resourceDownloads", "Downloads:"))
        .transform(Transform::Count),
    FieldRule::new(Field::SubscriptionCount, labelled(".resourceStats dl.resourceDownloads", "Subscriptions"))
        .transform(Transform::Count),
    FieldRule::new(Field::LastUpdated, css(".resourceStats dl.resourceUpdated abbr.DateTime")),
    FieldRule::new(Field::LastUpdated, css(".resourceStats dl.resourceUpdated span.DateTime"))
        .attr("title"),
]);

// One `li.searchResult` on a search page. The author lives in a data
// attribute on the item itself.
table!(SEARCH_ITEM, [
    FieldRule::new(Field::Icon, css("a.avatar img"))
        .attr("src")
        .transform(Transform::AbsoluteUrl),
    FieldRule::new(Field::ContentType, css("span.contentType")),
    FieldRule::new(Field::Title, css("h3.title a")),
    FieldRule::new(Field::ModLink, css("h3.title a"))
        .attr("href")
        .transform(Transform::AbsoluteUrl),
    FieldRule::new(Field::CurrentVersion, css("h3.title span.muted")),
    FieldRule::new(Field::Tag, css("h3.title span.prefix")),
    FieldRule::new(Field::Description, css("blockquote.snippet a")),
    FieldRule::new(Field::AuthorName, Locate::Itself).attr("data-author"),
]);

// A mod's detail page.
table!(DETAIL_PAGE, [
    FieldRule::new(Field::DownloadLink, css("ul.primaryLinks label.downloadButton a.inner[href*='download']"))
        .attr("href")
        .transform(Transform::AbsoluteUrl),
    FieldRule::new(Field::DownloadCount, css(".secondaryContent dl.downloadCount dd"))
        .transform(Transform::Count),
    FieldRule::new(Field::Rating, css(".secondaryContent span.ratings"))
        .attr("title")
        .transform(Transform::Decimal),
    FieldRule::new(Field::RatingCount, css(".secondaryContent span.Hint"))
        .transform(Transform::Count),
    FieldRule::new(Field::LastUpdated, css(".secondaryContent abbr.DateTime")),
    FieldRule::new(Field::LastUpdated, css(".secondaryContent span.DateTime")).attr("title"),
]);

// One `tr.dataRow` of the version history table.
table!(HISTORY_ROW, [
    FieldRule::new(Field::Version, css("td.version")),
    FieldRule::new(Field::State, css("td.state")),
    FieldRule::new(Field::ReleaseDate, css("td.releaseDate .DateTime")),
    FieldRule::new(Field::DownloadCount, css("td.downloads")).transform(Transform::Count),
    FieldRule::new(Field::DownloadUrl, css("td.dataOptions.download a.secondaryContent"))
        .attr("href")
        .transform(Transform::AbsoluteUrl),
]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_compile() {
        for table in [&LISTING_ITEM, &SEARCH_ITEM, &DETAIL_PAGE, &HISTORY_ROW] {
            assert!(table.fields().count() > 0);
        }
        let _ = (&*LISTING_ITEM_SELECTOR, &*SEARCH_ITEM_SELECTOR, &*HISTORY_ROW_SELECTOR);
    }

    #[test]
    fn listing_table_covers_record_fields() {
        let fields: Vec<Field> = LISTING_ITEM.fields().collect();
        for field in [
            Field::Icon,
            Field::Avatar,
            Field::Title,
            Field::Tag,
            Field::ModLink,
            Field::AuthorName,
            Field::AuthorLink,
            Field::Description,
            Field::Rating,
            Field::RatingCount,
            Field::DownloadCount,
            Field::SubscriptionCount,
            Field::LastUpdated,
        ] {
            assert!(fields.contains(&field), "missing {}", field.name());
        }
    }
}
