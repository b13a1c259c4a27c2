use url::Url;

/// Builds a value from a whole fetched document.
///
/// Extraction never fails: absent fields are `None` and malformed ones are
/// reported inside the value, so the result can be cached as-is.
pub trait FromHtml: Sized {
    fn from_html(html: &str, base: &Url) -> Self;
}
