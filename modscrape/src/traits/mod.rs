mod from_html;
pub use from_html::FromHtml;

mod spider;
pub use spider::Spider;
