//! Declarative per-field extraction.
//!
//! An [`ExtractionTable`] is a list of [`FieldRule`]s, one per output field:
//! where to look, which attribute to read (text when none), and how to
//! transform the raw string. Rules run independently against a node and the
//! results land in an [`Extraction`], so a missing or malformed field never
//! affects its siblings.

pub mod normalize;
pub mod tables;

use std::collections::HashMap;

use scraper::Selector;
use url::Url;

use crate::{document::Node, error::NormalizationError, links};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Icon,
    Avatar,
    Title,
    Tag,
    ModLink,
    AuthorName,
    AuthorLink,
    Description,
    Rating,
    RatingCount,
    DownloadCount,
    SubscriptionCount,
    LastUpdated,
    DownloadLink,
    CurrentVersion,
    ContentType,
    Version,
    State,
    ReleaseDate,
    DownloadUrl,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Icon => "icon_url",
            Self::Avatar => "avatar_url",
            Self::Title => "title",
            Self::Tag => "tag",
            Self::ModLink => "mod_link",
            Self::AuthorName => "author_name",
            Self::AuthorLink => "author_profile_url",
            Self::Description => "description",
            Self::Rating => "rating",
            Self::RatingCount => "rating_count",
            Self::DownloadCount => "download_count",
            Self::SubscriptionCount => "subscription_count",
            Self::LastUpdated => "last_updated",
            Self::DownloadLink => "download_link",
            Self::CurrentVersion => "current_version",
            Self::ContentType => "content_type",
            Self::Version => "version",
            Self::State => "state",
            Self::ReleaseDate => "release_date",
            Self::DownloadUrl => "download_url",
        }
    }
}

/// Where a rule finds its node, relative to the node it is applied to.
pub enum Locate {
    /// First descendant matching the selector.
    Css(Selector),
    /// The node itself.
    Itself,
    /// The `dd` of the first `pairs` element whose `dt` text equals `label`.
    Labelled { pairs: Selector, label: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Text,
    Count,
    Decimal,
    AbsoluteUrl,
}

pub struct FieldRule {
    field: Field,
    locate: Locate,
    attr: Option<&'static str>,
    transform: Transform,
}

impl FieldRule {
    pub fn new(field: Field, locate: Locate) -> Self {
        Self {
            field,
            locate,
            attr: None,
            transform: Transform::Text,
        }
    }

    pub fn attr(mut self, attr: &'static str) -> Self {
        self.attr = Some(attr);
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn field(&self) -> Field {
        self.field
    }

    fn raw<'a>(&self, node: Node<'a>) -> Option<String> {
        let target = match &self.locate {
            Locate::Css(selector) => node.find(selector)?,
            Locate::Itself => node,
            Locate::Labelled { pairs, label } => labelled(node, pairs, label)?,
        };
        match self.attr {
            Some(attr) => target.attr(attr),
            None => Some(target.text()),
        }
    }

    fn apply(&self, node: Node<'_>, base: &Url) -> Option<Result<Value, NormalizationError>> {
        let raw = self.raw(node)?;
        let field = self.field.name();
        let value = match self.transform {
            Transform::Text => Ok(Value::Text(raw)),
            Transform::Count => normalize::count(field, &raw).map(Value::Count),
            Transform::Decimal => normalize::decimal(field, &raw).map(Value::Decimal),
            Transform::AbsoluteUrl => Ok(Value::Text(links::absolutize(base, &raw)?)),
        };
        Some(value)
    }
}

fn labelled<'a>(node: Node<'a>, pairs: &Selector, label: &str) -> Option<Node<'a>> {
    node.find_all(pairs).into_iter().find_map(|pair| {
        let dt = pair.find(&tables::DT_SELECTOR)?;
        if dt.text() == label {
            pair.find(&tables::DD_SELECTOR)
        } else {
            None
        }
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Count(u64),
    Decimal(f64),
}

pub struct ExtractionTable {
    rules: Vec<FieldRule>,
}

impl ExtractionTable {
    pub fn new(rules: Vec<FieldRule>) -> Self {
        Self { rules }
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.rules.iter().map(FieldRule::field)
    }

    pub fn apply(&self, node: Node<'_>, base: &Url) -> Extraction {
        let mut extraction = Extraction::default();
        for rule in &self.rules {
            // An earlier rule for the same field wins; later ones are fallbacks.
            if extraction.values.contains_key(&rule.field) {
                continue;
            }
            match rule.apply(node, base) {
                Some(Ok(value)) => {
                    extraction.values.insert(rule.field, value);
                }
                Some(Err(err)) => {
                    log::warn!("{}", err);
                    extraction.issues.push(err);
                }
                None => {}
            }
        }
        extraction
    }
}

/// Values extracted from one node. Absent fields read as `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    values: HashMap<Field, Value>,
    issues: Vec<NormalizationError>,
}

impl Extraction {
    pub fn text(&self, field: Field) -> Option<String> {
        match self.values.get(&field)? {
            Value::Text(text) => Some(text.clone()),
            _ => None,
        }
    }

    pub fn count(&self, field: Field) -> Option<u64> {
        match self.values.get(&field)? {
            Value::Count(count) => Some(*count),
            _ => None,
        }
    }

    pub fn decimal(&self, field: Field) -> Option<f64> {
        match self.values.get(&field)? {
            Value::Decimal(value) => Some(*value),
            _ => None,
        }
    }

    pub fn issues(&self) -> &[NormalizationError] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<NormalizationError> {
        self.issues
    }
}
