use scraper::{ElementRef, Html, Selector};

use crate::app::ports::FieldExtractor;
use crate::config::{FieldSelectors, SourceSelectors};
use crate::error::{Result, ScraperError};
use crate::types::RawEventFields;

/// CSS-selector driven extractor built on the `scraper` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SelectorExtractor;

impl SelectorExtractor {
    pub fn new() -> Self {
        Self
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ScraperError::Selector {
        selector: selector.to_string(),
        message: format!("{e:?}"),
    })
}

fn parse_optional(selector: &Option<String>) -> Result<Option<Selector>> {
    selector.as_deref().map(parse_selector).transpose()
}

/// Compiled form of [`FieldSelectors`].
struct CompiledFields {
    title: Option<Selector>,
    description: Option<Selector>,
    date: Option<Selector>,
    location: Option<Selector>,
    price: Option<Selector>,
    image_url: Option<Selector>,
    organizer_name: Option<Selector>,
    organizer_image_url: Option<Selector>,
    event_url: Option<Selector>,
    tags: Option<Selector>,
}

impl CompiledFields {
    fn compile(fields: &FieldSelectors) -> Result<Self> {
        Ok(Self {
            title: parse_optional(&fields.title)?,
            description: parse_optional(&fields.description)?,
            date: parse_optional(&fields.date)?,
            location: parse_optional(&fields.location)?,
            price: parse_optional(&fields.price)?,
            image_url: parse_optional(&fields.image_url)?,
            organizer_name: parse_optional(&fields.organizer_name)?,
            organizer_image_url: parse_optional(&fields.organizer_image_url)?,
            event_url: parse_optional(&fields.event_url)?,
            tags: parse_optional(&fields.tags)?,
        })
    }

    /// Pull every configured field out of `scope`. `link_fallback` finds an
    /// event URL when no selector names one.
    fn extract(&self, scope: ElementRef<'_>, link_fallback: Option<&Selector>) -> RawEventFields {
        let event_url = match &self.event_url {
            Some(sel) => first_attr(scope, sel, &["href"]),
            None => link_fallback.and_then(|sel| first_attr(scope, sel, &["href"])),
        };

        RawEventFields {
            title: self.title.as_ref().and_then(|s| first_text(scope, s)),
            description: self.description.as_ref().and_then(|s| first_text(scope, s)),
            date: self.date.as_ref().and_then(|s| first_text(scope, s)),
            location: self.location.as_ref().and_then(|s| first_text(scope, s)),
            price: self.price.as_ref().and_then(|s| first_text(scope, s)),
            image_url: self
                .image_url
                .as_ref()
                .and_then(|s| first_attr(scope, s, &["src", "href", "data-src"])),
            organizer_name: self.organizer_name.as_ref().and_then(|s| first_text(scope, s)),
            organizer_image_url: self
                .organizer_image_url
                .as_ref()
                .and_then(|s| first_attr(scope, s, &["src", "href", "data-src"])),
            event_url,
            tags: self
                .tags
                .as_ref()
                .map(|s| scope.select(s).filter_map(element_text).collect())
                .unwrap_or_default(),
        }
    }
}

fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<String>();
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope.select(selector).find_map(element_text)
}

/// First non-empty attribute among `attrs` on the first matching element.
/// `href` also matches namespaced `xlink:href` since lookup is by local name.
fn first_attr(scope: ElementRef<'_>, selector: &Selector, attrs: &[&str]) -> Option<String> {
    let element = scope.select(selector).next()?;
    attrs
        .iter()
        .filter_map(|name| element.value().attr(name))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

impl FieldExtractor for SelectorExtractor {
    fn extract_events(&self, html: &str, selectors: &SourceSelectors) -> Result<Vec<RawEventFields>> {
        let document = Html::parse_document(html);
        let event_selector = parse_selector(&selectors.event)?;
        let fields = CompiledFields::compile(&selectors.listing)?;
        let link_fallback = parse_selector("a[href]")?;

        let events: Vec<RawEventFields> = document
            .select(&event_selector)
            .map(|card| fields.extract(card, Some(&link_fallback)))
            .collect();

        tracing::debug!(
            "Found {} event elements with selector '{}'",
            events.len(),
            selectors.event
        );
        Ok(events)
    }

    fn extract_detail(&self, html: &str, fields: &FieldSelectors) -> Result<RawEventFields> {
        let document = Html::parse_document(html);
        let fields = CompiledFields::compile(fields)?;
        Ok(fields.extract(document.root_element(), None))
    }

    fn next_page(&self, html: &str, selector: &str) -> Result<Option<String>> {
        let document = Html::parse_document(html);
        let selector = parse_selector(selector)?;
        Ok(first_attr(document.root_element(), &selector, &["href"]))
    }
}
