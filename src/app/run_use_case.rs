use metrics::{counter, histogram};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::app::ports::{FieldExtractor, GeocodeProvider, PageFetcher, Sink};
use crate::config::{FetcherKind, FieldSelectors, SourceConfig};
use crate::error::{FetchError, Result, ScraperError};
use crate::pipeline::{RecordAssembler, SeenTitles};
use crate::types::{CanonicalEvent, RawEventFields, SourceKind};

/// Per-source counts for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceSummary {
    pub name: String,
    pub source: Option<SourceKind>,
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub extracted: usize,
    pub untitled: usize,
    pub duplicates: usize,
    pub assembled: usize,
}

/// Result of a complete scrape run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub sources: Vec<SourceSummary>,
    pub total_events: usize,
    pub output: Option<String>,
}

/// Scrapes each configured source, assembles canonical events and writes them in one go.
pub struct ScrapeRunUseCase {
    fetcher: Box<dyn PageFetcher>,
    browser: Option<Box<dyn PageFetcher>>,
    extractor: Box<dyn FieldExtractor>,
    geocoder: Box<dyn GeocodeProvider>,
    sink: Box<dyn Sink>,
    assembler: RecordAssembler,
}

impl ScrapeRunUseCase {
    pub fn new(
        fetcher: Box<dyn PageFetcher>,
        extractor: Box<dyn FieldExtractor>,
        geocoder: Box<dyn GeocodeProvider>,
        sink: Box<dyn Sink>,
        assembler: RecordAssembler,
    ) -> Self {
        Self {
            fetcher,
            browser: None,
            extractor,
            geocoder,
            sink,
            assembler,
        }
    }

    /// Fetcher for sources configured with `fetcher = "browser"`.
    pub fn with_browser_fetcher(mut self, browser: Box<dyn PageFetcher>) -> Self {
        self.browser = Some(browser);
        self
    }

    fn fetcher_for(&self, source: &SourceConfig) -> Result<&dyn PageFetcher> {
        match source.fetcher {
            FetcherKind::Http => Ok(self.fetcher.as_ref()),
            FetcherKind::Browser => self.browser.as_deref().ok_or_else(|| {
                ScraperError::Config(format!(
                    "source '{}' needs a browser fetcher but none is configured",
                    source.name
                ))
            }),
        }
    }

    /// Run every source in order. Nothing is written unless every source completes.
    #[instrument(skip_all, fields(sources = sources.len()))]
    pub async fn execute(&self, sources: &[&SourceConfig]) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        let started = std::time::Instant::now();
        info!(%run_id, "🚀 Starting scrape run");
        counter!("scrape_runs_total").increment(1);

        let mut events = Vec::new();
        let mut summaries = Vec::with_capacity(sources.len());

        for source in sources {
            let (source_events, summary) = self.run_source(source).await?;
            events.extend(source_events);
            summaries.push(summary);
        }

        self.sink.write(&events).await?;

        histogram!("scrape_run_duration_seconds").record(started.elapsed().as_secs_f64());
        let summary = RunSummary {
            run_id,
            sources: summaries,
            total_events: events.len(),
            output: self.sink.location(),
        };
        info!(
            %run_id,
            total_events = summary.total_events,
            output = summary.output.as_deref().unwrap_or("-"),
            "✅ Scrape run finished"
        );
        Ok(summary)
    }

    #[instrument(skip_all, fields(source = %source.name))]
    async fn run_source(
        &self,
        source: &SourceConfig,
    ) -> Result<(Vec<CanonicalEvent>, SourceSummary)> {
        let mut summary = SourceSummary {
            name: source.name.clone(),
            source: source.source_kind(),
            ..SourceSummary::default()
        };

        let Some(kind) = summary.source else {
            warn!(kind = %source.kind, "Unknown source kind, skipping source");
            return Ok((Vec::new(), summary));
        };

        let fetcher = self.fetcher_for(source)?;
        let raw_events = self.collect_listing(fetcher, source, &mut summary).await?;
        summary.extracted = raw_events.len();
        info!("📡 Extracted {} raw events from {}", raw_events.len(), source.name);

        let mut seen = SeenTitles::new();
        let mut events = Vec::new();

        for mut raw in raw_events {
            if let (Some(detail), Some(url)) = (&source.selectors.detail, raw.event_url.clone()) {
                if let Some(fields) = self.fetch_detail(fetcher, &url, detail).await? {
                    raw.merge_from(fields);
                }
            }

            let title = match raw.title.as_deref().map(str::trim) {
                Some(title) if !title.is_empty() => title.to_string(),
                _ => {
                    debug!("Skipping event without title");
                    summary.untitled += 1;
                    counter!("events_untitled_total", "source" => kind.label()).increment(1);
                    continue;
                }
            };

            if self.assembler.is_duplicate(&title, &seen) {
                debug!(title = %title, "Skipping duplicate event");
                summary.duplicates += 1;
                counter!("events_duplicate_total", "source" => kind.label()).increment(1);
                continue;
            }

            let event = self.assembler.assemble(&raw, kind, self.geocoder.as_ref()).await;
            seen.insert(title);
            events.push(event);
        }

        summary.assembled = events.len();
        counter!("events_assembled_total", "source" => kind.label()).increment(events.len() as u64);
        info!(
            "✅ {}: {} assembled ({} duplicates, {} untitled)",
            source.name, summary.assembled, summary.duplicates, summary.untitled
        );
        Ok((events, summary))
    }

    /// Listing pages, following the next-page link up to `max_pages`.
    async fn collect_listing(
        &self,
        fetcher: &dyn PageFetcher,
        source: &SourceConfig,
        summary: &mut SourceSummary,
    ) -> Result<Vec<RawEventFields>> {
        let mut raw_events = Vec::new();
        let mut next_url = Some(source.url.clone());

        while let Some(page_url) = next_url.take() {
            if summary.pages_fetched >= source.max_pages.max(1) {
                break;
            }

            let html = match fetcher.fetch(&page_url).await {
                Ok(html) => html,
                Err(e) => {
                    Self::page_failure(e, summary)?;
                    break;
                }
            };
            summary.pages_fetched += 1;
            counter!("scrape_pages_fetched_total", "source" => source.name.clone()).increment(1);

            let mut page_events = self.extractor.extract_events(&html, &source.selectors)?;
            debug!(url = %page_url, events = page_events.len(), "extracted listing page");
            for event in &mut page_events {
                resolve_links(event, &page_url);
            }
            raw_events.extend(page_events);

            if let Some(selector) = &source.next_page_selector {
                next_url = self
                    .extractor
                    .next_page(&html, selector)?
                    .map(|href| resolve_url(&page_url, &href))
                    .filter(|next| next != &page_url);
            }
        }

        Ok(raw_events)
    }

    /// Detail-page fields for one event. A page failure leaves the card as-is.
    async fn fetch_detail(
        &self,
        fetcher: &dyn PageFetcher,
        url: &str,
        fields: &FieldSelectors,
    ) -> Result<Option<RawEventFields>> {
        match fetcher.fetch(url).await {
            Ok(html) => {
                let mut detail = self.extractor.extract_detail(&html, fields)?;
                resolve_links(&mut detail, url);
                Ok(Some(detail))
            }
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(e) => {
                warn!("Failed to load event page: {}", e);
                counter!("scrape_page_failures_total").increment(1);
                Ok(None)
            }
        }
    }

    fn page_failure(e: FetchError, summary: &mut SourceSummary) -> Result<()> {
        if e.is_fatal() {
            return Err(e.into());
        }
        warn!("Failed to load listing page, treating it as empty: {}", e);
        summary.pages_failed += 1;
        counter!("scrape_page_failures_total").increment(1);
        Ok(())
    }
}

/// Make the event and image links in `event` absolute against the page they were read from.
fn resolve_links(event: &mut RawEventFields, page_url: &str) {
    for link in [
        &mut event.event_url,
        &mut event.image_url,
        &mut event.organizer_image_url,
    ] {
        if let Some(href) = link.take() {
            *link = Some(resolve_url(page_url, &href));
        }
    }
}

/// Resolve `href` against the page it came from; unparseable input is kept as-is.
fn resolve_url(base: &str, href: &str) -> String {
    reqwest::Url::parse(base)
        .and_then(|base| base.join(href))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| href.to_string())
}
