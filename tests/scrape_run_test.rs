use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

use event_scraper::app::ports::{PageFetcher, ReverseAddress, StructuredPlace};
use event_scraper::app::ScrapeRunUseCase;
use event_scraper::config::Config;
use event_scraper::error::{FetchError, GeocodeError, ScraperError};
use event_scraper::geocoding::{GeocodeBackend, GeocodeResult, RetryPolicy, RetryingGeocoder};
use event_scraper::infra::{HttpPageFetcher, JsonFileSink, SelectorExtractor};
use event_scraper::pipeline::RecordAssembler;
use event_scraper::types::Coordinates;

const CONFIG: &str = r#"
    [assembler]
    reference_year = 2024

    [[sources]]
    name = "Facebook"
    kind = "facebook"
    url = "https://www.facebook.com/events/explore/montreal-quebec/"

    [sources.selectors]
    event = "div.event-card"

    [sources.selectors.listing]
    title = "span.title"
    date = "span.date"
    location = "span.location"
    tags = "a.tag"
    image_url = "img"
"#;

const LISTING: &str = r##"
<html><body>
  <div class="event-card">
    <a href="/events/1001/"><span class="title">Jazz Night</span></a>
    <span class="date">Saturday, March 2, 2024</span>
    <span class="location">Upstairs Jazz Bar, 1254 Mackay St</span>
    <a class="tag">#jazz</a><a class="tag">#live</a>
    <img src="/images/jazz.jpg">
  </div>
  <div class="event-card">
    <a href="/events/1002/"><span class="title">JAZZ NIGHT!!</span></a>
    <span class="date">Saturday, March 2, 2024</span>
  </div>
  <div class="event-card">
    <a href="/events/1003/"><span class="title"></span></a>
  </div>
</body></html>
"##;

struct FixtureFetcher {
    pages: HashMap<String, String>,
    unavailable: bool,
}

impl FixtureFetcher {
    fn listing() -> Self {
        let mut pages = HashMap::new();
        pages.insert(
            "https://www.facebook.com/events/explore/montreal-quebec/".to_string(),
            LISTING.to_string(),
        );
        Self {
            pages,
            unavailable: false,
        }
    }
}

#[async_trait]
impl PageFetcher for FixtureFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        if self.unavailable {
            return Err(FetchError::Unavailable("browser session closed".into()));
        }
        self.pages.get(url).cloned().ok_or_else(|| FetchError::Page {
            url: url.to_string(),
            message: "not found".into(),
        })
    }
}

/// Backend whose forward lookups answer with `forward`, or fail when it is an error.
struct CountingBackend {
    forward: GeocodeResult<Coordinates>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl GeocodeBackend for CountingBackend {
    async fn forward(&self, _text: &str) -> GeocodeResult<Coordinates> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.forward.clone()
    }

    async fn reverse(&self, _coordinates: Coordinates) -> GeocodeResult<ReverseAddress> {
        Ok(None)
    }

    async fn structured_lookup(&self, _text: &str) -> GeocodeResult<StructuredPlace> {
        Ok(None)
    }
}

fn use_case(
    config: &Config,
    fetcher: impl PageFetcher + 'static,
    backend: CountingBackend,
    sink: JsonFileSink,
) -> Result<ScrapeRunUseCase> {
    let geocoder = RetryingGeocoder::new(backend, RetryPolicy::new(3, Duration::ZERO));
    Ok(ScrapeRunUseCase::new(
        Box::new(fetcher),
        Box::new(SelectorExtractor::new()),
        Box::new(geocoder),
        Box::new(sink),
        RecordAssembler::new(config.assembler_config(2024)?),
    ))
}

fn read_events(path: &std::path::Path) -> Result<Vec<serde_json::Value>> {
    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    Ok(json.as_array().cloned().unwrap_or_default())
}

#[tokio::test]
async fn test_run_writes_geocoded_events() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("out/events.json");
    let config = Config::from_toml(CONFIG)?;
    let calls = Arc::new(AtomicUsize::new(0));
    let backend = CountingBackend {
        forward: Ok(Some(Coordinates::new(45.5, -73.6))),
        calls: calls.clone(),
    };

    let run = use_case(&config, FixtureFetcher::listing(), backend, JsonFileSink::new(&path))?;
    let summary = run.execute(&config.select_sources(None)).await?;

    assert_eq!(summary.total_events, 1);
    assert_eq!(summary.sources[0].duplicates, 1);
    assert_eq!(summary.sources[0].untitled, 1);
    assert_eq!(summary.output.as_deref(), Some(path.to_str().unwrap()));

    let events = read_events(&path)?;
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event["title"], "Jazz Night");
    assert_eq!(event["source"], "Facebook");
    assert_eq!(event["event_url"], "https://www.facebook.com/events/1001/");
    assert_eq!(event["image_url"], "https://www.facebook.com/images/jazz.jpg");
    assert_eq!(event["tags"], serde_json::json!(["jazz", "live"]));
    assert_eq!(event["date"]["timestamp"], "2024-03-02T00:00:00");
    assert_eq!(event["location"]["display_name"], "Upstairs Jazz Bar");
    assert_eq!(event["location"]["street_address"], "1254 Mackay St");
    assert_eq!(event["location"]["latitude"], 45.5);
    assert_eq!(event["location"]["longitude"], -73.6);
    assert_eq!(
        event["location"]["map_url"],
        "https://www.google.com/maps/search/?api=1&query=45.5,-73.6"
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_unavailable_geocoder_falls_back_to_defaults() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("events.json");
    let config = Config::from_toml(CONFIG)?;
    let calls = Arc::new(AtomicUsize::new(0));
    let backend = CountingBackend {
        forward: Err(GeocodeError::Unavailable("503 Service Unavailable".into())),
        calls: calls.clone(),
    };

    let run = use_case(&config, FixtureFetcher::listing(), backend, JsonFileSink::new(&path))?;
    run.execute(&config.select_sources(None)).await?;

    // one located event, three attempts
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let events = read_events(&path)?;
    let location = &events[0]["location"];
    assert!(location["latitude"].is_null());
    assert!(location["longitude"].is_null());
    assert!(location["map_url"].is_null());
    assert_eq!(location["city"], "Montreal");
    assert_eq!(location["country_code"], "ca");
    Ok(())
}

#[tokio::test]
async fn test_unavailable_fetcher_writes_nothing() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("events.json");
    let config = Config::from_toml(CONFIG)?;
    let fetcher = FixtureFetcher {
        unavailable: true,
        ..FixtureFetcher::listing()
    };
    let backend = CountingBackend {
        forward: Ok(None),
        calls: Arc::new(AtomicUsize::new(0)),
    };

    let run = use_case(&config, fetcher, backend, JsonFileSink::new(&path))?;
    let result = run.execute(&config.select_sources(None)).await;

    assert!(matches!(result, Err(ScraperError::Fetch(_))));
    assert!(!path.exists());
    Ok(())
}

#[tokio::test]
async fn test_unreachable_host_keeps_previous_output() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("events.json");
    std::fs::write(&path, r#"[{"title":"Yesterday's Show"}]"#)?;

    let config = Config::from_toml(&CONFIG.replace(
        "https://www.facebook.com/events/explore/montreal-quebec/",
        "http://127.0.0.1:1/events/",
    ))?;
    let fetcher = HttpPageFetcher::new("event_scraper-test", Duration::from_secs(5))?;
    let backend = CountingBackend {
        forward: Ok(None),
        calls: Arc::new(AtomicUsize::new(0)),
    };

    let run = use_case(&config, fetcher, backend, JsonFileSink::new(&path))?;
    let result = run.execute(&config.select_sources(None)).await;

    assert!(matches!(
        result,
        Err(ScraperError::Fetch(FetchError::Unavailable(_)))
    ));
    assert_eq!(
        std::fs::read_to_string(&path)?,
        r#"[{"title":"Yesterday's Show"}]"#
    );
    Ok(())
}

#[tokio::test]
async fn test_missing_listing_page_writes_empty_array() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("events.json");
    let config = Config::from_toml(CONFIG)?;
    let fetcher = FixtureFetcher {
        pages: HashMap::new(),
        unavailable: false,
    };
    let backend = CountingBackend {
        forward: Ok(None),
        calls: Arc::new(AtomicUsize::new(0)),
    };

    let run = use_case(&config, fetcher, backend, JsonFileSink::new(&path))?;
    let summary = run.execute(&config.select_sources(None)).await?;

    assert_eq!(summary.sources[0].pages_failed, 1);
    assert!(read_events(&path)?.is_empty());
    Ok(())
}
