// Concrete adapters behind the app ports

pub mod browser_fetcher;
pub mod geocode_backend;
pub mod http_client;
pub mod json_sink;
pub mod nominatim_client;
pub mod places_client;
pub mod selector_extractor;

pub use browser_fetcher::BrowserPageFetcher;
pub use geocode_backend::HttpGeocodeBackend;
pub use http_client::HttpPageFetcher;
pub use json_sink::JsonFileSink;
pub use selector_extractor::SelectorExtractor;
