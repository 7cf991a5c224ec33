use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid CSS selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("Page fetcher unavailable: {0}")]
    Fetch(#[from] FetchError),

    #[error("Sink write failed: {0}")]
    Sink(String),

    #[error("Browser session failed: {0}")]
    Browser(String),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),
}

pub type Result<T> = std::result::Result<T, ScraperError>;

/// Failures reported by a page fetcher.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// One page could not be loaded; the run carries on with zero events for it.
    #[error("failed to fetch {url}: {message}")]
    Page { url: String, message: String },

    /// The fetcher itself is unusable; the run must stop.
    #[error("fetcher unavailable: {0}")]
    Unavailable(String),
}

impl FetchError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::Unavailable(_))
    }
}

/// Failures inside a geocoding backend. Never surfaces past the geocode provider.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeocodeError {
    #[error("geocoding service unavailable: {0}")]
    Unavailable(String),

    #[error("geocoding request rejected: {0}")]
    Rejected(String),

    #[error("malformed geocoding response: {0}")]
    Malformed(String),
}

impl GeocodeError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, GeocodeError::Unavailable(_))
    }
}
