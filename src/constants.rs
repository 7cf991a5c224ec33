/// Fallback city when no geocoder resolves one. This deployment covers one metro area.
pub const DEFAULT_CITY: &str = "Montreal";
/// Fallback ISO country code paired with [`DEFAULT_CITY`].
pub const DEFAULT_COUNTRY_CODE: &str = "ca";

/// Fuzzy title similarity (0-100) at or above which an event counts as a duplicate.
pub const DEFAULT_FUZZY_THRESHOLD: u8 = 90;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const DEFAULT_OUTPUT_PATH: &str = "output/events.json";

pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
pub const GOOGLE_PLACES_FIND_URL: &str =
    "https://maps.googleapis.com/maps/api/place/findplacefromtext/json";
pub const USER_AGENT: &str = "event_scraper/0.1";

/// Geocoding retry budget: total attempts, and the fixed pause between them.
pub const GEOCODE_MAX_ATTEMPTS: usize = 3;
pub const GEOCODE_RETRY_DELAY_MS: u64 = 2_000;
pub const HTTP_TIMEOUT_SECONDS: u64 = 20;

/// WebDriver endpoint (geckodriver/chromedriver) for script-rendered sources.
pub const WEBDRIVER_URL: &str = "http://localhost:4444";
/// Scrolls to the bottom of a rendered listing, and the pause after each one.
pub const BROWSER_MAX_SCROLL: usize = 5;
pub const BROWSER_SCROLL_PAUSE_MS: u64 = 2_000;

/// Environment override for the Google Places key.
pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_PLACES_API_KEY";
