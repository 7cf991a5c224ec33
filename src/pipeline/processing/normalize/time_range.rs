use once_cell::sync::Lazy;
use regex::Regex;

/// A lone clock time such as `7:00 PM` or `19:30`.
static CLOCK_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2}:\d{2}\s*(?:AM|PM)?)").expect("valid clock-time pattern"));

/// `Www, Mmm D, YYYY H:MM AM|PM`, as Eventbrite prints both ends of a range.
pub(crate) const DATETIME_PATTERN: &str = r"\w{3}, \w{3} \d{1,2}, \d{4} \d{1,2}:\d{2} (?:AM|PM)";

static DATETIME_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"({DATETIME_PATTERN})\s*[-–]\s*({DATETIME_PATTERN})"))
        .expect("valid datetime-range pattern")
});

pub(crate) static DATETIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(DATETIME_PATTERN).expect("valid datetime pattern"));

/// Pull a start and optional end time out of free-form date text.
///
/// Without a `-`/`–` separator the first clock time is the start and there is
/// no end. With a separator both sides must be full `Www, Mmm D, YYYY H:MM AM|PM`
/// datetimes, otherwise nothing is extracted.
pub fn extract_time_range(raw: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(text) = raw else {
        return (None, None);
    };

    if !text.contains('-') && !text.contains('–') {
        return match CLOCK_TIME.captures(text) {
            Some(caps) => (Some(caps[1].trim().to_string()), None),
            None => (None, None),
        };
    }

    match DATETIME_RANGE.captures(text) {
        Some(caps) => (
            Some(caps[1].trim().to_string()),
            Some(caps[2].trim().to_string()),
        ),
        None => (None, None),
    }
}
