use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::time_range::{extract_time_range, DATETIME};
use crate::types::{NormalizedDate, SourceKind};

/// How Eventbrite prints dates. The listing markup has used both over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EventbriteDateFormat {
    /// `Sun, Mar 3, 2024 7:00 PM - Sun, Mar 3, 2024 10:00 PM UTC`; the start is kept
    #[default]
    Ranged,
    /// `Sunday, March 3`; the year comes from [`DateRules::reference_year`]
    YearLess,
}

/// Date parsing knobs that vary per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRules {
    pub eventbrite_format: EventbriteDateFormat,
    pub reference_year: i32,
}

/// Normalize free-form date text for the given source.
///
/// Never fails: text that does not fit the source's grammar produces an absent
/// timestamp. `None` input is fully unknown.
pub fn normalize_date(raw: Option<&str>, source: SourceKind, rules: &DateRules) -> NormalizedDate {
    let Some(text) = raw else {
        return NormalizedDate::unknown();
    };

    let timestamp = match source {
        SourceKind::Facebook => parse_facebook(text),
        SourceKind::Eventbrite => match rules.eventbrite_format {
            EventbriteDateFormat::Ranged => parse_eventbrite_ranged(text),
            EventbriteDateFormat::YearLess => parse_eventbrite_year_less(text, rules.reference_year),
        },
        // Place lookups carry no date grammar
        SourceKind::Google => None,
    };

    if timestamp.is_none() {
        debug!(source = %source, text, "date text did not match the source format");
    }

    let (start_time, end_time) = extract_time_range(Some(text));
    NormalizedDate {
        timestamp,
        start_time,
        end_time,
    }
}

/// Same as [`normalize_date`] but keyed by a source label; unknown labels are fully unknown.
pub fn normalize_date_for_label(raw: Option<&str>, label: &str, rules: &DateRules) -> NormalizedDate {
    match SourceKind::from_label(label) {
        Some(source) => normalize_date(raw, source, rules),
        None => NormalizedDate::unknown(),
    }
}

/// `SUNDAY, MARCH 3, 2024`
fn parse_facebook(text: &str) -> Option<NaiveDateTime> {
    NaiveDate::parse_from_str(text.trim(), "%A, %B %d, %Y")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// First `Www, Mmm D, YYYY H:MM AM|PM` in the text; the end of the range and zone are ignored.
fn parse_eventbrite_ranged(text: &str) -> Option<NaiveDateTime> {
    let start = DATETIME.find(text)?;
    NaiveDateTime::parse_from_str(start.as_str(), "%a, %b %d, %Y %I:%M %p").ok()
}

/// `Sunday, March 3` against a reference year. The weekday is dropped since it
/// cannot be checked without knowing the year the site meant.
fn parse_eventbrite_year_less(text: &str, year: i32) -> Option<NaiveDateTime> {
    let text = text.trim();
    let month_day = match text.split_once(',') {
        Some((_, rest)) => rest.trim(),
        None => text,
    };
    NaiveDate::parse_from_str(&format!("{month_day} {year}"), "%B %d %Y")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> DateRules {
        DateRules {
            eventbrite_format: EventbriteDateFormat::Ranged,
            reference_year: 2024,
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_facebook_upper_case_date() {
        let date = normalize_date(Some("SUNDAY, MARCH 3, 2024"), SourceKind::Facebook, &rules());
        assert_eq!(date.timestamp, Some(at(2024, 3, 3, 0, 0)));
        assert_eq!(date.start_time, None);
        assert_eq!(date.end_time, None);
    }

    #[test]
    fn test_eventbrite_ranged_date() {
        let text = "Sun, Mar 3, 2024 7:00 PM - Sun, Mar 3, 2024 10:00 PM UTC";
        let date = normalize_date(Some(text), SourceKind::Eventbrite, &rules());
        assert_eq!(date.timestamp, Some(at(2024, 3, 3, 19, 0)));
        assert_eq!(date.start_time.as_deref(), Some("Sun, Mar 3, 2024 7:00 PM"));
        assert_eq!(date.end_time.as_deref(), Some("Sun, Mar 3, 2024 10:00 PM"));
    }

    #[test]
    fn test_eventbrite_year_less_date() {
        let rules = DateRules {
            eventbrite_format: EventbriteDateFormat::YearLess,
            reference_year: 2024,
        };
        let date = normalize_date(Some("Sunday, March 3"), SourceKind::Eventbrite, &rules);
        assert_eq!(date.timestamp, Some(at(2024, 3, 3, 0, 0)));
    }

    #[test]
    fn test_google_has_no_date_grammar() {
        let date = normalize_date(Some("SUNDAY, MARCH 3, 2024"), SourceKind::Google, &rules());
        assert_eq!(date.timestamp, None);
    }

    #[test]
    fn test_malformed_dates_never_parse() {
        let malformed = [
            "",
            "tomorrow night",
            "32/13/2024",
            "MONDAY, MARCH 3, 2024", // wrong weekday
            "Sun, Foo 3, 2024 7:00 PM",
            "Sunday, Smarch 45",
            "🎷🎷🎷",
        ];
        let year_less = DateRules {
            eventbrite_format: EventbriteDateFormat::YearLess,
            reference_year: 2024,
        };
        for text in malformed {
            for source in [SourceKind::Facebook, SourceKind::Eventbrite, SourceKind::Google] {
                assert_eq!(normalize_date(Some(text), source, &rules()).timestamp, None, "{text}");
                assert_eq!(normalize_date(Some(text), source, &year_less).timestamp, None, "{text}");
            }
        }
    }

    #[test]
    fn test_absent_input_is_fully_unknown() {
        for source in [SourceKind::Facebook, SourceKind::Eventbrite, SourceKind::Google] {
            assert!(normalize_date(None, source, &rules()).is_unknown());
        }
    }

    #[test]
    fn test_unknown_label_is_fully_unknown() {
        let date = normalize_date_for_label(Some("7:00 PM"), "meetup", &rules());
        assert!(date.is_unknown());

        let date = normalize_date_for_label(Some("SUNDAY, MARCH 3, 2024"), "FACEBOOK", &rules());
        assert!(date.timestamp.is_some());
    }
}
