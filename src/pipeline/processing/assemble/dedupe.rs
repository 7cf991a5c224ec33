use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_FUZZY_THRESHOLD;

/// How a candidate title is compared against the titles already accepted in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    /// Case-sensitive string equality
    Exact,
    /// Token-sort similarity (0-100) at or above `threshold`
    Fuzzy { threshold: u8 },
}

impl Default for DuplicatePolicy {
    fn default() -> Self {
        DuplicatePolicy::Fuzzy {
            threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

impl DuplicatePolicy {
    /// True on the first seen title that matches `candidate`.
    pub fn is_duplicate<S: AsRef<str>>(&self, candidate: &str, seen: &[S]) -> bool {
        match *self {
            DuplicatePolicy::Exact => seen.iter().any(|t| t.as_ref() == candidate),
            DuplicatePolicy::Fuzzy { threshold } => seen
                .iter()
                .any(|t| TitleSimilarity::token_sort_ratio(candidate, t.as_ref()) >= threshold),
        }
    }
}

/// Titles accepted so far in one source's run. Single writer.
#[derive(Debug, Default, Clone)]
pub struct SeenTitles {
    titles: Vec<String>,
}

impl SeenTitles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, title: impl Into<String>) {
        self.titles.push(title.into());
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

/// String similarity for event titles
pub struct TitleSimilarity;

impl TitleSimilarity {
    /// Word-order-insensitive similarity on a 0-100 scale.
    ///
    /// Both strings are lowercased, punctuation becomes whitespace, and the
    /// words are sorted before comparing. Returns 0 if either side has no words.
    pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
        let a = Self::sorted_tokens(a);
        let b = Self::sorted_tokens(b);
        if a.is_empty() || b.is_empty() {
            return 0;
        }
        Self::ratio(&a, &b)
    }

    fn sorted_tokens(s: &str) -> String {
        let cleaned: String = s
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect::<String>()
            .to_lowercase();
        let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
        tokens.sort_unstable();
        tokens.join(" ")
    }

    /// `2 * LCS / (len_a + len_b)`, scaled to 0-100 and rounded.
    fn ratio(a: &str, b: &str) -> u8 {
        let chars1: Vec<char> = a.chars().collect();
        let chars2: Vec<char> = b.chars().collect();
        let total = chars1.len() + chars2.len();
        if total == 0 {
            return 100;
        }
        let lcs = Self::lcs_length(&chars1, &chars2);
        ((200.0 * lcs as f64) / total as f64).round() as u8
    }

    fn lcs_length(chars1: &[char], chars2: &[char]) -> usize {
        let mut prev = vec![0usize; chars2.len() + 1];
        let mut curr = vec![0usize; chars2.len() + 1];

        for c1 in chars1 {
            for (j, c2) in chars2.iter().enumerate() {
                curr[j + 1] = if c1 == c2 {
                    prev[j] + 1
                } else {
                    prev[j + 1].max(curr[j])
                };
            }
            std::mem::swap(&mut prev, &mut curr);
        }

        prev[chars2.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_sort_ratio() {
        assert_eq!(TitleSimilarity::token_sort_ratio("Jazz Night", "JAZZ NIGHT!!"), 100);
        assert_eq!(TitleSimilarity::token_sort_ratio("Night Jazz", "jazz night"), 100);
        assert_eq!(TitleSimilarity::token_sort_ratio("", "jazz night"), 0);
        assert_eq!(TitleSimilarity::token_sort_ratio("!!!", "???"), 0);
        assert!(TitleSimilarity::token_sort_ratio("Jazz Night", "Comedy Hour") < 50);
        // "jazz nights" vs "jazz night": 2*10/21
        assert_eq!(TitleSimilarity::token_sort_ratio("Jazz Nights", "Jazz Night"), 95);
    }

    #[test]
    fn test_fuzzy_policy_catches_near_duplicates() {
        let seen = vec!["Jazz Night".to_string()];
        let policy = DuplicatePolicy::default();

        assert!(policy.is_duplicate("JAZZ NIGHT!!", &seen));
        assert!(policy.is_duplicate("jazz night", &seen));
        assert!(!policy.is_duplicate("Salsa Sunday", &seen));
    }

    #[test]
    fn test_exact_policy_is_case_sensitive() {
        let seen = vec!["Jazz Night".to_string()];
        let policy = DuplicatePolicy::Exact;

        assert!(policy.is_duplicate("Jazz Night", &seen));
        assert!(!policy.is_duplicate("jazz night", &seen));
        assert!(!policy.is_duplicate("JAZZ NIGHT!!", &seen));
    }

    #[test]
    fn test_empty_seen_set() {
        let seen: Vec<String> = Vec::new();
        assert!(!DuplicatePolicy::Exact.is_duplicate("Jazz Night", &seen));
        assert!(!DuplicatePolicy::default().is_duplicate("Jazz Night", &seen));
    }

    #[test]
    fn test_seen_titles() {
        let mut seen = SeenTitles::new();
        assert!(seen.is_empty());
        seen.insert("Jazz Night");
        seen.insert("Jazz Night");
        assert_eq!(seen.len(), 2);
        assert_eq!(seen.titles()[0], "Jazz Night");
    }
}
