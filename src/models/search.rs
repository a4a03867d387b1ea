use serde::{Deserialize, Serialize};

/// Matched lines or match windows, in document order.
pub type MatchResult = Vec<String>;

/// How a query is compared against a candidate. The same predicate filters
/// document names in the database and lines of decoded content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchMode {
    #[default]
    Contains,
    StartsWith,
    EndsWith,
}

impl SearchMode {
    /// Case-insensitive in every mode. The anchored modes ignore leading and
    /// trailing whitespace of the candidate.
    pub fn matches(self, candidate: &str, query: &str) -> bool {
        match self {
            Self::Contains => {
                let haystack: Vec<char> = candidate.chars().collect();
                let needle: Vec<char> = query.chars().collect();
                find_ignore_case(&haystack, &needle, 0).is_some()
            }
            Self::StartsWith => starts_with_ignore_case(candidate.trim(), query),
            Self::EndsWith => ends_with_ignore_case(candidate.trim(), query),
        }
    }
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Contains => write!(f, "contains"),
            Self::StartsWith => write!(f, "starts_with"),
            Self::EndsWith => write!(f, "ends_with"),
        }
    }
}

impl std::str::FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "contains" => Ok(Self::Contains),
            "starts_with" => Ok(Self::StartsWith),
            "ends_with" => Ok(Self::EndsWith),
            _ => Err(format!("unknown search mode: {s}")),
        }
    }
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase()) || a.to_uppercase().eq(b.to_uppercase())
}

/// Char index of the first case-insensitive occurrence of `needle` at or
/// after `from`.
pub(crate) fn find_ignore_case(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&start| {
        haystack[start..start + needle.len()]
            .iter()
            .zip(needle)
            .all(|(&h, &n)| chars_eq_ignore_case(h, n))
    })
}

fn starts_with_ignore_case(candidate: &str, prefix: &str) -> bool {
    let mut chars = candidate.chars();
    prefix
        .chars()
        .all(|p| chars.next().is_some_and(|c| chars_eq_ignore_case(c, p)))
}

fn ends_with_ignore_case(candidate: &str, suffix: &str) -> bool {
    let mut chars = candidate.chars().rev();
    suffix
        .chars()
        .rev()
        .all(|s| chars.next().is_some_and(|c| chars_eq_ignore_case(c, s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_ignores_case() {
        assert!(SearchMode::Contains.matches("Quarterly REPORT", "report"));
        assert!(!SearchMode::Contains.matches("Quarterly", "report"));
    }

    #[test]
    fn anchored_modes_trim_the_candidate() {
        assert!(SearchMode::StartsWith.matches("  Report 2024", "report"));
        assert!(SearchMode::EndsWith.matches("annual summary.PDF \t", ".pdf"));
        assert!(!SearchMode::StartsWith.matches("data line", "report"));
        assert!(!SearchMode::EndsWith.matches("pdf notes", "pdf"));
    }

    #[test]
    fn query_longer_than_candidate_never_matches() {
        assert!(!SearchMode::Contains.matches("ab", "abc"));
        assert!(!SearchMode::StartsWith.matches("ab", "abc"));
        assert!(!SearchMode::EndsWith.matches("bc", "abc"));
    }

    #[test]
    fn find_ignore_case_respects_start_offset() {
        let hay: Vec<char> = "Hello hello".chars().collect();
        let needle: Vec<char> = "HELLO".chars().collect();
        assert_eq!(find_ignore_case(&hay, &needle, 0), Some(0));
        assert_eq!(find_ignore_case(&hay, &needle, 1), Some(6));
        assert_eq!(find_ignore_case(&hay, &needle, 7), None);
    }

    #[test]
    fn non_ascii_case_folding() {
        assert!(SearchMode::Contains.matches("Istanbul şehri", "ŞEHRI"));
        assert!(SearchMode::StartsWith.matches("Ärger", "är"));
    }

    #[test]
    fn round_trips_through_strings() {
        for mode in [SearchMode::Contains, SearchMode::StartsWith, SearchMode::EndsWith] {
            assert_eq!(mode.to_string().parse::<SearchMode>().unwrap(), mode);
        }
        assert!("fuzzy".parse::<SearchMode>().is_err());
    }
}
