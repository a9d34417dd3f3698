//! Status classification for extracted values

use crate::tracker::TrackerStatus;

/// Classify a freshly extracted value against the previous observation
///
/// A present, non-empty trigger word switches the tracker into keyword mode:
/// the result is `Match` or `NoMatch` depending on a case-insensitive
/// substring test, and the previous value plays no part. Otherwise the value
/// is diffed against the previous one; the first observation of a tracker's
/// life is recorded as `Stable`, serving as the baseline for later diffs.
///
/// Never returns `New`; that status only exists before the first completed
/// check.
pub fn classify(
    previous: Option<&str>,
    new_value: &str,
    trigger_word: Option<&str>,
) -> TrackerStatus {
    if let Some(word) = trigger_word {
        if !word.is_empty() {
            return if contains_ignore_case(new_value, word) {
                TrackerStatus::Match
            } else {
                TrackerStatus::NoMatch
            };
        }
    }

    match previous {
        None => TrackerStatus::Stable,
        Some(prev) if prev != new_value => TrackerStatus::Changed,
        Some(_) => TrackerStatus::Stable,
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_is_stable() {
        assert_eq!(classify(None, "9.99", None), TrackerStatus::Stable);
    }

    #[test]
    fn unchanged_value_is_stable() {
        assert_eq!(classify(Some("9.99"), "9.99", None), TrackerStatus::Stable);
    }

    #[test]
    fn differing_value_is_changed() {
        assert_eq!(classify(Some("9.99"), "12.49", None), TrackerStatus::Changed);
    }

    #[test]
    fn trigger_word_match_is_case_insensitive() {
        assert_eq!(
            classify(None, "Tickets AVAILABLE now", Some("available")),
            TrackerStatus::Match
        );
        assert_eq!(
            classify(None, "sold out", Some("Available")),
            TrackerStatus::NoMatch
        );
    }

    #[test]
    fn trigger_word_ignores_the_previous_value() {
        // Value unchanged between checks, but keyword mode reports Match
        assert_eq!(
            classify(Some("in stock"), "in stock", Some("stock")),
            TrackerStatus::Match
        );
        // Value changed between checks, but keyword mode reports NoMatch
        assert_eq!(
            classify(Some("in stock"), "sold out", Some("stock")),
            TrackerStatus::NoMatch
        );
    }

    #[test]
    fn empty_trigger_word_falls_back_to_change_detection() {
        assert_eq!(classify(Some("a"), "b", Some("")), TrackerStatus::Changed);
        assert_eq!(classify(Some("a"), "a", Some("")), TrackerStatus::Stable);
        assert_eq!(classify(None, "a", Some("")), TrackerStatus::Stable);
    }

    #[test]
    fn trigger_word_matches_inside_larger_words() {
        assert_eq!(
            classify(None, "unavailable", Some("available")),
            TrackerStatus::Match
        );
    }

    #[test]
    fn comparison_is_exact_for_change_detection() {
        // Case differences count as a change when no trigger word is set
        assert_eq!(
            classify(Some("In Stock"), "in stock", None),
            TrackerStatus::Changed
        );
        // Whitespace differences count too
        assert_eq!(
            classify(Some("9.99"), "9.99 ", None),
            TrackerStatus::Changed
        );
    }
}
