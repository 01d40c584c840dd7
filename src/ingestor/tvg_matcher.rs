//! Channel identifier matching between playlists and guides
//!
//! Playlist `tvg-id`s and guide `<channel id>`s come from independent feeds
//! and rarely agree on casing, punctuation or regional suffixes. The matcher
//! resolves a guide identifier to a playlist identifier with progressively
//! looser rules; an exact match always wins.

use std::collections::HashSet;

/// Suffixes that do not distinguish one channel from another
const CHANNEL_TYPE_SUFFIXES: [&str; 4] = ["财经", "高清", "卫视", "电视台"];
const SATELLITE_SUFFIX: &str = "卫视";
const MIN_CONTAINMENT_LEN: usize = 2;

#[derive(Debug, Clone)]
struct KnownIdentifier {
    original: String,
    /// Separators stripped and suffixes removed
    normalized: String,
    /// Separators stripped only
    folded: String,
}

/// Lookup from guide channel ids to playlist identifiers
///
/// Built once per refresh from the identifiers of one source, in playlist
/// order. When several identifiers match a candidate, the one registered
/// first wins.
#[derive(Debug, Clone, Default)]
pub struct TvgIdMatcher {
    exact: HashSet<String>,
    known: Vec<KnownIdentifier>,
}

impl TvgIdMatcher {
    pub fn new<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut matcher = Self::default();
        for identifier in identifiers {
            let identifier = identifier.into();
            if matcher.exact.insert(identifier.clone()) {
                matcher.known.push(KnownIdentifier {
                    normalized: normalize(&identifier),
                    folded: fold(&identifier),
                    original: identifier,
                });
            }
        }
        matcher
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    pub fn has_exact(&self, id: &str) -> bool {
        self.exact.contains(id)
    }

    /// Resolve a guide channel id to a known identifier
    ///
    /// Rules, in order: exact match; equality after normalization; substring
    /// containment in either direction for normalized ids of at least two
    /// characters; containment of the non-empty cores left after removing
    /// `卫视` when either side carries that suffix.
    pub fn find_match(&self, candidate: &str) -> Option<&str> {
        if let Some(known) = self.exact.get(candidate) {
            return Some(known.as_str());
        }

        let normalized = normalize(candidate);
        if let Some(known) = self.known.iter().find(|k| k.normalized == normalized) {
            return Some(&known.original);
        }

        if char_len(&normalized) >= MIN_CONTAINMENT_LEN {
            let contained = self.known.iter().find(|k| {
                char_len(&k.normalized) >= MIN_CONTAINMENT_LEN && contains_either(&k.normalized, &normalized)
            });
            if let Some(known) = contained {
                return Some(&known.original);
            }
        }

        let folded = fold(candidate);
        let candidate_core = folded.replace(SATELLITE_SUFFIX, "");
        self.known
            .iter()
            .find(|k| {
                if !folded.contains(SATELLITE_SUFFIX) && !k.folded.contains(SATELLITE_SUFFIX) {
                    return false;
                }
                let known_core = k.folded.replace(SATELLITE_SUFFIX, "");
                !candidate_core.is_empty()
                    && !known_core.is_empty()
                    && contains_either(&known_core, &candidate_core)
            })
            .map(|k| k.original.as_str())
    }
}

/// Lower-case and drop whitespace, `-` and `_`
fn fold(id: &str) -> String {
    id.to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .collect()
}

/// `fold` plus removal of channel-type suffixes; `cctv<N>` survives intact
fn normalize(id: &str) -> String {
    CHANNEL_TYPE_SUFFIXES
        .iter()
        .fold(fold(id), |acc, suffix| acc.replace(suffix, ""))
}

fn contains_either(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_exact_match_is_authoritative() {
        let matcher = TvgIdMatcher::new(["CCTV1", "cctv1"]);
        assert!(matcher.has_exact("cctv1"));
        assert_eq!(matcher.find_match("cctv1"), Some("cctv1"));
        assert_eq!(matcher.find_match("CCTV1"), Some("CCTV1"));
    }

    #[rstest]
    #[case("cctv-1", "CCTV1")]
    #[case("CCTV_1", "CCTV1")]
    #[case("cctv 1", "CCTV1")]
    #[case("湖南卫视高清", "湖南卫视")]
    #[case("北京", "北京卫视")]
    fn test_normalized_match(#[case] candidate: &str, #[case] expected: &str) {
        let matcher = TvgIdMatcher::new(["CCTV1", "湖南卫视", "北京卫视"]);
        assert_eq!(matcher.find_match(candidate), Some(expected));
    }

    #[test]
    fn test_satellite_suffix_both_directions() {
        let matcher = TvgIdMatcher::new(["北京卫视"]);
        assert_eq!(matcher.find_match("北京"), Some("北京卫视"));

        let matcher = TvgIdMatcher::new(["北京"]);
        assert_eq!(matcher.find_match("北京卫视"), Some("北京"));
    }

    #[test]
    fn test_satellite_cores_only_need_to_be_non_empty() {
        let matcher = TvgIdMatcher::new(["B卫视"]);
        assert_eq!(matcher.find_match("a卫视b"), Some("B卫视"));

        let matcher = TvgIdMatcher::new(["卫视"]);
        assert_eq!(matcher.find_match("北京卫视"), None);
    }

    #[test]
    fn test_substring_containment() {
        let matcher = TvgIdMatcher::new(["CCTV5+", "凤凰中文"]);
        assert_eq!(matcher.find_match("cctv5+体育赛事"), Some("CCTV5+"));
        assert_eq!(matcher.find_match("凤凰"), Some("凤凰中文"));
    }

    #[test]
    fn test_equality_pass_runs_before_containment() {
        let matcher = TvgIdMatcher::new(["CCTV10", "CCTV1"]);
        assert_eq!(matcher.find_match("cctv-1"), Some("CCTV1"));
        assert_eq!(matcher.find_match("cctv-10"), Some("CCTV10"));
    }

    #[test]
    fn test_first_registered_wins() {
        let matcher = TvgIdMatcher::new(["东方卫视", "东方卫视高清"]);
        assert_eq!(matcher.find_match("东方"), Some("东方卫视"));
    }

    #[test]
    fn test_short_ids_do_not_use_containment() {
        let matcher = TvgIdMatcher::new(["A1 Sports"]);
        assert_eq!(matcher.find_match("a"), None);
        assert_eq!(matcher.find_match("1"), None);
    }

    #[test]
    fn test_no_match() {
        let matcher = TvgIdMatcher::new(["CCTV1", "北京卫视"]);
        assert_eq!(matcher.find_match("BBC One"), None);
        assert_eq!(matcher.find_match(""), None);
        assert!(TvgIdMatcher::new(Vec::<String>::new()).find_match("cctv1").is_none());
    }

    #[test]
    fn test_duplicates_are_collapsed() {
        let matcher = TvgIdMatcher::new(["CCTV1", "CCTV1", "CCTV2"]);
        assert_eq!(matcher.len(), 2);
        assert!(!matcher.is_empty());
    }
}
