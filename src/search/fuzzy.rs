use std::collections::HashMap;

/// Character-overlap score of `candidate` against `query`.
///
/// Counts shared characters (as multisets), minus the length difference.
/// Cheap enough to run over the whole vocabulary.
pub fn similarity(query: &str, candidate: &str) -> i64 {
    let mut available: HashMap<char, i64> = HashMap::new();
    for c in candidate.chars() {
        *available.entry(c).or_insert(0) += 1;
    }
    let mut overlap = 0i64;
    for c in query.chars() {
        if let Some(n) = available.get_mut(&c) {
            if *n > 0 {
                *n -= 1;
                overlap += 1;
            }
        }
    }
    let penalty = (query.chars().count() as i64 - candidate.chars().count() as i64).abs();
    overlap - penalty
}

/// Scores a vocabulary against one query token and keeps the best `k`
pub struct FuzzyMatcher {
    query: String,
    query_len: i64,
    strict: bool,
}

impl FuzzyMatcher {
    pub fn new(query: &str) -> Self {
        FuzzyMatcher {
            query: query.to_string(),
            query_len: query.chars().count() as i64,
            strict: false,
        }
    }

    /// Only keep positive scores sharing at least half of the query's characters
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Score of any token other than the query itself
    pub fn score(&self, candidate: &str) -> Option<i64> {
        if candidate == self.query {
            return None;
        }
        let score = similarity(&self.query, candidate);
        if !self.strict {
            return Some(score);
        }
        let overlap = score + (self.query_len - candidate.chars().count() as i64).abs();
        (score > 0 && overlap * 2 >= self.query_len).then_some(score)
    }

    /// Top `k` of `(token, popularity)` candidates, best first
    pub fn best<'a, I>(&self, candidates: I, k: usize) -> Vec<String>
    where
        I: IntoIterator<Item = (&'a str, u64)>,
    {
        let mut scored: Vec<(i64, u64, &str)> = candidates.into_iter()
            .filter_map(|(token, popularity)| self.score(token).map(|s| (s, popularity, token)))
            .collect();
        scored.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then_with(|| b.1.cmp(&a.1))
                .then_with(|| a.2.cmp(b.2))
        });
        scored.into_iter().take(k).map(|(_, _, token)| token.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_minus_length_penalty() {
        assert_eq!(similarity("wrld", "world"), 3);
        assert_eq!(similarity("world", "world"), 5);
        assert_eq!(similarity("abc", "xyz"), 0);
        assert_eq!(similarity("aa", "a"), 0);
    }

    #[test]
    fn keeps_best_k_with_popularity_tiebreak() {
        let matcher = FuzzyMatcher::new("drll");
        let vocab: Vec<(&str, u64)> = vec![("drill", 3), ("grill", 9), ("drills", 1), ("saw", 50), ("droll", 3)];
        let best = matcher.best(vocab, 3);
        assert_eq!(best, vec!["drill", "droll", "grill"]);
    }

    #[test]
    fn every_other_token_is_a_candidate_by_default() {
        let matcher = FuzzyMatcher::new("qz");
        assert_eq!(matcher.score("qz"), None);
        assert_eq!(matcher.score("saw"), Some(-1));
        assert_eq!(matcher.best(vec![("drill", 1), ("saw", 1)], 3), vec!["saw", "drill"]);
    }

    #[test]
    fn strict_mode_rejects_weak_candidates() {
        let matcher = FuzzyMatcher::new("world").strict(true);
        assert_eq!(matcher.score("world"), None);
        assert_eq!(matcher.score("how"), None);
        assert!(matcher.score("worlds").is_some());
        assert!(FuzzyMatcher::new("qz").strict(true).best(vec![("saw", 1)], 3).is_empty());
    }
}
