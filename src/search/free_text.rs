use std::collections::HashMap;
use parking_lot::RwLock;
use tracing::trace;
use crate::analysis::analyzer::Analyzer;
use crate::bitmap::id_set::IdSet;
use crate::core::config::{Config, TextMatchMode};
use crate::core::error::Result;
use crate::core::types::ItemId;
use crate::facet::PartialResult;
use crate::search::fuzzy::FuzzyMatcher;
use crate::search::markov::MarkovChain;
use crate::search::results::Suggestion;
use crate::search::trie::Trie;

#[derive(Default)]
struct TextIndex {
    inverted: HashMap<String, IdSet>,
    trie: Trie,
    markov: MarkovChain,
}

/// Folds `ids` into the running result: the first hit seeds it, later hits
/// must overlap it. Returns whether the candidate was accepted.
fn try_fold(result: &mut Option<IdSet>, ids: &IdSet) -> bool {
    match result {
        None => {
            if ids.is_empty() {
                return false;
            }
            *result = Some(ids.clone());
            true
        }
        Some(current) => {
            if !current.has_intersection(ids) {
                return false;
            }
            current.intersect(ids);
            true
        }
    }
}

impl TextIndex {
    fn fold_exact(&self, token: &str, result: &mut Option<IdSet>) -> bool {
        self.inverted
            .get(token)
            .is_some_and(|ids| try_fold(result, ids))
    }

    fn fold_prefix(&self, token: &str, prev: Option<&str>, limit: usize, result: &mut Option<IdSet>) -> bool {
        let entries = self.trie.prefix(token);
        let mut candidates: Vec<(String, u64)> = entries.iter()
            .map(|(key, entry)| (key.clone(), entry.ids.cardinality()))
            .collect();
        self.markov.rank(prev, &mut candidates);

        for (key, _) in candidates.into_iter().take(limit) {
            if let Some(entry) = self.trie.get(&key) {
                if try_fold(result, &entry.ids) {
                    trace!(token, matched = %key, "prefix match");
                    return true;
                }
            }
        }
        false
    }

    fn fold_fuzzy(&self, token: &str, k: usize, strict: bool, result: &mut Option<IdSet>) -> bool {
        let matcher = FuzzyMatcher::new(token).strict(strict);
        let vocabulary = self.inverted.iter().map(|(t, ids)| (t.as_str(), ids.cardinality()));
        for candidate in matcher.best(vocabulary, k) {
            if let Some(ids) = self.inverted.get(&candidate) {
                if try_fold(result, ids) {
                    trace!(token, matched = %candidate, "fuzzy match");
                    return true;
                }
            }
        }
        false
    }
}

/// Token index with prefix, fuzzy and Markov-ranked fallback
pub struct FreeTextEngine {
    analyzer: Analyzer,
    index: RwLock<TextIndex>,
    mode: TextMatchMode,
    prefix_candidates: usize,
    fuzzy_candidates: usize,
    strict_fuzzy: bool,
}

impl FreeTextEngine {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_analyzer(Analyzer::product_search(config)?, config))
    }

    pub fn with_analyzer(analyzer: Analyzer, config: &Config) -> Self {
        FreeTextEngine {
            analyzer,
            index: RwLock::new(TextIndex::default()),
            mode: config.text_match,
            prefix_candidates: config.prefix_candidates,
            fuzzy_candidates: config.fuzzy_candidates,
            strict_fuzzy: config.strict_fuzzy,
        }
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Distinct normalized tokens currently indexed
    pub fn token_count(&self) -> usize {
        self.index.read().inverted.len()
    }

    pub fn index_document(&self, id: ItemId, text: &str) {
        let tokens = self.analyzer.analyze(text);
        if tokens.is_empty() {
            return;
        }
        let terms: Vec<String> = tokens.iter().map(|t| t.text.clone()).collect();

        let mut index = self.index.write();
        for token in &tokens {
            index.inverted.entry(token.text.clone()).or_default().add(id);
            index.trie.insert(&token.text, &token.original, id);
        }
        index.markov.record(&terms);
    }

    /// Undo `index_document` for the same text
    pub fn remove_document(&self, id: ItemId, text: &str) {
        let terms = self.analyzer.terms(text);
        if terms.is_empty() {
            return;
        }

        let mut index = self.index.write();
        for term in &terms {
            if let Some(ids) = index.inverted.get_mut(term) {
                ids.remove(id);
                if ids.is_empty() {
                    index.inverted.remove(term);
                }
            }
            index.trie.remove(term, id);
        }
        index.markov.forget(&terms);
    }

    /// Best-effort token match.
    ///
    /// Each token tries an exact hit, then prefix completions, then fuzzy
    /// neighbours. A token matching nothing leaves the result as it was.
    pub fn search(&self, query: &str) -> IdSet {
        let tokens = self.analyzer.terms(query);
        let index = self.index.read();

        let mut result: Option<IdSet> = None;
        let mut prev: Option<&str> = None;
        for token in &tokens {
            let accepted = index.fold_exact(token, &mut result)
                || index.fold_prefix(token, prev, self.prefix_candidates, &mut result)
                || index.fold_fuzzy(token, self.fuzzy_candidates, self.strict_fuzzy, &mut result);
            if !accepted {
                trace!(token = %token, "token matched nothing");
                continue;
            }
            prev = Some(token.as_str());
            if self.mode == TextMatchMode::FirstMatch && result.as_ref().is_some_and(|r| !r.is_empty()) {
                break;
            }
        }
        result.unwrap_or_default()
    }

    /// `search` for the merger: a query without tokens does not restrict.
    pub fn matches(&self, query: &str) -> PartialResult {
        if self.analyzer.terms(query).is_empty() {
            return PartialResult::Unrestricted;
        }
        PartialResult::Ids(self.search(query))
    }

    /// Completions for the last token of `text`
    pub fn suggest(&self, text: &str, limit: usize) -> Vec<Suggestion> {
        let tokens = self.analyzer.analyze(text);
        let Some(last) = tokens.last() else {
            return Vec::new();
        };
        let prev = tokens.len().checked_sub(2).map(|i| tokens[i].text.as_str());

        let index = self.index.read();
        let entries = index.trie.prefix(&last.text);
        let mut candidates: Vec<(String, u64)> = entries.iter()
            .map(|(key, entry)| (key.clone(), entry.ids.cardinality()))
            .collect();
        index.markov.rank(prev, &mut candidates);

        candidates.into_iter()
            .take(limit)
            .filter_map(|(key, count)| {
                index.trie.get(&key).map(|entry| Suggestion {
                    word: entry.word.clone(),
                    normalized: key,
                    count,
                })
            })
            .collect()
    }
}
