use std::collections::HashMap;

/// Counts of token → next-token transitions seen at indexing time
#[derive(Default)]
pub struct MarkovChain {
    transitions: HashMap<String, HashMap<String, u32>>,
}

impl MarkovChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, tokens: &[String]) {
        for pair in tokens.windows(2) {
            *self.transitions
                .entry(pair[0].clone())
                .or_default()
                .entry(pair[1].clone())
                .or_insert(0) += 1;
        }
    }

    pub fn forget(&mut self, tokens: &[String]) {
        for pair in tokens.windows(2) {
            let Some(next) = self.transitions.get_mut(&pair[0]) else {
                continue;
            };
            if let Some(count) = next.get_mut(&pair[1]) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    next.remove(&pair[1]);
                }
            }
            if next.is_empty() {
                self.transitions.remove(&pair[0]);
            }
        }
    }

    pub fn count(&self, from: &str, to: &str) -> u32 {
        self.transitions
            .get(from)
            .and_then(|next| next.get(to))
            .copied()
            .unwrap_or(0)
    }

    /// Order `(token, popularity)` candidates by transition count from `prev`,
    /// then popularity, then token. Without transition data this is a pure
    /// popularity ranking.
    pub fn rank(&self, prev: Option<&str>, candidates: &mut [(String, u64)]) {
        let next = prev.and_then(|p| self.transitions.get(p));
        candidates.sort_by(|a, b| {
            let ta = next.and_then(|n| n.get(&a.0)).copied().unwrap_or(0);
            let tb = next.and_then(|n| n.get(&b.0)).copied().unwrap_or(0);
            tb.cmp(&ta)
                .then_with(|| b.1.cmp(&a.1))
                .then_with(|| a.0.cmp(&b.0))
        });
    }
}
