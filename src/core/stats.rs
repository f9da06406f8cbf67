use serde::{Serialize, Deserialize};

/// Index statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_items: u64,
    pub facet_count: usize,
    pub hidden_facets: usize,
    pub numeric_buckets: usize,
    pub distinct_values: usize,
    pub distinct_tokens: usize,
}
