use serde::{Serialize, Deserialize};
use crate::bitmap::id_set::IdSet;
use crate::core::types::{FieldId, ItemId};

/// Search results container
#[derive(Debug, Clone)]
pub struct SearchResults {
    pub ids: IdSet,
    pub facets: Vec<FacetResult>,
    pub took_ms: u64,
}

impl SearchResults {
    pub fn total_hits(&self) -> u64 {
        self.ids.cardinality()
    }

    pub fn item_ids(&self) -> Vec<ItemId> {
        self.ids.to_vec()
    }

    pub fn facet(&self, field_id: FieldId) -> Option<&FacetResult> {
        self.facets.iter().find(|f| f.field_id == field_id)
    }
}

/// Aggregated values of one facet within the candidate set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetResult {
    pub field_id: FieldId,
    pub name: String,
    pub priority: f64,
    pub linked_id: Option<FieldId>,
    pub values: FacetValues,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FacetValues {
    Terms(Vec<ValueCount>),
    Range {
        min: f64,
        max: f64,
        count: u64,
        buckets: Vec<BucketCount>,
    },
}

impl FacetValues {
    pub fn is_empty(&self) -> bool {
        match self {
            FacetValues::Terms(values) => values.is_empty(),
            FacetValues::Range { count, .. } => *count == 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketCount {
    pub min: f64,
    pub max: f64,
    pub count: u64,
}

/// Autocomplete entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Token as it was first seen, original casing
    pub word: String,
    pub normalized: String,
    pub count: u64,
}
