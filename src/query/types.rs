use std::collections::HashSet;
use serde::{Deserialize, Serialize};
use crate::core::types::FieldId;
use crate::facet::FacetFilter;

/// Exact-value clause. `negate` turns it into an exclusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExactFilter {
    pub field_id: FieldId,
    pub value: String,
    #[serde(default)]
    pub negate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeFilter {
    pub field_id: FieldId,
    pub min: f64,
    pub max: f64,
}

/// Query as handed over by the API layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub exact: Vec<ExactFilter>,
    #[serde(default)]
    pub ranges: Vec<RangeFilter>,
    /// Return per-facet value counts alongside the ids
    #[serde(default)]
    pub aggregate: bool,
}

impl FilterRequest {
    pub fn text(text: &str) -> Self {
        FilterRequest {
            text: text.to_string(),
            ..Default::default()
        }
    }

    pub fn with_exact(mut self, field_id: FieldId, value: &str) -> Self {
        self.exact.push(ExactFilter { field_id, value: value.to_string(), negate: false });
        self
    }

    pub fn without(mut self, field_id: FieldId, value: &str) -> Self {
        self.exact.push(ExactFilter { field_id, value: value.to_string(), negate: true });
        self
    }

    pub fn with_range(mut self, field_id: FieldId, min: f64, max: f64) -> Self {
        self.ranges.push(RangeFilter { field_id, min, max });
        self
    }

    pub fn with_aggregation(mut self) -> Self {
        self.aggregate = true;
        self
    }

    /// Facets with any active clause, negated or not; left out of aggregation
    pub fn pinned_fields(&self) -> HashSet<FieldId> {
        self.exact.iter()
            .map(|c| c.field_id)
            .chain(self.ranges.iter().map(|c| c.field_id))
            .collect()
    }
}

impl ExactFilter {
    pub fn facet_filter(&self) -> FacetFilter {
        FacetFilter::Value(self.value.clone())
    }
}

impl RangeFilter {
    pub fn facet_filter(&self) -> FacetFilter {
        FacetFilter::Range { min: self.min, max: self.max }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let request: FilterRequest = serde_json::from_str(
            r#"{"exact": [{"field_id": 1, "value": "acme"}], "ranges": [{"field_id": 2, "min": 1, "max": 5}]}"#,
        ).unwrap();
        assert_eq!(request.text, "");
        assert!(!request.exact[0].negate);
        assert!(!request.aggregate);
        assert_eq!(request.ranges[0].facet_filter(), FacetFilter::Range { min: 1.0, max: 5.0 });
    }

    #[test]
    fn every_active_clause_pins_its_facet() {
        let request = FilterRequest::default()
            .with_exact(1, "acme")
            .without(3, "used")
            .with_range(2, 0.0, 10.0);
        let pinned = request.pinned_fields();
        assert_eq!(pinned, [1, 2, 3].into_iter().collect::<HashSet<FieldId>>());
        assert!(FilterRequest::text("drill").pinned_fields().is_empty());
    }
}
