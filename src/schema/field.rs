use serde::{Serialize, Deserialize};
use crate::core::types::FieldId;

/// Which facet variant indexes a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FacetKind {
    Exact,
    Integer,
    Decimal,
    Path,
}

/// Metadata shared by every facet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseField {
    pub id: FieldId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: FacetKind,
    #[serde(default)]
    pub priority: f64,
    #[serde(default = "default_searchable")]
    pub searchable: bool,
    /// Still filterable, just left out of aggregation
    #[serde(default)]
    pub hide_facet: bool,
    #[serde(default)]
    pub linked_id: Option<FieldId>,
    #[serde(default)]
    pub category_level: u32,
}

fn default_searchable() -> bool {
    true
}

impl BaseField {
    pub fn new(id: FieldId, name: &str, kind: FacetKind) -> Self {
        BaseField {
            id,
            name: name.to_string(),
            description: String::new(),
            kind,
            priority: 0.0,
            searchable: true,
            hide_facet: false,
            linked_id: None,
            category_level: 0,
        }
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hide_facet = true;
        self
    }

    pub fn not_searchable(mut self) -> Self {
        self.searchable = false;
        self
    }

    pub fn linked_to(mut self, other: FieldId) -> Self {
        self.linked_id = Some(other);
        self
    }

    /// True when switching from `self` to `next` invalidates the indexed values
    pub fn requires_reindex(&self, next: &BaseField) -> bool {
        self.kind != next.kind || self.searchable != next.searchable
    }
}

/// Admin-side change to the field catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FieldEvent {
    Upsert(BaseField),
    Remove(FieldId),
}
