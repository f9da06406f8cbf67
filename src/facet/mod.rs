pub mod exact;
pub mod bucket;
pub mod numeric;
pub mod path;

use crossbeam::channel::Sender;
use crate::bitmap::id_set::IdSet;
use crate::core::config::Config;
use crate::core::types::{FieldValue, ItemId};
use crate::facet::exact::ExactFacet;
use crate::facet::numeric::NumericFacet;
use crate::facet::path::PathFacet;
use crate::schema::field::{BaseField, FacetKind};
use crate::search::results::FacetValues;

/// Output of one filter evaluation.
///
/// `Unrestricted` means the clause does not narrow anything (e.g. a range that
/// covers every observed value); merging ignores it instead of materializing
/// the whole catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum PartialResult {
    Unrestricted,
    Ids(IdSet),
}

impl PartialResult {
    pub fn empty() -> Self {
        PartialResult::Ids(IdSet::new())
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, PartialResult::Unrestricted)
    }

    /// Resolve against the set of all live items
    pub fn resolve(self, universe: &IdSet) -> IdSet {
        match self {
            PartialResult::Unrestricted => universe.clone(),
            PartialResult::Ids(ids) => ids,
        }
    }
}

impl From<IdSet> for PartialResult {
    fn from(ids: IdSet) -> Self {
        PartialResult::Ids(ids)
    }
}

/// Filter value handed to a facet
#[derive(Debug, Clone, PartialEq)]
pub enum FacetFilter {
    Value(String),
    Range { min: f64, max: f64 },
    Path(Vec<String>),
}

/// Capability shared by every facet variant
pub trait FacetMatcher: Send + Sync {
    /// Never mutates the index. Unknown values give an empty set.
    fn match_filter(&self, filter: &FacetFilter) -> PartialResult;

    /// Same as `match_filter`, delivered through a channel. A dropped receiver is not an error.
    fn match_async(&self, filter: &FacetFilter, sink: Sender<PartialResult>) {
        let _ = sink.send(self.match_filter(filter));
    }

    /// False when the facet is not searchable or the value type does not fit this facet.
    fn add_value_link(&mut self, value: &FieldValue, id: ItemId) -> bool;

    fn remove_value_link(&mut self, value: &FieldValue, id: ItemId);

    /// Distinct indexed values, unordered
    fn values(&self) -> Vec<String>;

    fn aggregate(&self, candidates: &IdSet) -> FacetValues;
}

/// Closed set of facet variants
pub enum Facet {
    Exact(ExactFacet),
    Integer(NumericFacet<i64>),
    Decimal(NumericFacet<f64>),
    Path(PathFacet),
}

impl Facet {
    pub fn new(field: BaseField, config: &Config) -> Self {
        match field.kind {
            FacetKind::Exact => Facet::Exact(ExactFacet::new(field, config)),
            FacetKind::Integer => Facet::Integer(NumericFacet::new(field, config.bucket_max_size)),
            FacetKind::Decimal => Facet::Decimal(NumericFacet::new(field, config.bucket_max_size)),
            FacetKind::Path => Facet::Path(PathFacet::new(field, config)),
        }
    }

    pub fn field(&self) -> &BaseField {
        match self {
            Facet::Exact(f) => &f.field,
            Facet::Integer(f) => &f.field,
            Facet::Decimal(f) => &f.field,
            Facet::Path(f) => &f.field,
        }
    }

    /// Replace metadata that does not affect indexed values
    pub fn set_field(&mut self, field: BaseField) {
        match self {
            Facet::Exact(f) => f.field = field,
            Facet::Integer(f) => f.field = field,
            Facet::Decimal(f) => f.field = field,
            Facet::Path(f) => f.field = field,
        }
    }

    pub fn bucket_count(&self) -> usize {
        match self {
            Facet::Integer(f) => f.index.bucket_count(),
            Facet::Decimal(f) => f.index.bucket_count(),
            _ => 0,
        }
    }

    fn matcher(&self) -> &dyn FacetMatcher {
        match self {
            Facet::Exact(f) => f,
            Facet::Integer(f) => f,
            Facet::Decimal(f) => f,
            Facet::Path(f) => f,
        }
    }

    fn matcher_mut(&mut self) -> &mut dyn FacetMatcher {
        match self {
            Facet::Exact(f) => f,
            Facet::Integer(f) => f,
            Facet::Decimal(f) => f,
            Facet::Path(f) => f,
        }
    }
}

impl FacetMatcher for Facet {
    fn match_filter(&self, filter: &FacetFilter) -> PartialResult {
        self.matcher().match_filter(filter)
    }

    fn add_value_link(&mut self, value: &FieldValue, id: ItemId) -> bool {
        self.matcher_mut().add_value_link(value, id)
    }

    fn remove_value_link(&mut self, value: &FieldValue, id: ItemId) {
        self.matcher_mut().remove_value_link(value, id)
    }

    fn values(&self) -> Vec<String> {
        self.matcher().values()
    }

    fn aggregate(&self, candidates: &IdSet) -> FacetValues {
        self.matcher().aggregate(candidates)
    }
}
