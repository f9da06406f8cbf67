use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use crossbeam::channel::Sender;
use parking_lot::RwLock;
use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{debug, info, warn};
use crate::bitmap::id_set::IdSet;
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::stats::IndexStats;
use crate::core::types::{FieldId, FieldValue, ItemId};
use crate::facet::{Facet, FacetFilter, FacetMatcher, PartialResult};
use crate::schema::field::{BaseField, FieldEvent};
use crate::search::results::FacetResult;

pub type FieldValues = HashMap<FieldId, FieldValue>;

#[derive(Default)]
struct IndexState {
    facets: HashMap<FieldId, Facet>,
    /// Last linked values per live item, kept for relinking and facet rebuilds
    items: HashMap<ItemId, FieldValues>,
    all_items: IdSet,
}

impl IndexState {
    fn link_values(&mut self, id: ItemId, values: &FieldValues) {
        for (field_id, value) in values {
            let Some(facet) = self.facets.get_mut(field_id) else {
                continue;
            };
            if !facet.add_value_link(value, id) && facet.field().searchable {
                warn!(item = id, field = field_id, ?value, "value declined by facet");
            }
        }
    }

    fn unlink_values(&mut self, id: ItemId, values: &FieldValues) {
        for (field_id, value) in values {
            if let Some(facet) = self.facets.get_mut(field_id) {
                facet.remove_value_link(value, id);
            }
        }
    }
}

/// All facets of the catalog behind one reader-writer lock.
///
/// Readers hold the lock for one match or one aggregation; writers hold it for
/// one item's full unlink and relink.
pub struct FacetIndex {
    config: Config,
    state: RwLock<IndexState>,
}

impl FacetIndex {
    pub fn new(config: &Config) -> Self {
        FacetIndex {
            config: config.clone(),
            state: RwLock::new(IndexState::default()),
        }
    }

    pub fn apply_field_event(&self, event: FieldEvent) -> Result<()> {
        let mut state = self.state.write();
        match event {
            FieldEvent::Upsert(field) => {
                let id = field.id;
                let rebuild = match state.facets.get_mut(&id) {
                    Some(facet) if !facet.field().requires_reindex(&field) => {
                        facet.set_field(field);
                        None
                    }
                    _ => Some(field),
                };
                if let Some(field) = rebuild {
                    let mut facet = Facet::new(field, &self.config);
                    let mut linked = 0usize;
                    for (item, values) in &state.items {
                        if let Some(value) = values.get(&id) {
                            if facet.add_value_link(value, *item) {
                                linked += 1;
                            }
                        }
                    }
                    info!(field = id, kind = ?facet.field().kind, linked, "facet rebuilt");
                    state.facets.insert(id, facet);
                } else {
                    info!(field = id, "facet metadata updated");
                }
                Ok(())
            }
            FieldEvent::Remove(id) => {
                state.facets.remove(&id)
                    .ok_or_else(|| Error::not_found(format!("Field {} not found", id)))?;
                info!(field = id, "facet removed");
                Ok(())
            }
        }
    }

    /// Replace everything indexed for `id`. Returns the values it replaced.
    pub fn link_item(&self, id: ItemId, values: FieldValues) -> Option<FieldValues> {
        let mut state = self.state.write();
        let previous = state.items.remove(&id);
        if let Some(old) = &previous {
            state.unlink_values(id, old);
        }
        state.link_values(id, &values);
        state.items.insert(id, values);
        state.all_items.add(id);
        debug!(item = id, relinked = previous.is_some(), "item linked");
        previous
    }

    /// Drop `id` from every facet. Unknown ids are a no-op.
    pub fn unlink_item(&self, id: ItemId) -> Option<FieldValues> {
        let mut state = self.state.write();
        let previous = state.items.remove(&id)?;
        state.unlink_values(id, &previous);
        state.all_items.remove(id);
        debug!(item = id, "item unlinked");
        Some(previous)
    }

    /// A facet that does not exist matches nothing.
    pub fn match_clause(&self, field_id: FieldId, filter: &FacetFilter) -> PartialResult {
        let state = self.state.read();
        match state.facets.get(&field_id) {
            Some(facet) => facet.match_filter(filter),
            None => {
                debug!(field = field_id, "clause on unknown facet");
                PartialResult::empty()
            }
        }
    }

    /// `match_clause` on `pool`, delivered through `sink`
    pub fn match_async(self: &Arc<Self>, pool: &ThreadPool, field_id: FieldId, filter: FacetFilter, sink: Sender<PartialResult>) {
        let index = Arc::clone(self);
        pool.spawn(move || {
            let state = index.state.read();
            match state.facets.get(&field_id) {
                Some(facet) => facet.match_async(&filter, sink),
                None => {
                    let _ = sink.send(PartialResult::empty());
                }
            }
        });
    }

    /// Value counts within `candidates` for every visible facet not in `pinned`.
    ///
    /// Ordered by priority (highest first), then field id.
    pub fn aggregate(&self, candidates: &IdSet, pinned: &HashSet<FieldId>) -> Vec<FacetResult> {
        let state = self.state.read();
        let mut results: Vec<FacetResult> = state.facets
            .par_iter()
            .filter(|(id, facet)| !facet.field().hide_facet && !pinned.contains(*id))
            .filter_map(|(_, facet)| {
                let values = facet.aggregate(candidates);
                if values.is_empty() {
                    return None;
                }
                let field = facet.field();
                Some(FacetResult {
                    field_id: field.id,
                    name: field.name.clone(),
                    priority: field.priority,
                    linked_id: field.linked_id,
                    values,
                })
            })
            .collect();
        results.sort_by(|a, b| {
            b.priority.total_cmp(&a.priority).then_with(|| a.field_id.cmp(&b.field_id))
        });
        results
    }

    pub fn all_items(&self) -> IdSet {
        self.state.read().all_items.clone()
    }

    pub fn field(&self, id: FieldId) -> Option<BaseField> {
        self.state.read().facets.get(&id).map(|f| f.field().clone())
    }

    /// Distinct values of one facet, unordered
    pub fn values(&self, id: FieldId) -> Vec<String> {
        self.state.read().facets.get(&id).map(|f| f.values()).unwrap_or_default()
    }

    pub fn stats(&self) -> IndexStats {
        let state = self.state.read();
        IndexStats {
            total_items: state.all_items.cardinality(),
            facet_count: state.facets.len(),
            hidden_facets: state.facets.values().filter(|f| f.field().hide_facet).count(),
            numeric_buckets: state.facets.values().map(Facet::bucket_count).sum(),
            distinct_values: state.facets.values().map(|f| f.values().len()).sum(),
            distinct_tokens: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::bounded;
    use crate::core::error::ErrorKind;
    use crate::schema::field::FacetKind;
    use crate::search::results::{FacetValues, ValueCount};

    const BRAND: FieldId = 1;
    const PRICE: FieldId = 2;
    const CATEGORY: FieldId = 3;

    fn values(pairs: Vec<(FieldId, FieldValue)>) -> FieldValues {
        pairs.into_iter().collect()
    }

    fn index() -> FacetIndex {
        let index = FacetIndex::new(&Config::default());
        index.apply_field_event(FieldEvent::Upsert(BaseField::new(BRAND, "brand", FacetKind::Exact).with_priority(2.0))).unwrap();
        index.apply_field_event(FieldEvent::Upsert(BaseField::new(PRICE, "price", FacetKind::Integer).with_priority(1.0))).unwrap();
        index.apply_field_event(FieldEvent::Upsert(BaseField::new(CATEGORY, "category", FacetKind::Path))).unwrap();
        index.link_item(1, values(vec![
            (BRAND, FieldValue::Text("acme".into())),
            (PRICE, FieldValue::Integer(100)),
            (CATEGORY, FieldValue::Text("tools/drills".into())),
        ]));
        index.link_item(2, values(vec![
            (BRAND, FieldValue::Text("bolt".into())),
            (PRICE, FieldValue::Integer(250)),
            (CATEGORY, FieldValue::Text("tools/saws".into())),
        ]));
        index
    }

    fn ids(result: PartialResult) -> Vec<u32> {
        match result {
            PartialResult::Ids(ids) => ids.to_vec(),
            PartialResult::Unrestricted => panic!("expected a restricted result"),
        }
    }

    #[test]
    fn relink_replaces_previous_values() {
        let index = index();
        let previous = index.link_item(1, values(vec![(BRAND, FieldValue::Text("bolt".into()))]));
        assert_eq!(previous.map(|p| p.len()), Some(3));

        assert!(ids(index.match_clause(BRAND, &FacetFilter::Value("acme".into()))).is_empty());
        assert_eq!(ids(index.match_clause(BRAND, &FacetFilter::Value("bolt".into()))), vec![1, 2]);
        assert_eq!(ids(index.match_clause(PRICE, &FacetFilter::Range { min: 50.0, max: 150.0 })), Vec::<u32>::new());
        assert_eq!(index.all_items().to_vec(), vec![1, 2]);
    }

    #[test]
    fn unlink_is_idempotent() {
        let index = index();
        assert!(index.unlink_item(2).is_some());
        assert!(index.unlink_item(2).is_none());
        assert!(ids(index.match_clause(CATEGORY, &FacetFilter::Value("tools/saws".into()))).is_empty());
        assert_eq!(ids(index.match_clause(CATEGORY, &FacetFilter::Value("tools".into()))), vec![1]);
        assert_eq!(index.all_items().to_vec(), vec![1]);
    }

    #[test]
    fn removed_facet_behaves_as_not_found() {
        let index = index();
        index.apply_field_event(FieldEvent::Remove(BRAND)).unwrap();
        assert!(ids(index.match_clause(BRAND, &FacetFilter::Value("acme".into()))).is_empty());

        let err = index.apply_field_event(FieldEvent::Remove(BRAND)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[test]
    fn new_facet_is_backfilled_from_stored_values() {
        let index = FacetIndex::new(&Config::default());
        index.link_item(7, values(vec![(9, FieldValue::Text("red".into()))]));
        assert!(ids(index.match_clause(9, &FacetFilter::Value("red".into()))).is_empty());

        index.apply_field_event(FieldEvent::Upsert(BaseField::new(9, "color", FacetKind::Exact))).unwrap();
        assert_eq!(ids(index.match_clause(9, &FacetFilter::Value("red".into()))), vec![7]);

        // metadata-only change keeps the indexed values
        index.apply_field_event(FieldEvent::Upsert(BaseField::new(9, "colour", FacetKind::Exact).hidden())).unwrap();
        assert_eq!(ids(index.match_clause(9, &FacetFilter::Value("red".into()))), vec![7]);
        assert_eq!(index.field(9).map(|f| f.name), Some("colour".to_string()));

        // turning searchable off empties the facet
        index.apply_field_event(FieldEvent::Upsert(BaseField::new(9, "colour", FacetKind::Exact).not_searchable())).unwrap();
        assert!(ids(index.match_clause(9, &FacetFilter::Value("red".into()))).is_empty());
    }

    #[test]
    fn aggregation_skips_pinned_and_hidden_facets() {
        let index = index();
        index.apply_field_event(FieldEvent::Upsert(BaseField::new(CATEGORY, "category", FacetKind::Path).hidden())).unwrap();

        let candidates = IdSet::from_slice(&[1, 2]);
        let all = index.aggregate(&candidates, &HashSet::new());
        assert_eq!(all.iter().map(|f| f.field_id).collect::<Vec<_>>(), vec![BRAND, PRICE]);
        assert_eq!(all[0].values, FacetValues::Terms(vec![
            ValueCount { value: "acme".into(), count: 1 },
            ValueCount { value: "bolt".into(), count: 1 },
        ]));
        match &all[1].values {
            FacetValues::Range { min, max, count, .. } => {
                assert_eq!((*min, *max, *count), (100.0, 250.0, 2));
            }
            other => panic!("unexpected {:?}", other),
        }

        let pinned: HashSet<FieldId> = [BRAND].into_iter().collect();
        let rest = index.aggregate(&IdSet::from_slice(&[2]), &pinned);
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].field_id, PRICE);
    }

    #[test]
    fn aggregation_carries_linked_field() {
        let index = index();
        index.apply_field_event(FieldEvent::Upsert(
            BaseField::new(PRICE, "price", FacetKind::Integer).with_priority(1.0).linked_to(BRAND),
        )).unwrap();
        assert_eq!(index.field(PRICE).and_then(|f| f.linked_id), Some(BRAND));

        // metadata-only change, values stay linked
        assert_eq!(ids(index.match_clause(PRICE, &FacetFilter::Range { min: 200.0, max: 300.0 })), vec![2]);

        let results = index.aggregate(&IdSet::from_slice(&[1, 2]), &HashSet::new());
        let linked: Vec<(FieldId, Option<FieldId>)> = results.iter().map(|f| (f.field_id, f.linked_id)).collect();
        assert_eq!(linked, vec![(BRAND, None), (PRICE, Some(BRAND)), (CATEGORY, None)]);
    }

    #[test]
    fn async_match_runs_on_pool() {
        let index = Arc::new(index());
        let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
        let (tx, rx) = bounded(2);
        index.match_async(&pool, BRAND, FacetFilter::Value("bolt".into()), tx.clone());
        index.match_async(&pool, 99, FacetFilter::Value("bolt".into()), tx);

        let mut results: Vec<Vec<u32>> = (0..2).map(|_| ids(rx.recv().unwrap())).collect();
        results.sort();
        assert_eq!(results, vec![vec![], vec![2]]);
    }

    #[test]
    fn stats_count_items_and_buckets() {
        let stats = index().stats();
        assert_eq!(stats.total_items, 2);
        assert_eq!(stats.facet_count, 3);
        assert_eq!(stats.numeric_buckets, 2);
    }
}
