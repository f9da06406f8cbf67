use std::sync::Arc;
use std::time::Duration;
use parking_lot::Mutex;
use rayon::ThreadPoolBuilder;
use tracing::{debug, info, instrument};
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::stats::IndexStats;
use crate::core::types::{CatalogItem, FieldId};
use crate::index::facet_index::{FacetIndex, FieldValues};
use crate::query::executor::QueryExecutor;
use crate::query::types::FilterRequest;
use crate::schema::field::{BaseField, FieldEvent};
use crate::search::free_text::FreeTextEngine;
use crate::search::results::{SearchResults, Suggestion};

/// In-memory faceted product search.
///
/// Ingestion, field metadata changes and queries may run concurrently from
/// any number of threads. Queries fan out over a dedicated rayon pool; do not
/// call `search` from inside that pool.
pub struct SearchEngine {
    config: Config,
    index: Arc<FacetIndex>,
    text: Arc<FreeTextEngine>,
    executor: QueryExecutor,
    /// Held across the facet and text relink of one item
    ingest: Mutex<()>,
}

impl SearchEngine {
    pub fn new(config: Config) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.worker_threads.max(1))
            .thread_name(|i| format!("facetdex-query-{}", i))
            .build()?;
        let index = Arc::new(FacetIndex::new(&config));
        let text = Arc::new(FreeTextEngine::new(&config)?);
        let executor = QueryExecutor::new(Arc::clone(&index), Arc::clone(&text), Arc::new(pool));

        info!(
            workers = config.worker_threads.max(1),
            free_text_fields = ?config.free_text_fields,
            "search engine ready"
        );
        Ok(SearchEngine { config, index, text, executor, ingest: Mutex::new(()) })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Text fed to the free-text index, in configured field order
    fn document_text(&self, values: &FieldValues) -> String {
        self.config.free_text_fields.iter()
            .filter_map(|field| values.get(field).and_then(|v| v.text()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Full replace of one item. Deleted items are unlinked everywhere.
    ///
    /// Writers are serialized so both indexes always end on the same version
    /// of an item; queries may still observe one index ahead of the other.
    pub fn handle_item<I: CatalogItem>(&self, item: &I) {
        let id = item.id();
        let _guard = self.ingest.lock();
        if item.is_deleted() {
            if let Some(previous) = self.index.unlink_item(id) {
                self.text.remove_document(id, &self.document_text(&previous));
                debug!(item = id, "item deleted");
            }
            return;
        }

        let values = item.fields().clone();
        let text = self.document_text(&values);
        if let Some(previous) = self.index.link_item(id, values) {
            self.text.remove_document(id, &self.document_text(&previous));
        }
        self.text.index_document(id, &text);
    }

    pub fn handle_items<I: CatalogItem>(&self, items: &[I]) {
        for item in items {
            self.handle_item(item);
        }
        debug!(count = items.len(), "batch ingested");
    }

    pub fn apply_field_event(&self, event: FieldEvent) -> Result<()> {
        self.index.apply_field_event(event)
    }

    pub fn field(&self, id: FieldId) -> Option<BaseField> {
        self.index.field(id)
    }

    pub fn facet_values(&self, id: FieldId) -> Vec<String> {
        self.index.values(id)
    }

    #[instrument(skip(self, request), fields(text = %request.text, clauses = request.exact.len() + request.ranges.len()))]
    pub fn search(&self, request: &FilterRequest) -> SearchResults {
        self.executor.execute(request)
    }

    #[instrument(skip(self, request), fields(text = %request.text))]
    pub fn search_with_deadline(&self, request: &FilterRequest, timeout: Duration) -> Result<SearchResults> {
        self.executor.execute_with_deadline(request, timeout)
    }

    pub fn suggest(&self, text: &str, limit: usize) -> Vec<Suggestion> {
        self.text.suggest(text, limit)
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            distinct_tokens: self.text.token_count(),
            ..self.index.stats()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{FieldValue, Item};
    use crate::schema::field::FacetKind;

    const TITLE: FieldId = 1;
    const BRAND: FieldId = 2;

    fn engine() -> SearchEngine {
        let config = Config { worker_threads: 2, ..Config::default() }.with_free_text_fields(vec![TITLE]);
        let engine = SearchEngine::new(config).unwrap();
        engine.apply_field_event(FieldEvent::Upsert(BaseField::new(BRAND, "brand", FacetKind::Exact))).unwrap();
        engine.handle_items(&[
            Item::new(1)
                .with_field(TITLE, FieldValue::Text("Cordless Drill".into()))
                .with_field(BRAND, FieldValue::Text("acme".into())),
            Item::new(2)
                .with_field(TITLE, FieldValue::Text("Hammer drill".into()))
                .with_field(BRAND, FieldValue::Text("bolt".into())),
        ]);
        engine
    }

    #[test]
    fn update_replaces_text_and_facets() {
        let engine = engine();
        engine.handle_item(&Item::new(1)
            .with_field(TITLE, FieldValue::Text("Circular saw".into()))
            .with_field(BRAND, FieldValue::Text("bolt".into())));

        assert!(engine.suggest("cord", 5).is_empty());
        assert_eq!(engine.search(&FilterRequest::text("saw")).item_ids(), vec![1]);
        assert_eq!(engine.search(&FilterRequest::default().with_exact(BRAND, "bolt")).item_ids(), vec![1, 2]);
    }

    #[test]
    fn delete_removes_item_everywhere() {
        let engine = engine();
        engine.handle_item(&Item::deleted(2));
        engine.handle_item(&Item::deleted(2));

        assert_eq!(engine.search(&FilterRequest::text("drill")).item_ids(), vec![1]);
        assert_eq!(engine.search(&FilterRequest::default()).item_ids(), vec![1]);
        assert_eq!(engine.stats().total_items, 1);
    }

    #[test]
    fn suggestions_and_stats() {
        let engine = engine();
        let suggestions = engine.suggest("dr", 3);
        assert_eq!(suggestions[0].word, "Drill");
        assert_eq!(suggestions[0].count, 2);

        let stats = engine.stats();
        assert_eq!(stats.facet_count, 1);
        assert_eq!(stats.distinct_tokens, 3);
    }

    #[test]
    fn racing_updates_leave_indexes_in_agreement() {
        let engine = Arc::new(engine());
        let brands = ["acme", "bolt", "craft", "dyno"];
        let writers: Vec<_> = brands.iter().copied().enumerate()
            .map(|(n, brand)| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    for round in 0..200 {
                        if round % 50 == n {
                            engine.handle_item(&Item::deleted(1));
                        }
                        engine.handle_item(&Item::new(1)
                            .with_field(TITLE, FieldValue::Text(format!("{} model", brand)))
                            .with_field(BRAND, FieldValue::Text(brand.to_string())));
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        // every writer ends on an update, so exactly one brand survives and
        // its title is the only one left in the text index
        let mut surviving = Vec::new();
        for brand in brands {
            let by_facet = engine.search(&FilterRequest::default().with_exact(BRAND, brand)).ids.contains(1);
            let by_text = engine.suggest(brand, 5).iter().any(|s| s.normalized == brand);
            assert_eq!(by_facet, by_text, "indexes disagree on {}", brand);
            if by_facet {
                surviving.push(brand);
            }
        }
        assert_eq!(surviving.len(), 1);
        assert_eq!(engine.suggest("model", 5)[0].count, 1);
    }
}
