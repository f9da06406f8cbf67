use std::collections::HashMap;
use unicode_segmentation::UnicodeSegmentation;
use crate::bitmap::id_set::IdSet;
use crate::core::config::Config;
use crate::core::types::{FieldValue, ItemId};
use crate::facet::{FacetFilter, FacetMatcher, PartialResult};
use crate::schema::field::BaseField;
use crate::search::results::{FacetValues, ValueCount};

/// Value → items holding exactly that value
pub struct ExactFacet {
    pub field: BaseField,
    pub values: HashMap<String, IdSet>,
    max_value_len: usize,
    delimiter: char,
}

impl ExactFacet {
    pub fn new(field: BaseField, config: &Config) -> Self {
        ExactFacet {
            field,
            values: HashMap::new(),
            max_value_len: config.max_value_len,
            delimiter: config.multi_value_delimiter,
        }
    }

    /// Trim and cap a raw value. Returns None for blanks.
    fn normalize(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.len() <= self.max_value_len {
            return Some(trimmed.to_string());
        }
        Some(trimmed.graphemes(true).take(self.max_value_len).collect())
    }

    /// Keys a raw value is indexed under, or None if this facet cannot hold it
    fn keys(&self, value: &FieldValue) -> Option<Vec<String>> {
        let keys = match value {
            FieldValue::Text(s) => s
                .split(self.delimiter)
                .filter_map(|part| self.normalize(part))
                .collect(),
            FieldValue::List(items) => items
                .iter()
                .filter_map(|item| self.normalize(item))
                .collect(),
            FieldValue::Integer(n) => vec![n.to_string()],
            FieldValue::Boolean(b) => vec![b.to_string()],
            FieldValue::Decimal(_) | FieldValue::Path(_) => return None,
        };
        Some(keys)
    }
}

impl FacetMatcher for ExactFacet {
    fn match_filter(&self, filter: &FacetFilter) -> PartialResult {
        let key = match filter {
            FacetFilter::Value(v) => self.normalize(v),
            FacetFilter::Path(segments) => self.normalize(&segments.join(" ")),
            FacetFilter::Range { .. } => None,
        };
        key.and_then(|k| self.values.get(&k))
            .map(|ids| PartialResult::Ids(ids.clone()))
            .unwrap_or_else(PartialResult::empty)
    }

    fn add_value_link(&mut self, value: &FieldValue, id: ItemId) -> bool {
        if !self.field.searchable {
            return false;
        }
        let Some(keys) = self.keys(value) else {
            return false;
        };
        for key in keys {
            self.values.entry(key).or_default().add(id);
        }
        true
    }

    fn remove_value_link(&mut self, value: &FieldValue, id: ItemId) {
        let Some(keys) = self.keys(value) else {
            return;
        };
        for key in keys {
            if let Some(ids) = self.values.get_mut(&key) {
                ids.remove(id);
                if ids.is_empty() {
                    self.values.remove(&key);
                }
            }
        }
    }

    fn values(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    fn aggregate(&self, candidates: &IdSet) -> FacetValues {
        let mut counts: Vec<ValueCount> = self.values.iter()
            .filter_map(|(value, ids)| {
                let count = ids.intersection_len(candidates);
                (count > 0).then(|| ValueCount { value: value.clone(), count })
            })
            .collect();
        counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
        FacetValues::Terms(counts)
    }
}
