use std::collections::BTreeMap;
use crate::bitmap::id_set::IdSet;
use crate::core::config::Config;
use crate::core::types::{FieldValue, ItemId};
use crate::facet::{FacetFilter, FacetMatcher, PartialResult};
use crate::schema::field::BaseField;
use crate::search::results::{FacetValues, ValueCount};

#[derive(Default)]
struct PathNode {
    /// Every item at or below this node
    ids: IdSet,
    /// Items whose path ends exactly here
    own: IdSet,
    children: BTreeMap<String, PathNode>,
}

impl PathNode {
    fn unlink(&mut self, segments: &[String], id: ItemId) {
        match segments.split_first() {
            None => self.own.remove(id),
            Some((head, rest)) => {
                let Some(child) = self.children.get_mut(head) else {
                    return;
                };
                child.unlink(rest, id);
                if child.ids.is_empty() {
                    self.children.remove(head);
                }
            }
        }
        // another linked path may still pass through this node
        let still_below = self.own.contains(id) || self.children.values().any(|c| c.ids.contains(id));
        if !still_below {
            self.ids.remove(id);
        }
    }

    fn collect(&self, prefix: &mut Vec<String>, depth_limit: usize, visit: &mut dyn FnMut(&[String], &PathNode)) {
        for (segment, child) in &self.children {
            prefix.push(segment.clone());
            visit(prefix.as_slice(), child);
            if depth_limit == 0 || prefix.len() < depth_limit {
                child.collect(prefix, depth_limit, visit);
            }
            prefix.pop();
        }
    }
}

/// Category tree; each node holds all items under its path
pub struct PathFacet {
    pub field: BaseField,
    root: PathNode,
    separator: char,
    max_segment_len: usize,
}

impl PathFacet {
    pub fn new(field: BaseField, config: &Config) -> Self {
        PathFacet {
            field,
            root: PathNode::default(),
            separator: config.path_separator,
            max_segment_len: config.max_value_len,
        }
    }

    fn segments(&self, value: &FieldValue) -> Option<Vec<String>> {
        let raw: Vec<String> = match value {
            FieldValue::Path(parts) => parts.clone(),
            FieldValue::Text(s) => self.split(s),
            _ => return None,
        };
        Some(self.clean(raw))
    }

    fn split(&self, s: &str) -> Vec<String> {
        s.split(self.separator).map(str::to_string).collect()
    }

    fn clean(&self, raw: Vec<String>) -> Vec<String> {
        raw.into_iter()
            .map(|s| s.trim().chars().take(self.max_segment_len).collect::<String>())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn matches_path(&self, segments: &[String]) -> PartialResult {
        if segments.is_empty() {
            return PartialResult::Unrestricted;
        }
        let mut node = &self.root;
        for segment in segments {
            match node.children.get(segment) {
                Some(child) => node = child,
                None => return PartialResult::empty(),
            }
        }
        PartialResult::Ids(node.ids.clone())
    }

    fn depth_limit(&self) -> usize {
        self.field.category_level as usize
    }
}

impl FacetMatcher for PathFacet {
    fn match_filter(&self, filter: &FacetFilter) -> PartialResult {
        match filter {
            FacetFilter::Path(segments) => self.matches_path(&self.clean(segments.clone())),
            FacetFilter::Value(s) => self.matches_path(&self.clean(self.split(s))),
            FacetFilter::Range { .. } => PartialResult::empty(),
        }
    }

    fn add_value_link(&mut self, value: &FieldValue, id: ItemId) -> bool {
        if !self.field.searchable {
            return false;
        }
        let Some(segments) = self.segments(value) else {
            return false;
        };
        let mut node = &mut self.root;
        for segment in segments {
            node = node.children.entry(segment).or_default();
            node.ids.add(id);
        }
        node.own.add(id);
        true
    }

    fn remove_value_link(&mut self, value: &FieldValue, id: ItemId) {
        if let Some(segments) = self.segments(value) {
            self.root.unlink(&segments, id);
        }
    }

    fn values(&self) -> Vec<String> {
        let separator = self.separator.to_string();
        let mut values = Vec::new();
        self.root.collect(&mut Vec::new(), 0, &mut |path, _| values.push(path.join(&separator)));
        values
    }

    fn aggregate(&self, candidates: &IdSet) -> FacetValues {
        let separator = self.separator.to_string();
        let mut counts = Vec::new();
        self.root.collect(&mut Vec::new(), self.depth_limit(), &mut |path, node| {
            let count = node.ids.intersection_len(candidates);
            if count > 0 {
                counts.push(ValueCount { value: path.join(&separator), count });
            }
        });
        FacetValues::Terms(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field::FacetKind;

    fn path(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    fn facet() -> PathFacet {
        PathFacet::new(BaseField::new(5, "category", FacetKind::Path), &Config::default())
    }

    fn ids(result: PartialResult) -> Vec<u32> {
        match result {
            PartialResult::Ids(ids) => ids.to_vec(),
            PartialResult::Unrestricted => panic!("expected a restricted result"),
        }
    }

    #[test]
    fn ancestors_include_descendants() {
        let mut f = facet();
        assert!(f.add_value_link(&FieldValue::Path(path(&["a", "b", "c"])), 1));
        assert!(f.add_value_link(&FieldValue::Path(path(&["a", "b", "d"])), 2));

        assert_eq!(ids(f.match_filter(&FacetFilter::Path(path(&["a"])))), vec![1, 2]);
        assert_eq!(ids(f.match_filter(&FacetFilter::Path(path(&["a", "b"])))), vec![1, 2]);
        assert_eq!(ids(f.match_filter(&FacetFilter::Path(path(&["a", "b", "c"])))), vec![1]);
        assert!(ids(f.match_filter(&FacetFilter::Path(path(&["a", "x"])))).is_empty());
        assert_eq!(ids(f.match_filter(&FacetFilter::Value("a/b/d".into()))), vec![2]);
        assert!(f.match_filter(&FacetFilter::Path(Vec::new())).is_unrestricted());
    }

    #[test]
    fn removal_keeps_ancestors_still_reached_by_another_path() {
        let mut f = facet();
        f.add_value_link(&FieldValue::Path(path(&["a", "b", "c"])), 1);
        f.add_value_link(&FieldValue::Path(path(&["a", "e"])), 1);
        f.add_value_link(&FieldValue::Path(path(&["a", "b", "d"])), 2);

        f.remove_value_link(&FieldValue::Path(path(&["a", "b", "c"])), 1);
        assert_eq!(ids(f.match_filter(&FacetFilter::Path(path(&["a"])))), vec![1, 2]);
        assert_eq!(ids(f.match_filter(&FacetFilter::Path(path(&["a", "b"])))), vec![2]);
        assert!(ids(f.match_filter(&FacetFilter::Path(path(&["a", "b", "c"])))).is_empty());

        let mut values = f.values();
        values.sort();
        assert_eq!(values, vec!["a", "a/b", "a/b/d", "a/e"]);
    }

    #[test]
    fn removal_is_idempotent() {
        let mut f = facet();
        f.add_value_link(&FieldValue::Text("a/b".into()), 1);
        f.remove_value_link(&FieldValue::Text("a/b".into()), 1);
        f.remove_value_link(&FieldValue::Text("a/b".into()), 1);
        assert!(f.values().is_empty());
        assert!(ids(f.match_filter(&FacetFilter::Value("a".into()))).is_empty());
    }

    #[test]
    fn aggregate_respects_category_level() {
        let mut field = BaseField::new(5, "category", FacetKind::Path);
        field.category_level = 1;
        let mut f = PathFacet::new(field, &Config::default());
        f.add_value_link(&FieldValue::Path(path(&["tools", "saws"])), 1);
        f.add_value_link(&FieldValue::Path(path(&["garden"])), 2);

        let FacetValues::Terms(counts) = f.aggregate(&IdSet::from_slice(&[1, 2])) else {
            panic!("path facets aggregate to terms");
        };
        assert_eq!(counts, vec![
            ValueCount { value: "garden".into(), count: 1 },
            ValueCount { value: "tools".into(), count: 1 },
        ]);
    }

    #[test]
    fn declines_numbers() {
        let mut f = facet();
        assert!(!f.add_value_link(&FieldValue::Integer(3), 1));
    }
}
