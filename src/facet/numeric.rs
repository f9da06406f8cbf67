use crate::bitmap::id_set::IdSet;
use crate::core::types::{FieldValue, ItemId};
use crate::facet::bucket::{BucketValue, NumericBucketIndex};
use crate::facet::{FacetFilter, FacetMatcher, PartialResult};
use crate::schema::field::BaseField;
use crate::search::results::{BucketCount, FacetValues};

/// Converts a raw field value into the facet's number type
pub trait NumericValue: BucketValue {
    fn from_field(value: &FieldValue) -> Option<Self>;
}

impl NumericValue for i64 {
    fn from_field(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

impl NumericValue for f64 {
    fn from_field(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Decimal(d) if d.is_finite() => Some(*d),
            FieldValue::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }
}

/// Integer or decimal attribute answered through a bucket chain
pub struct NumericFacet<T> {
    pub field: BaseField,
    pub index: NumericBucketIndex<T>,
}

impl<T: NumericValue> NumericFacet<T> {
    pub fn new(field: BaseField, bucket_max_size: f64) -> Self {
        NumericFacet {
            field,
            index: NumericBucketIndex::new(bucket_max_size),
        }
    }

    pub fn matches_range(&self, min: f64, max: f64) -> PartialResult {
        self.index.matches_range(min, max)
    }
}

impl<T: NumericValue> FacetMatcher for NumericFacet<T> {
    fn match_filter(&self, filter: &FacetFilter) -> PartialResult {
        match filter {
            FacetFilter::Range { min, max } => self.matches_range(*min, *max),
            FacetFilter::Value(raw) => match raw.trim().parse::<f64>() {
                Ok(v) => self.matches_range(v, v),
                Err(_) => PartialResult::empty(),
            },
            FacetFilter::Path(_) => PartialResult::empty(),
        }
    }

    fn add_value_link(&mut self, value: &FieldValue, id: ItemId) -> bool {
        if !self.field.searchable {
            return false;
        }
        match T::from_field(value) {
            Some(v) => {
                self.index.insert(v, id);
                true
            }
            None => false,
        }
    }

    fn remove_value_link(&mut self, value: &FieldValue, id: ItemId) {
        if let Some(v) = T::from_field(value) {
            self.index.remove(v, id);
        }
    }

    /// Distinct values in ascending numeric order
    fn values(&self) -> Vec<String> {
        self.index.distinct_values()
            .into_iter()
            .map(|v| v.to_f64().to_string())
            .collect()
    }

    fn aggregate(&self, candidates: &IdSet) -> FacetValues {
        let (views, span) = self.index.aggregate(candidates);
        let count = views.iter().map(|v| v.count as u64).sum();
        let (min, max) = span.unwrap_or((0.0, 0.0));
        FacetValues::Range {
            min,
            max,
            count,
            buckets: views.into_iter()
                .map(|v| BucketCount { min: v.min, max: v.max, count: v.count as u64 })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field::FacetKind;

    #[test]
    fn decimal_facets_accept_integers() {
        let mut price = NumericFacet::<f64>::new(BaseField::new(1, "price", FacetKind::Decimal), 10.0);
        assert!(price.add_value_link(&FieldValue::Decimal(9.95), 1));
        assert!(price.add_value_link(&FieldValue::Integer(12), 2));
        assert!(price.add_value_link(&FieldValue::Decimal(30.0), 3));
        assert!(!price.add_value_link(&FieldValue::Decimal(f64::NAN), 4));
        assert!(!price.add_value_link(&FieldValue::Text("12".into()), 4));

        assert_eq!(price.match_filter(&FacetFilter::Range { min: 10.0, max: 20.0 }), PartialResult::Ids(IdSet::from_slice(&[2])));
        assert_eq!(price.match_filter(&FacetFilter::Value("12".into())), PartialResult::Ids(IdSet::from_slice(&[2])));
        assert_eq!(price.match_filter(&FacetFilter::Value("cheap".into())), PartialResult::empty());
    }

    #[test]
    fn integer_facets_decline_decimals() {
        let mut stock = NumericFacet::<i64>::new(BaseField::new(2, "stock", FacetKind::Integer), 10.0);
        assert!(!stock.add_value_link(&FieldValue::Decimal(1.5), 1));
        assert!(stock.index.is_empty());

        let mut off = NumericFacet::<i64>::new(BaseField::new(3, "weight", FacetKind::Integer).not_searchable(), 10.0);
        assert!(!off.add_value_link(&FieldValue::Integer(5), 1));
    }

    #[test]
    fn aggregate_reports_span_and_count() {
        let mut price = NumericFacet::<i64>::new(BaseField::new(1, "price", FacetKind::Integer), 10.0);
        for (id, v) in [(1, 5), (2, 8), (3, 50), (4, 95)] {
            price.add_value_link(&FieldValue::Integer(v), id);
        }
        let FacetValues::Range { min, max, count, buckets } = price.aggregate(&IdSet::from_slice(&[2, 3, 4])) else {
            panic!("numeric facets aggregate to a range");
        };
        assert_eq!((min, max, count), (8.0, 95.0, 3));
        assert_eq!(buckets.len(), 3);
        assert_eq!(price.values(), vec!["5", "8", "50", "95"]);
    }

    #[test]
    fn values_include_those_inside_a_bucket() {
        let mut size = NumericFacet::<i64>::new(BaseField::new(1, "size", FacetKind::Integer), 100.0);
        for (id, v) in [(1, 8), (2, 5), (3, 7), (4, 7)] {
            size.add_value_link(&FieldValue::Integer(v), id);
        }
        assert_eq!(size.index.bucket_count(), 1);
        assert_eq!(size.values(), vec!["5", "7", "8"]);

        size.remove_value_link(&FieldValue::Integer(7), 3);
        assert_eq!(size.values(), vec!["5", "7", "8"]);
        size.remove_value_link(&FieldValue::Integer(7), 4);
        assert_eq!(size.values(), vec!["5", "8"]);
    }
}
