use std::fmt::Debug;
use crate::bitmap::id_set::IdSet;
use crate::core::types::ItemId;
use crate::facet::PartialResult;

/// Numeric type a bucket chain can hold
pub trait BucketValue: Copy + PartialOrd + Debug + Send + Sync + 'static {
    fn to_f64(self) -> f64;
}

impl BucketValue for i64 {
    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl BucketValue for f64 {
    fn to_f64(self) -> f64 {
        self
    }
}

type Slot = usize;

/// One contiguous value range in the chain
#[derive(Debug)]
struct ValueBucket<T> {
    min: T,
    max: T,
    count: usize,
    ids: IdSet,
    /// (item, value) pairs, used to cut boundary buckets exactly
    entries: Vec<(ItemId, T)>,
    prev: Option<Slot>,
    next: Option<Slot>,
}

impl<T: BucketValue> ValueBucket<T> {
    fn holds(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Read-only snapshot of one bucket, in chain order
#[derive(Debug, Clone, PartialEq)]
pub struct BucketView {
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

/// Ordered, doubly-linked chain of value buckets.
///
/// Buckets never overlap and are linked in ascending `min` order. A bucket
/// widens only by absorbing values next to it, and only while its span stays
/// below `max_size`; otherwise a new bucket is linked in beside it.
pub struct NumericBucketIndex<T> {
    buckets: Vec<Option<ValueBucket<T>>>,
    free: Vec<Slot>,
    /// Last touched bucket; every walk starts here
    anchor: Option<Slot>,
    max_size: f64,
    bounds: Option<(T, T)>,
    len: usize,
}

impl<T: BucketValue> NumericBucketIndex<T> {
    pub fn new(max_size: f64) -> Self {
        NumericBucketIndex {
            buckets: Vec::new(),
            free: Vec::new(),
            anchor: None,
            max_size,
            bounds: None,
            len: 0,
        }
    }

    /// Number of indexed (value, id) pairs
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len() - self.free.len()
    }

    /// Smallest and largest value ever observed while non-empty
    pub fn bounds(&self) -> Option<(T, T)> {
        self.bounds
    }

    pub fn insert(&mut self, value: T, id: ItemId) {
        let slot = self.find_or_create_bucket(value);
        let bucket = self.bucket_mut(slot);
        if value < bucket.min {
            bucket.min = value;
        }
        if value > bucket.max {
            bucket.max = value;
        }
        bucket.count += 1;
        bucket.entries.push((id, value));
        bucket.ids.add(id);
        self.anchor = Some(slot);
        self.len += 1;

        self.bounds = match self.bounds {
            None => Some((value, value)),
            Some((lo, hi)) => Some((
                if value < lo { value } else { lo },
                if value > hi { value } else { hi },
            )),
        };
    }

    /// Returns false when the pair was not indexed
    pub fn remove(&mut self, value: T, id: ItemId) -> bool {
        let Some(slot) = self.locate(value) else {
            return false;
        };
        let bucket = self.bucket_mut(slot);
        let Some(pos) = bucket.entries.iter().position(|&(i, v)| i == id && v == value) else {
            return false;
        };
        bucket.entries.swap_remove(pos);
        bucket.count -= 1;
        if !bucket.entries.iter().any(|&(i, _)| i == id) {
            bucket.ids.remove(id);
        }
        let emptied = bucket.count == 0;
        self.len -= 1;

        if emptied {
            self.unlink(slot);
        }
        if self.len == 0 {
            self.bounds = None;
        }
        true
    }

    /// Ids whose value lies in `[min, max]`.
    ///
    /// `min > max` gives an empty set. A range covering every observed value
    /// gives `Unrestricted` rather than a copy of all ids.
    pub fn matches_range(&self, min: f64, max: f64) -> PartialResult {
        // also rejects NaN bounds
        if !(min <= max) {
            return PartialResult::empty();
        }
        let Some((lo, hi)) = self.bounds else {
            return PartialResult::empty();
        };
        if min <= lo.to_f64() && max >= hi.to_f64() {
            return PartialResult::Unrestricted;
        }

        let mut result = IdSet::new();
        let mut cursor = self.seek(min);
        while let Some(slot) = cursor {
            let bucket = self.bucket(slot);
            if bucket.min.to_f64() > max {
                break;
            }
            if bucket.min.to_f64() >= min && bucket.max.to_f64() <= max {
                result.merge(&bucket.ids);
            } else {
                for &(id, value) in &bucket.entries {
                    let v = value.to_f64();
                    if v >= min && v <= max {
                        result.add(id);
                    }
                }
            }
            cursor = bucket.next;
        }
        PartialResult::Ids(result)
    }

    /// Buckets in ascending order
    pub fn buckets(&self) -> Vec<BucketView> {
        let mut views = Vec::with_capacity(self.bucket_count());
        let mut cursor = self.head();
        while let Some(slot) = cursor {
            let bucket = self.bucket(slot);
            views.push(BucketView {
                min: bucket.min.to_f64(),
                max: bucket.max.to_f64(),
                count: bucket.count,
            });
            cursor = bucket.next;
        }
        views
    }

    /// Every distinct stored value, ascending
    pub fn distinct_values(&self) -> Vec<T> {
        let mut values = Vec::with_capacity(self.len);
        let mut cursor = self.head();
        while let Some(slot) = cursor {
            let bucket = self.bucket(slot);
            let start = values.len();
            values.extend(bucket.entries.iter().map(|&(_, value)| value));
            // buckets are disjoint and ordered, so sorting each run is enough
            values[start..].sort_by(|a: &T, b: &T| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            cursor = bucket.next;
        }
        values.dedup();
        values
    }

    /// Per-bucket counts restricted to `candidates`, plus the observed
    /// min/max among candidate values.
    pub fn aggregate(&self, candidates: &IdSet) -> (Vec<BucketView>, Option<(f64, f64)>) {
        let mut views = Vec::new();
        let mut span: Option<(f64, f64)> = None;
        let mut cursor = self.head();
        while let Some(slot) = cursor {
            let bucket = self.bucket(slot);
            cursor = bucket.next;
            if !bucket.ids.has_intersection(candidates) {
                continue;
            }
            let mut count = 0;
            for &(id, value) in &bucket.entries {
                if !candidates.contains(id) {
                    continue;
                }
                count += 1;
                let v = value.to_f64();
                span = Some(match span {
                    None => (v, v),
                    Some((lo, hi)) => (lo.min(v), hi.max(v)),
                });
            }
            views.push(BucketView {
                min: bucket.min.to_f64(),
                max: bucket.max.to_f64(),
                count,
            });
        }
        (views, span)
    }

    /// Place `value` in a bucket that can hold it, creating one if needed.
    ///
    /// When the neighbour in the walking direction cannot take the value and
    /// the value falls in the gap before it, a new bucket goes into that gap
    /// instead of walking further.
    fn find_or_create_bucket(&mut self, value: T) -> Slot {
        let Some(mut current) = self.anchor else {
            return self.allocate(value, None, None);
        };
        loop {
            if self.can_fit(current, value) {
                return current;
            }
            let bucket = self.bucket(current);
            if value > bucket.max {
                match bucket.next {
                    None => return self.allocate(value, Some(current), None),
                    Some(next) => {
                        if self.can_fit(next, value) {
                            return next;
                        }
                        if value < self.bucket(next).min {
                            return self.allocate(value, Some(current), Some(next));
                        }
                        current = next;
                    }
                }
            } else {
                match bucket.prev {
                    None => return self.allocate(value, None, Some(current)),
                    Some(prev) => {
                        if self.can_fit(prev, value) {
                            return prev;
                        }
                        if value > self.bucket(prev).max {
                            return self.allocate(value, Some(prev), Some(current));
                        }
                        current = prev;
                    }
                }
            }
        }
    }

    /// Inside the bucket, or absorbable without exceeding `max_size` and
    /// without crossing into a neighbour.
    fn can_fit(&self, slot: Slot, value: T) -> bool {
        let bucket = self.bucket(slot);
        if bucket.holds(value) {
            return true;
        }
        if value < bucket.min {
            if let Some(prev) = bucket.prev {
                if value <= self.bucket(prev).max {
                    return false;
                }
            }
            bucket.max.to_f64() - value.to_f64() < self.max_size
        } else {
            if let Some(next) = bucket.next {
                if value >= self.bucket(next).min {
                    return false;
                }
            }
            value.to_f64() - bucket.min.to_f64() < self.max_size
        }
    }

    fn allocate(&mut self, value: T, prev: Option<Slot>, next: Option<Slot>) -> Slot {
        let bucket = ValueBucket {
            min: value,
            max: value,
            count: 0,
            ids: IdSet::new(),
            entries: Vec::new(),
            prev,
            next,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.buckets[slot] = Some(bucket);
                slot
            }
            None => {
                self.buckets.push(Some(bucket));
                self.buckets.len() - 1
            }
        };
        if let Some(p) = prev {
            self.bucket_mut(p).next = Some(slot);
        }
        if let Some(n) = next {
            self.bucket_mut(n).prev = Some(slot);
        }
        slot
    }

    fn unlink(&mut self, slot: Slot) {
        let Some(bucket) = self.buckets[slot].take() else {
            return;
        };
        if let Some(p) = bucket.prev {
            self.bucket_mut(p).next = bucket.next;
        }
        if let Some(n) = bucket.next {
            self.bucket_mut(n).prev = bucket.prev;
        }
        self.free.push(slot);
        if self.anchor == Some(slot) {
            self.anchor = bucket.prev.or(bucket.next);
        }
    }

    /// Bucket whose range holds `value`
    fn locate(&self, value: T) -> Option<Slot> {
        let mut current = self.anchor?;
        loop {
            let bucket = self.bucket(current);
            if bucket.holds(value) {
                return Some(current);
            }
            current = if value < bucket.min {
                let prev = bucket.prev?;
                if value > self.bucket(prev).max {
                    return None;
                }
                prev
            } else {
                let next = bucket.next?;
                if value < self.bucket(next).min {
                    return None;
                }
                next
            };
        }
    }

    /// First bucket whose max is >= `value`
    fn seek(&self, value: f64) -> Option<Slot> {
        let mut current = self.anchor?;
        while let Some(prev) = self.bucket(current).prev {
            if self.bucket(prev).max.to_f64() >= value {
                current = prev;
            } else {
                break;
            }
        }
        while self.bucket(current).max.to_f64() < value {
            current = self.bucket(current).next?;
        }
        Some(current)
    }

    fn head(&self) -> Option<Slot> {
        let mut current = self.anchor?;
        while let Some(prev) = self.bucket(current).prev {
            current = prev;
        }
        Some(current)
    }

    // Slots reachable through links or the anchor are always occupied.
    fn bucket(&self, slot: Slot) -> &ValueBucket<T> {
        match &self.buckets[slot] {
            Some(bucket) => bucket,
            None => unreachable!("linked bucket slot {} is free", slot),
        }
    }

    fn bucket_mut(&mut self, slot: Slot) -> &mut ValueBucket<T> {
        match &mut self.buckets[slot] {
            Some(bucket) => bucket,
            None => unreachable!("linked bucket slot {} is free", slot),
        }
    }
}
