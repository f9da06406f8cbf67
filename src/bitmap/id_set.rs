use std::fmt;
use roaring::RoaringBitmap;
use crate::core::types::ItemId;

/// Compact set of item ids backed by a roaring bitmap.
///
/// Iteration is always in ascending id order. Every operation is total: an
/// empty (default) set is a valid operand everywhere and nothing panics.
#[derive(Clone, Default)]
pub struct IdSet(RoaringBitmap);

impl IdSet {
    pub fn new() -> Self {
        IdSet(RoaringBitmap::new())
    }

    pub fn from_slice(ids: &[ItemId]) -> Self {
        IdSet(ids.iter().copied().collect())
    }

    pub fn add(&mut self, id: ItemId) {
        self.0.insert(id);
    }

    pub fn remove(&mut self, id: ItemId) {
        self.0.remove(id);
    }

    /// A ∪ B, in place
    pub fn merge(&mut self, other: &IdSet) {
        self.0 |= &other.0;
    }

    /// A ∩ B, in place
    pub fn intersect(&mut self, other: &IdSet) {
        self.0 &= &other.0;
    }

    /// A ∖ B, in place
    pub fn exclude(&mut self, other: &IdSet) {
        self.0 -= &other.0;
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.0.contains(id)
    }

    pub fn cardinality(&self) -> u64 {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn for_each<F: FnMut(ItemId)>(&self, mut f: F) {
        for id in self.0.iter() {
            f(id);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.0.iter()
    }

    pub fn to_vec(&self) -> Vec<ItemId> {
        self.0.iter().collect()
    }

    /// Neither operand is mutated; the smaller one drives the probe.
    pub fn has_intersection(&self, other: &IdSet) -> bool {
        let (small, large) = order_by_size(self, other);
        if small.is_empty() {
            return false;
        }
        !small.0.is_disjoint(&large.0)
    }

    pub fn intersection_len(&self, other: &IdSet) -> u64 {
        let (small, large) = order_by_size(self, other);
        if small.is_empty() {
            return 0;
        }
        small.0.intersection_len(&large.0)
    }

    pub fn min(&self) -> Option<ItemId> {
        self.0.min()
    }

    pub fn max(&self) -> Option<ItemId> {
        self.0.max()
    }
}

fn order_by_size<'a>(a: &'a IdSet, b: &'a IdSet) -> (&'a IdSet, &'a IdSet) {
    if a.cardinality() <= b.cardinality() { (a, b) } else { (b, a) }
}

impl PartialEq for IdSet {
    fn eq(&self, other: &Self) -> bool {
        let len = self.cardinality();
        len == other.cardinality() && self.intersection_len(other) == len
    }
}

impl Eq for IdSet {}

impl fmt::Debug for IdSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.iter()).finish()
    }
}

impl FromIterator<ItemId> for IdSet {
    fn from_iter<I: IntoIterator<Item = ItemId>>(iter: I) -> Self {
        IdSet(iter.into_iter().collect())
    }
}

impl Extend<ItemId> for IdSet {
    fn extend<I: IntoIterator<Item = ItemId>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}
