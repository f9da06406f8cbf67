use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use parking_lot::{Condvar, Mutex};
use rayon::ThreadPool;
use tracing::{error, trace};
use crate::bitmap::id_set::IdSet;
use crate::facet::PartialResult;

/// `(current, next, is_first)` combining step
pub type MergeFn = dyn Fn(&mut IdSet, &IdSet, bool) + Send + Sync;

/// How `add` producers fold into the shared result
#[derive(Clone, Default)]
pub enum MergeRule {
    /// First completion seeds by union, later ones intersect
    #[default]
    SeedThenIntersect,
    Custom(Arc<MergeFn>),
}

impl MergeRule {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&mut IdSet, &IdSet, bool) + Send + Sync + 'static,
    {
        MergeRule::Custom(Arc::new(f))
    }

    /// Intersect only when the incoming set overlaps what we have; otherwise
    /// keep the current result. Used for low-confidence signals.
    pub fn soft_intersect() -> Self {
        MergeRule::custom(|current, next, is_first| {
            if is_first {
                current.merge(next);
            } else if current.has_intersection(next) {
                current.intersect(next);
            }
        })
    }

    pub fn apply(&self, current: &mut IdSet, next: &IdSet, is_first: bool) {
        match self {
            MergeRule::SeedThenIntersect => {
                if is_first {
                    current.merge(next);
                } else {
                    current.intersect(next);
                }
            }
            MergeRule::Custom(f) => f(current, next, is_first),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Role {
    Add,
    Intersect,
    Exclude,
}

#[derive(Default)]
struct MergeState {
    rule: MergeRule,
    result: IdSet,
    seeded: bool,
    narrow: Option<IdSet>,
    excluded: IdSet,
    pending: usize,
}

impl MergeState {
    fn apply(&mut self, role: Role, output: PartialResult) {
        let PartialResult::Ids(ids) = output else {
            // "no restriction" never seeds, narrows or excludes
            return;
        };
        match role {
            Role::Add => {
                let is_first = !self.seeded;
                self.rule.apply(&mut self.result, &ids, is_first);
                self.seeded = true;
            }
            Role::Intersect => {
                self.narrow = Some(match self.narrow.take() {
                    None => ids,
                    Some(mut narrow) => {
                        narrow.intersect(&ids);
                        narrow
                    }
                });
            }
            Role::Exclude => self.excluded.merge(&ids),
        }
    }

    fn finish(&mut self) -> IdSet {
        let result = std::mem::take(&mut self.result);
        let mut result = match (self.seeded, self.narrow.take()) {
            (true, Some(narrow)) => {
                let mut result = result;
                result.intersect(&narrow);
                result
            }
            (true, None) => result,
            (false, Some(narrow)) => narrow,
            (false, None) => IdSet::new(),
        };
        result.exclude(&self.excluded);
        result
    }
}

struct Shared {
    state: Mutex<MergeState>,
    done: Condvar,
}

/// Runs filter producers concurrently and folds their outputs into one set.
///
/// Every merge step happens under one lock; `wait` is the only barrier and
/// the only way to read the result. It consumes the merger, so nothing can
/// be scheduled afterwards. Do not call `wait` from a thread of the pool the
/// producers run on.
pub struct QueryMerger {
    shared: Arc<Shared>,
    pool: Option<Arc<ThreadPool>>,
}

impl Default for QueryMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryMerger {
    /// Producers run on the global rayon pool
    pub fn new() -> Self {
        QueryMerger {
            shared: Arc::new(Shared {
                state: Mutex::new(MergeState::default()),
                done: Condvar::new(),
            }),
            pool: None,
        }
    }

    pub fn with_pool(pool: Arc<ThreadPool>) -> Self {
        let mut merger = Self::new();
        merger.pool = Some(pool);
        merger
    }

    /// Must be set before anything is scheduled
    pub fn with_rule(self, rule: MergeRule) -> Self {
        self.shared.state.lock().rule = rule;
        self
    }

    /// Seed-or-intersect under the merge rule
    pub fn add<F>(&self, producer: F)
    where
        F: FnOnce() -> PartialResult + Send + 'static,
    {
        self.schedule(Role::Add, producer);
    }

    /// Always narrows. With no `add` producers the narrowed set is the result.
    pub fn intersect<F>(&self, producer: F)
    where
        F: FnOnce() -> PartialResult + Send + 'static,
    {
        self.schedule(Role::Intersect, producer);
    }

    /// Unioned into the exclusion set, subtracted once at `wait`
    pub fn exclude<F>(&self, producer: F)
    where
        F: FnOnce() -> PartialResult + Send + 'static,
    {
        self.schedule(Role::Exclude, producer);
    }

    fn schedule<F>(&self, role: Role, producer: F)
    where
        F: FnOnce() -> PartialResult + Send + 'static,
    {
        self.shared.state.lock().pending += 1;
        let shared = Arc::clone(&self.shared);
        let job = move || {
            let output = match catch_unwind(AssertUnwindSafe(producer)) {
                Ok(output) => output,
                Err(_) => {
                    error!(?role, "filter producer panicked, contributing an empty set");
                    PartialResult::empty()
                }
            };
            let mut state = shared.state.lock();
            trace!(?role, restricted = !output.is_unrestricted(), "merging producer output");
            state.apply(role, output);
            state.pending -= 1;
            if state.pending == 0 {
                shared.done.notify_all();
            }
        };
        match &self.pool {
            Some(pool) => pool.spawn(job),
            None => rayon::spawn(job),
        }
    }

    /// Block until every producer finished, then apply exclusions.
    pub fn wait(self) -> IdSet {
        let mut state = self.shared.state.lock();
        while state.pending > 0 {
            self.shared.done.wait(&mut state);
        }
        state.finish()
    }

    /// Like `wait`, but gives up after `timeout`. Producers still running keep
    /// writing into state nobody reads.
    pub fn wait_timeout(self, timeout: Duration) -> Option<IdSet> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while state.pending > 0 {
            if self.shared.done.wait_until(&mut state, deadline).timed_out() && state.pending > 0 {
                return None;
            }
        }
        Some(state.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::thread;

    fn ids(v: &[u32]) -> PartialResult {
        PartialResult::Ids(IdSet::from_slice(v))
    }

    #[test]
    fn first_seeds_rest_intersect() {
        let merger = QueryMerger::new();
        merger.add(|| ids(&[1, 2, 3, 4]));
        merger.add(|| ids(&[2, 3, 4, 5]));
        merger.add(|| ids(&[3, 4, 9]));
        assert_eq!(merger.wait().to_vec(), vec![3, 4]);
    }

    #[test]
    fn unrestricted_is_invisible() {
        let merger = QueryMerger::new();
        merger.add(|| PartialResult::Unrestricted);
        merger.add(|| ids(&[7, 8]));
        merger.add(|| PartialResult::Unrestricted);
        assert_eq!(merger.wait().to_vec(), vec![7, 8]);

        let merger = QueryMerger::new();
        merger.add(|| PartialResult::Unrestricted);
        assert!(merger.wait().is_empty());
    }

    #[test]
    fn exclusions_apply_after_everything_else() {
        let merger = QueryMerger::new();
        merger.exclude(|| ids(&[2]));
        merger.add(|| ids(&[1, 2, 3]));
        merger.exclude(|| ids(&[3, 10]));
        merger.intersect(|| ids(&[1, 2, 3, 4]));
        assert_eq!(merger.wait().to_vec(), vec![1]);
    }

    #[test]
    fn intersect_narrows_without_seeding() {
        let merger = QueryMerger::new();
        merger.intersect(|| ids(&[1, 2, 3]));
        merger.intersect(|| ids(&[2, 3]));
        assert_eq!(merger.wait().to_vec(), vec![2, 3]);

        let merger = QueryMerger::new();
        merger.intersect(|| ids(&[5, 6]));
        merger.add(|| ids(&[6, 7]));
        assert_eq!(merger.wait().to_vec(), vec![6]);
    }

    #[test]
    fn empty_merger_returns_empty() {
        assert!(QueryMerger::new().wait().is_empty());
    }

    #[test]
    fn result_is_independent_of_completion_order() {
        let inputs: Vec<Vec<u32>> = vec![
            (0..200).collect(),
            (50..300).collect(),
            (0..400).step_by(2).collect(),
            (100..150).collect(),
        ];
        let mut expected: Option<Vec<u32>> = None;
        for _ in 0..25 {
            let merger = QueryMerger::new();
            for input in &inputs {
                let input = input.clone();
                let delay = rand::thread_rng().gen_range(0..4);
                merger.add(move || {
                    thread::sleep(Duration::from_millis(delay));
                    PartialResult::Ids(IdSet::from_slice(&input))
                });
            }
            let delay = rand::thread_rng().gen_range(0..4);
            merger.exclude(move || {
                thread::sleep(Duration::from_millis(delay));
                PartialResult::Ids(IdSet::from_slice(&[100, 102]))
            });
            let got = merger.wait().to_vec();
            match &expected {
                None => expected = Some(got),
                Some(e) => assert_eq!(&got, e),
            }
        }
        assert_eq!(expected, Some((104..150).step_by(2).collect()));
    }

    #[test]
    fn custom_rule_replaces_seed_then_intersect() {
        let union_all = MergeRule::custom(|current, next, _| current.merge(next));
        let merger = QueryMerger::new().with_rule(union_all);
        merger.add(|| ids(&[1]));
        merger.add(|| ids(&[2]));
        merger.add(|| ids(&[3]));
        assert_eq!(merger.wait().to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn soft_intersect_keeps_result_on_disjoint_input() {
        let rule = MergeRule::soft_intersect();
        let mut current = IdSet::new();
        rule.apply(&mut current, &IdSet::from_slice(&[1, 2, 3]), true);
        rule.apply(&mut current, &IdSet::from_slice(&[9]), false);
        assert_eq!(current.to_vec(), vec![1, 2, 3]);
        rule.apply(&mut current, &IdSet::from_slice(&[2, 3, 4]), false);
        assert_eq!(current.to_vec(), vec![2, 3]);
    }

    #[test]
    fn wait_timeout_gives_up_on_slow_producers() {
        let merger = QueryMerger::new();
        merger.add(|| {
            thread::sleep(Duration::from_millis(300));
            ids(&[1])
        });
        assert_eq!(merger.wait_timeout(Duration::from_millis(10)), None);

        let merger = QueryMerger::new();
        merger.add(|| ids(&[4]));
        assert_eq!(merger.wait_timeout(Duration::from_secs(5)).map(|s| s.to_vec()), Some(vec![4]));
    }

    #[test]
    fn panicking_producer_contributes_empty_set() {
        let merger = QueryMerger::new();
        merger.exclude(|| panic!("boom"));
        merger.add(|| ids(&[1, 2]));
        assert_eq!(merger.wait().to_vec(), vec![1, 2]);
    }

    #[test]
    fn runs_on_a_dedicated_pool() {
        let pool = Arc::new(rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap());
        let merger = QueryMerger::with_pool(pool);
        for i in 0..10u32 {
            merger.add(move || ids(&[i, 100]));
        }
        assert_eq!(merger.wait().to_vec(), vec![100]);
    }
}
