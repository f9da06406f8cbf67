pub mod core;
pub mod bitmap;
pub mod schema;
pub mod facet;
pub mod index;
pub mod analysis;
pub mod search;
pub mod parallel;
pub mod query;

/*
┌──────────────────────────────────────────────────────────────────────────────────────┐
│                             FACETDEX STRUCT ARCHITECTURE                              │
└──────────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────── CORE LAYER ──────────────────────────────────────┐
│                                                                                      │
│  ┌────────────────────────────────────────────────────────────────────────────────┐  │
│  │                            struct SearchEngine                                  │  │
│  │  config: Config                       // explicit settings, no globals          │  │
│  │  index: Arc<FacetIndex>               // every facet behind one RwLock          │  │
│  │  text: Arc<FreeTextEngine>            // tokens, trie, markov chain             │  │
│  │  executor: QueryExecutor              // fan-out over the rayon pool            │  │
│  │  ingest: Mutex<()>                    // one item relinked at a time            │  │
│  └────────────────────────────────────────────────────────────────────────────────┘  │
│                                                                                      │
│  ┌──────────────────┐  ┌──────────────────────┐  ┌──────────────────────────────┐   │
│  │ struct Item      │  │ enum FieldValue      │  │ struct IndexStats            │   │
│  │ • id: ItemId     │  │ • Text / List / Path │  │ • total_items                │   │
│  │ • deleted        │  │ • Integer / Decimal  │  │ • facet_count                │   │
│  │ • fields         │  │ • Boolean            │  │ • numeric_buckets            │   │
│  └──────────────────┘  └──────────────────────┘  │ • distinct_tokens            │   │
│                                                  └──────────────────────────────┘   │
└──────────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────── FACET LAYER ─────────────────────────────────────┐
│                                                                                      │
│  enum Facet ──implements──> trait FacetMatcher                                       │
│    ├── Exact(ExactFacet)            value → IdSet, multi-value split, truncation     │
│    ├── Integer(NumericFacet<i64>)   ─┐                                               │
│    ├── Decimal(NumericFacet<f64>)   ─┴──> NumericBucketIndex                         │
│    │                                      arena of ValueBucket, prev/next links,     │
│    │                                      (id, value) entries per bucket             │
│    └── Path(PathFacet)              segment tree, inclusive ids per node             │
│                                                                                      │
└──────────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────── QUERY LAYER ─────────────────────────────────────┐
│                                                                                      │
│  FilterRequest ──> QueryExecutor ──schedules──> QueryMerger                          │
│                         │                         add / intersect / exclude          │
│                         │                         Mutex<MergeState> + Condvar        │
│                         │                         wait() is the only barrier         │
│                         └──after wait──> FacetIndex::aggregate (par_iter)            │
│                                                                                      │
│  FreeTextEngine: Analyzer ──> inverted HashMap<String, IdSet>                        │
│                           ──> Trie (normalized key → original word + IdSet)          │
│                           ──> MarkovChain (token → next token counts)                │
│                  search: exact ──else──> prefix ──else──> fuzzy                      │
│                                                                                      │
└──────────────────────────────────────────────────────────────────────────────────────┘
*/
