pub mod core;
pub mod analysis;
pub mod bitset;
pub mod compression;
pub mod mmap;
pub mod simd;
pub mod query;
pub mod index;
pub mod ranking;
pub mod dedup;
pub mod store;
pub mod encoder;
pub mod engine;

pub use crate::core::config::Config;
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::types::{DocumentId, ScoredDocument};
pub use crate::engine::{Ingestor, SearchEngine, SearchRequest, SearchResponse};

/*
┌──────────────────────────────────────────────────────────────────────────────────────┐
│                               LITSEARCH ARCHITECTURE                                 │
└──────────────────────────────────────────────────────────────────────────────────────┘

  SearchRequest { keywords, ranking_source, paper_list, n_results }
        │
        ▼
  SearchEngine ──admission RwLock──┬──────────────────────────────────────────┐
        │                          │                                          │
        │ keywords                 │ ranking_source                           │
        ▼                          ▼                                          │
  QueryParser ──> QueryNode     Encoder ──> query embedding                   │
        │                          │                                          │
        ▼                          ▼                                          │
  ShardedInvertedIndex          ShardedRanker                                 │
   ├── TermShard (*.shard)       ├── ShardRegistry (state, device load)       │
   │    ├── fst term dict        ├── IndexRangeResolver per shard             │
   │    └── vbyte/delta postings │     KeywordMatches ∩ paper_list ─> rows    │
   └── rayon fan-out,            └── WorkerHandle per shard (*.emb)           │
       OR per collection               ├── ExactIndex     (device shards)     │
        │                              └── PartitionedIndex (k-means, int8)   │
        └── KeywordMatches ──────────────> candidate rows ──> merged top n ───┘

  Ingestor ──check──> DuplicateIndex ──replay/append──> DuplicateLog (flock)
      │                    md5 > doi > title (+ head/tail windows, fuzzy ratio)
      └──insert──> PaperStore

*/
