pub mod backend;
pub mod embedding;
pub mod exact;
pub mod partitioned;
pub mod ranker;
pub mod registry;
pub mod resolver;
pub mod worker;

pub use embedding::{EmbeddingShard, EmbeddingShardWriter, PositionMapping};
pub use ranker::{AttachReport, ShardedRanker};
pub use registry::ShardState;
