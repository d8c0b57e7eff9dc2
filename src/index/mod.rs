pub mod shard;
pub mod shard_writer;
pub mod sharded;

pub use shard::TermShard;
pub use shard_writer::ShardWriter;
pub use sharded::{KeywordMatches, ShardedInvertedIndex};
