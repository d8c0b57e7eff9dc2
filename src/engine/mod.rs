pub mod ingest;
pub mod search;

pub use ingest::{IngestReport, Ingestor};
pub use search::{SearchEngine, SearchRequest, SearchResponse, SearchState};
