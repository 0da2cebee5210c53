// Retrieval-augmented generation module
// Handles guideline loading, chunking, and query-time context retrieval

pub mod chunker;
pub mod loader;
pub mod retriever;

pub use chunker::{GuidelineChunk, chunk_text};
pub use loader::load_guideline;
pub use retriever::GuidelineRetriever;
