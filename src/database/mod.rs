// Persistent storage module
// LanceDB-backed vector index for guideline chunks

pub mod lancedb;

pub use lancedb::vector_store::{SearchResult, VectorStore};
