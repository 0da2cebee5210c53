// LanceDB vector database module
// Handles vector storage and similarity search for guideline chunks

pub mod vector_store;

use serde::{Deserialize, Serialize};

/// Provenance label stored with every guideline chunk
pub const GUIDELINE_SOURCE: &str = "guidelines";

/// Embedding record stored in LanceDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Unique identifier for this record
    pub id: String,
    /// The vector embedding; dimension is model-defined and uniform per index
    pub vector: Vec<f32>,
    /// The chunk text this embedding represents
    pub content: String,
    /// Provenance label, e.g. "guidelines"
    pub source: String,
    /// Insertion order of the chunk within the index
    pub chunk_index: u32,
    /// Timestamp when this record was created
    pub created_at: String,
}
