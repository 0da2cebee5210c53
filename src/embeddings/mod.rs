// Embeddings module
// Handles embedding generation through the OpenAI embeddings API

pub mod openai;

pub use openai::OpenAiEmbeddings;
