use tracing::{debug, info};

use crate::config::Config;
use crate::database::VectorStore;
use crate::embeddings::OpenAiEmbeddings;
use crate::rag::chunker::chunk_text;
use crate::rag::loader::load_guideline;
use crate::{Result, ReviewerError};

/// Query-time handle over the persistent guideline index.
pub struct GuidelineRetriever {
    store: VectorStore,
}

impl GuidelineRetriever {
    /// Load the guideline document, chunk it, and open the persistent index,
    /// building one from the fresh chunks when none exists yet.
    ///
    /// The guideline file is re-read and re-chunked on every start; chunks
    /// are only re-embedded on first build. A stale index is reused silently
    /// if the guideline file changed afterwards; `index --force` rebuilds.
    /// Configuration, validation, and authentication failures here are fatal:
    /// the system must not serve reviews with a broken or absent index.
    #[inline]
    pub async fn initialize(config: &Config) -> Result<Self> {
        let guideline_text = load_guideline(&config.rag.guideline_path)?;
        let chunks = chunk_text(
            &guideline_text,
            config.rag.chunk_size,
            config.rag.chunk_overlap,
        )?;

        let embedder = OpenAiEmbeddings::new(config)?;
        let index_dir = config.vector_index_path();

        let store = match VectorStore::load(&index_dir, embedder.clone()).await {
            Ok(store) => store,
            Err(ReviewerError::NotFound(reason)) => {
                info!("No existing vector index ({}), building one", reason);
                VectorStore::build(&chunks, &index_dir, embedder).await?
            }
            Err(e) => return Err(e),
        };

        Ok(Self { store })
    }

    /// Return up to `k` non-blank chunk texts for `query`, nearest first.
    /// Failures surface as a retrieval error so the caller can degrade to a
    /// review without guideline context.
    #[inline]
    pub async fn retrieve_context(&self, query: &str, k: usize) -> Result<Vec<String>> {
        let results = self
            .store
            .query(query, k)
            .await
            .map_err(|e| ReviewerError::Retrieval(format!("Guideline retrieval failed: {}", e)))?;

        let texts: Vec<String> = results
            .into_iter()
            .map(|r| r.content)
            .filter(|content| !content.trim().is_empty())
            .collect();

        debug!("Retrieved {} context chunks for query", texts.len());
        Ok(texts)
    }

    /// Number of chunks in the backing index
    #[inline]
    pub async fn chunk_count(&self) -> Result<u64> {
        self.store.count_chunks().await
    }
}
