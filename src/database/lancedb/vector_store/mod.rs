
use super::{EmbeddingRecord, GUIDELINE_SOURCE};
use crate::embeddings::OpenAiEmbeddings;
use crate::rag::chunker::GuidelineChunk;
use crate::{Result, ReviewerError};
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

const TABLE_NAME: &str = "guideline_chunks";

/// Persistent vector index over guideline chunks, backed by LanceDB.
///
/// The index is built once per guideline source and read-shared afterwards;
/// there is no per-row mutation API. Rebuilding means a fresh `build`.
pub struct VectorStore {
    connection: Connection,
    table_name: String,
    embedder: OpenAiEmbeddings,
    vector_dimension: usize,
}

/// Single nearest-neighbor hit from a similarity query
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub content: String,
    pub source: String,
    pub chunk_index: u32,
    pub distance: f32,
    pub similarity_score: f32,
}

impl VectorStore {
    /// Embed all chunks and persist them under `index_dir`, replacing any
    /// existing index there. All-or-nothing: either every chunk is written in
    /// one batch or the build fails.
    #[inline]
    pub async fn build(
        chunks: &[GuidelineChunk],
        index_dir: &Path,
        embedder: OpenAiEmbeddings,
    ) -> Result<Self> {
        if chunks.is_empty() {
            return Err(ReviewerError::Validation(
                "Cannot build a vector index with no chunks".to_string(),
            ));
        }

        info!(
            "Building vector index at {} from {} chunks",
            index_dir.display(),
            chunks.len()
        );

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed(&texts)?;

        let vector_dimension = vectors[0].len();
        if vectors.iter().any(|v| v.len() != vector_dimension) {
            return Err(ReviewerError::Embedding(
                "Embedding backend returned vectors of mixed dimensions".to_string(),
            ));
        }

        let created_at = chrono::Utc::now().to_rfc3339();
        let records: Vec<EmbeddingRecord> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddingRecord {
                id: uuid::Uuid::new_v4().to_string(),
                vector,
                content: chunk.text.clone(),
                source: GUIDELINE_SOURCE.to_string(),
                chunk_index: u32::try_from(chunk.chunk_index).unwrap_or(u32::MAX),
                created_at: created_at.clone(),
            })
            .collect();

        std::fs::create_dir_all(index_dir).map_err(|e| {
            ReviewerError::Database(format!("Failed to create index directory: {}", e))
        })?;

        let connection = connect_at(index_dir).await?;

        let store = Self {
            connection,
            table_name: TABLE_NAME.to_string(),
            embedder,
            vector_dimension,
        };

        store.drop_table_if_exists().await?;
        store.create_table(&records).await?;

        info!("Vector index built with {} chunks", records.len());
        Ok(store)
    }

    /// Open an existing index at `index_dir`. Fails with a not-found error
    /// when the directory is absent or empty, which the retriever uses as the
    /// signal to build instead.
    #[inline]
    pub async fn load(index_dir: &Path, embedder: OpenAiEmbeddings) -> Result<Self> {
        if !has_existing_index(index_dir) {
            return Err(ReviewerError::NotFound(format!(
                "Vector index not found at: {}",
                index_dir.display()
            )));
        }

        debug!("Loading vector index from {}", index_dir.display());
        let connection = connect_at(index_dir).await?;

        let table_names = connection
            .table_names()
            .execute()
            .await
            .map_err(|e| ReviewerError::Database(format!("Failed to list tables: {}", e)))?;

        if !table_names.contains(&TABLE_NAME.to_string()) {
            return Err(ReviewerError::NotFound(format!(
                "Vector index at {} has no {} table",
                index_dir.display(),
                TABLE_NAME
            )));
        }

        let mut store = Self {
            connection,
            table_name: TABLE_NAME.to_string(),
            embedder,
            vector_dimension: 0,
        };
        store.vector_dimension = store.detect_vector_dimension().await?;

        info!(
            "Loaded vector index from {} ({} dimensions)",
            index_dir.display(),
            store.vector_dimension
        );
        Ok(store)
    }

    /// Embed `text` and return the `k` nearest chunks, nearest first, ties
    /// broken by stored insertion order. `k == 0` returns an empty result.
    #[inline]
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        debug!("Querying vector index for {} nearest chunks", k);

        let query_vector = self.embedder.embed_one(text)?;
        if query_vector.len() != self.vector_dimension {
            return Err(ReviewerError::Embedding(format!(
                "Query embedding dimension {} does not match index dimension {}",
                query_vector.len(),
                self.vector_dimension
            )));
        }

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| ReviewerError::Database(format!("Failed to open table: {}", e)))?;

        let results = table
            .vector_search(query_vector.as_slice())
            .map_err(|e| ReviewerError::Database(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(k)
            .execute()
            .await
            .map_err(|e| ReviewerError::Database(format!("Failed to execute search: {}", e)))?;

        let mut search_results = self.parse_search_results_stream(results).await?;
        search_results.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.chunk_index.cmp(&b.chunk_index))
        });

        Ok(search_results)
    }

    /// Total number of chunks stored in the index
    #[inline]
    pub async fn count_chunks(&self) -> Result<u64> {
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| ReviewerError::Database(format!("Failed to open table: {}", e)))?;

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| ReviewerError::Database(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    async fn detect_vector_dimension(&self) -> Result<usize> {
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| ReviewerError::Database(format!("Failed to open table: {}", e)))?;

        let schema = table
            .schema()
            .await
            .map_err(|e| ReviewerError::Database(format!("Failed to get table schema: {}", e)))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return Ok(*size as usize);
                }
            }
        }

        Err(ReviewerError::Database(
            "Could not find vector column or determine dimension".to_string(),
        ))
    }

    fn create_schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    self.vector_dimension as i32,
                ),
                false,
            ),
            Field::new("content", DataType::Utf8, false),
            Field::new("source", DataType::Utf8, false),
            Field::new("chunk_index", DataType::UInt32, false),
            Field::new("created_at", DataType::Utf8, false),
        ]))
    }

    async fn create_table(&self, records: &[EmbeddingRecord]) -> Result<()> {
        let record_batch = self.create_record_batch(records)?;
        let schema = record_batch.schema();

        self.connection
            .create_empty_table(&self.table_name, schema.clone())
            .execute()
            .await
            .map_err(|e| ReviewerError::Database(format!("Failed to create table: {}", e)))?;

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| ReviewerError::Database(format!("Failed to open table: {}", e)))?;

        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| ReviewerError::Database(format!("Failed to insert chunks: {}", e)))?;

        Ok(())
    }

    fn create_record_batch(&self, records: &[EmbeddingRecord]) -> Result<RecordBatch> {
        let len = records.len();

        let mut ids = Vec::with_capacity(len);
        let mut contents = Vec::with_capacity(len);
        let mut sources = Vec::with_capacity(len);
        let mut chunk_indices = Vec::with_capacity(len);
        let mut created_ats = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * self.vector_dimension);

        for record in records {
            ids.push(record.id.as_str());
            contents.push(record.content.as_str());
            sources.push(record.source.as_str());
            chunk_indices.push(record.chunk_index);
            created_ats.push(record.created_at.as_str());
            flat_values.extend_from_slice(&record.vector);
        }

        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            field,
            self.vector_dimension as i32,
            Arc::new(values_array),
            None,
        )
        .map_err(|e| ReviewerError::Database(format!("Failed to create vector array: {}", e)))?;

        let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(contents)),
            Arc::new(StringArray::from(sources)),
            Arc::new(UInt32Array::from(chunk_indices)),
            Arc::new(StringArray::from(created_ats)),
        ];

        RecordBatch::try_new(self.create_schema(), arrays)
            .map_err(|e| ReviewerError::Database(format!("Failed to create record batch: {}", e)))
    }

    async fn parse_search_results_stream(
        &self,
        mut results: lancedb::arrow::SendableRecordBatchStream,
    ) -> Result<Vec<SearchResult>> {
        let mut search_results = Vec::new();

        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| ReviewerError::Database(format!("Failed to read result stream: {}", e)))?
        {
            search_results.extend(parse_search_batch(&batch)?);
        }

        debug!("Parsed {} search results from stream", search_results.len());
        Ok(search_results)
    }

    async fn drop_table_if_exists(&self) -> Result<()> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| ReviewerError::Database(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&self.table_name) {
            info!("Dropping existing {} table before rebuild", self.table_name);
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(|e| ReviewerError::Database(format!("Failed to drop table: {}", e)))?;
        }

        Ok(())
    }
}

async fn connect_at(index_dir: &Path) -> Result<Connection> {
    let uri = format!("file://{}", index_dir.display());
    lancedb::connect(&uri)
        .execute()
        .await
        .map_err(|e| ReviewerError::Database(format!("Failed to connect to LanceDB: {}", e)))
}

fn has_existing_index(index_dir: &Path) -> bool {
    if !index_dir.exists() {
        return false;
    }
    std::fs::read_dir(index_dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>> {
    let contents = string_column(batch, "content")?;
    let sources = string_column(batch, "source")?;

    let chunk_indices = batch
        .column_by_name("chunk_index")
        .ok_or_else(|| ReviewerError::Database("Missing chunk_index column".to_string()))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| ReviewerError::Database("Invalid chunk_index column type".to_string()))?;

    let distances = batch
        .column_by_name("_distance")
        .map(|col| col.as_any().downcast_ref::<Float32Array>());

    let mut search_results = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let distance = distances
            .flatten()
            .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

        search_results.push(SearchResult {
            content: contents.value(row).to_string(),
            source: sources.value(row).to_string(),
            chunk_index: chunk_indices.value(row),
            distance,
            similarity_score: 1.0 - distance,
        });
    }

    Ok(search_results)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| ReviewerError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| ReviewerError::Database(format!("Invalid {} column type", name)))
}
