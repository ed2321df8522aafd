//! Flat vector store persisted as JSON, searched by cosine similarity

use crate::corpus::{Document, Metadata, read_jsonl};
use crate::error::{RagError, Result};
use nog_llm::{EmbeddingProvider, cosine_similarity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

const EMBED_BATCH_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    pub embedding: Vec<f32>,
}

/// A search result; `distance` is `1 - cosine similarity`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_documents: usize,
    pub embedding_model: String,
    pub dimension: usize,
    pub by_type: BTreeMap<String, usize>,
}

#[derive(Serialize, Deserialize)]
struct StoreFile {
    embedding_model: String,
    dimension: usize,
    documents: Vec<IndexedDocument>,
}

#[derive(Debug, Clone)]
pub struct VectorStore {
    path: PathBuf,
    embedding_model: String,
    dimension: usize,
    documents: Vec<IndexedDocument>,
}

impl VectorStore {
    /// An empty store that will be saved to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            embedding_model: String::new(),
            dimension: 0,
            documents: Vec::new(),
        }
    }

    /// Load the store at `path`; a missing file is an empty store
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self::new(path));
        }

        let contents = std::fs::read_to_string(&path)?;
        let file: StoreFile =
            serde_json::from_str(&contents).map_err(|e| RagError::corrupt(&path, e.to_string()))?;

        if let Some(doc) = file.documents.iter().find(|d| d.embedding.len() != file.dimension) {
            return Err(RagError::corrupt(
                &path,
                format!(
                    "document {} has {} dimensions, expected {}",
                    doc.id,
                    doc.embedding.len(),
                    file.dimension
                ),
            ));
        }

        Ok(Self {
            path,
            embedding_model: file.embedding_model,
            dimension: file.dimension,
            documents: file.documents,
        })
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = StoreFile {
            embedding_model: self.embedding_model.clone(),
            dimension: self.dimension,
            documents: self.documents.clone(),
        };
        std::fs::write(&self.path, serde_json::to_string(&file)?)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[IndexedDocument] {
        &self.documents
    }

    /// Embed and add documents, returning how many were added
    pub async fn add_documents(
        &mut self,
        documents: Vec<Document>,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<usize> {
        let added = documents.len();

        for batch in documents.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|d| d.text.clone()).collect();
            let embeddings = embedder.embed(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(RagError::EmbeddingError(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }

            for (doc, embedding) in batch.iter().zip(embeddings) {
                if self.documents.is_empty() {
                    self.dimension = embedding.len();
                    self.embedding_model = embedder.name().to_string();
                } else if embedding.len() != self.dimension {
                    return Err(RagError::EmbeddingError(format!(
                        "embedding has {} dimensions, store has {}",
                        embedding.len(),
                        self.dimension
                    )));
                }

                self.documents.push(IndexedDocument {
                    id: format!("doc_{}", self.documents.len()),
                    text: doc.text.clone(),
                    metadata: doc.metadata.clone(),
                    embedding,
                });
            }
        }

        Ok(added)
    }

    /// Replace the store at `path` with an index of every document in `jsonl`
    #[instrument(skip(embedder))]
    pub async fn build_from_jsonl(
        path: &Path,
        jsonl: &Path,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Self> {
        let documents = read_jsonl(jsonl)?;
        info!("Loaded {} documents from {}", documents.len(), jsonl.display());

        let mut store = Self::new(path);
        store.add_documents(documents, embedder).await?;
        store.save()?;

        info!("Built index with {} documents", store.len());
        Ok(store)
    }

    /// Top `top_k` documents by cosine similarity, optionally restricted to
    /// one metadata `type`
    pub fn search_by_embedding(
        &self,
        query: &[f32],
        top_k: usize,
        type_filter: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(RagError::EmbeddingError(format!(
                "query has {} dimensions, store has {}",
                query.len(),
                self.dimension
            )));
        }

        let mut scored: Vec<(f32, &IndexedDocument)> = self
            .documents
            .iter()
            .filter(|d| type_filter.is_none_or(|t| d.metadata.doc_type == t))
            .map(|d| (1.0 - cosine_similarity(query, &d.embedding), d))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(distance, d)| SearchHit {
                id: d.id.clone(),
                text: d.text.clone(),
                metadata: d.metadata.clone(),
                distance,
            })
            .collect())
    }

    pub async fn search(
        &self,
        query: &str,
        embedder: &dyn EmbeddingProvider,
        top_k: usize,
        type_filter: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        let mut embeddings = embedder.embed(&[query.to_string()]).await?;
        let embedding = embeddings
            .pop()
            .ok_or_else(|| RagError::EmbeddingError("no embedding returned for query".to_string()))?;
        self.search_by_embedding(&embedding, top_k, type_filter)
    }

    pub fn stats(&self) -> StoreStats {
        let mut by_type = BTreeMap::new();
        for doc in &self.documents {
            *by_type.entry(doc.metadata.doc_type.clone()).or_insert(0) += 1;
        }
        StoreStats {
            total_documents: self.documents.len(),
            embedding_model: self.embedding_model.clone(),
            dimension: self.dimension,
            by_type,
        }
    }
}
