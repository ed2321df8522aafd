//! Retrieval-augmented question answering over NOG news, filings and financials
//!
//! This crate covers the document side of the toolkit:
//!
//! - Ingestion from NewsAPI, SEC EDGAR and Alpha Vantage
//! - Corpus building into JSON Lines with per-source statistics
//! - A deterministic hashing embedder (or any [`nog_llm::EmbeddingProvider`])
//! - A flat cosine-similarity vector store persisted as JSON
//! - Intent classification, answer generation and the analysis front-end
//!
//! News ingestion also implements [`nog_forecast::data::NewsRefresher`], so
//! the forecast data pipeline can refresh news alongside prices.

pub mod answer;
pub mod api;
pub mod classifier;
pub mod config;
pub mod corpus;
pub mod embed;
pub mod error;
pub mod ingest;
pub mod store;
pub mod system;

pub use answer::AnswerGenerator;
pub use classifier::{Intent, QueryClassifier};
pub use config::RagConfig;
pub use corpus::{CorpusBuilder, CorpusStats, Document, Metadata};
pub use embed::HashEmbedder;
pub use error::{RagError, Result};
pub use ingest::{FinancialsIngestor, IngestState, NewsIngestor, SecIngestor};
pub use store::{SearchHit, StoreStats, VectorStore};
pub use system::{AnalysisResponse, AnalysisSystem, Confidence, SystemStats};
