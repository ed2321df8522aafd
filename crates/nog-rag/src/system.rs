//! Question answering front-end: classify, retrieve, answer

use crate::answer::AnswerGenerator;
use crate::classifier::{Intent, QueryClassifier};
use crate::corpus::Metadata;
use crate::error::Result;
use crate::store::{StoreStats, VectorStore};
use nog_llm::EmbeddingProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};

const NO_CONTEXT_ANSWER: &str =
    "I don't have enough relevant information to answer this question about NOG.";
const LLM_FAILURE_ANSWER: &str =
    "I encountered an error while generating the answer. Please try again.";
const SOURCE_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// First 200 characters of the passage
    pub text: String,
    pub metadata: Metadata,
    pub relevance_score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub query: String,
    pub intent: Intent,
    pub answer: String,
    pub sources: Vec<Source>,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStats {
    pub system: String,
    pub status: String,
    pub collection_stats: StoreStats,
    pub answer_model: String,
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(SOURCE_PREVIEW_CHARS).collect();
    out.push_str("...");
    out
}

pub struct AnalysisSystem {
    classifier: QueryClassifier,
    embedder: Arc<dyn EmbeddingProvider>,
    store: VectorStore,
    answerer: AnswerGenerator,
    top_k: usize,
}

impl AnalysisSystem {
    /// `embedder` must be the one the store was built with
    pub async fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: VectorStore,
        answerer: AnswerGenerator,
        top_k: usize,
    ) -> Result<Self> {
        let classifier = QueryClassifier::new(embedder.clone()).await?;
        info!("NOG Analysis System initialized with {} documents", store.len());
        Ok(Self {
            classifier,
            embedder,
            store,
            answerer,
            top_k,
        })
    }

    #[instrument(skip(self))]
    pub async fn analyze(&self, query: &str) -> Result<AnalysisResponse> {
        let intent = self.classifier.classify(query).await?;
        info!("Query classified as: {}", intent);

        let hits = self
            .store
            .search(query, self.embedder.as_ref(), self.top_k, None)
            .await?;

        if hits.is_empty() {
            return Ok(AnalysisResponse {
                query: query.to_string(),
                intent,
                answer: NO_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
                confidence: Confidence::Low,
            });
        }

        let contexts: Vec<String> = hits.iter().map(|h| h.text.clone()).collect();
        let answer = match self.answerer.generate(query, &contexts).await {
            Ok(answer) => answer,
            Err(e) => {
                error!("LLM inference failed: {}", e);
                LLM_FAILURE_ANSWER.to_string()
            }
        };

        let confidence = if hits.len() >= 3 {
            Confidence::High
        } else {
            Confidence::Medium
        };
        let sources = hits
            .into_iter()
            .map(|hit| Source {
                text: preview(&hit.text),
                metadata: hit.metadata,
                relevance_score: 1.0 - hit.distance,
            })
            .collect();

        Ok(AnalysisResponse {
            query: query.to_string(),
            intent,
            answer,
            sources,
            confidence,
        })
    }

    pub fn stats(&self) -> SystemStats {
        SystemStats {
            system: "NOG Analysis System".to_string(),
            status: "operational".to_string(),
            collection_stats: self.store.stats(),
            answer_model: self.answerer.model().to_string(),
        }
    }
}
