//! Intent classification by similarity to example questions

use crate::error::{RagError, Result};
use nog_llm::{EmbeddingProvider, cosine_similarity};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Minimum similarity for a query to be assigned a specific intent
pub const INTENT_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    PeRatio,
    Roe,
    DebtToEquity,
    News,
    Financials,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::PeRatio => "pe_ratio",
            Intent::Roe => "roe",
            Intent::DebtToEquity => "debt_to_equity",
            Intent::News => "news",
            Intent::Financials => "financials",
            Intent::General => "general",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn intent_templates() -> [(Intent, &'static [&'static str]); 5] {
    [
        (
            Intent::PeRatio,
            &[
                "What is the latest P/E ratio?",
                "Tell me the price to earnings ratio of NOG.",
                "How is the company valued?",
                "What's the valuation multiple?",
            ],
        ),
        (
            Intent::Roe,
            &[
                "What is the return on equity?",
                "How efficient is the company at generating profit from equity?",
                "Show me ROE for NOG",
            ],
        ),
        (
            Intent::DebtToEquity,
            &[
                "How leveraged is NOG?",
                "Show debt to equity ratio",
                "What is the company's financial leverage?",
            ],
        ),
        (
            Intent::News,
            &[
                "What happened recently?",
                "Any recent news about NOG?",
                "Latest updates or events?",
            ],
        ),
        (
            Intent::Financials,
            &[
                "How was the quarterly performance?",
                "What are the key financials this year?",
                "Give me a financial summary",
            ],
        ),
    ]
}

/// Classifies questions against embedded intent templates
pub struct QueryClassifier {
    embedder: Arc<dyn EmbeddingProvider>,
    intents: Vec<(Intent, Vec<Vec<f32>>)>,
}

impl QueryClassifier {
    /// Embed every template once up front
    pub async fn new(embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let mut intents = Vec::new();
        for (intent, templates) in intent_templates() {
            let texts: Vec<String> = templates.iter().map(|t| (*t).to_string()).collect();
            let embeddings = embedder.embed(&texts).await?;
            intents.push((intent, embeddings));
        }
        Ok(Self { embedder, intents })
    }

    /// Best intent by maximum template similarity, with its score; `General`
    /// unless the score exceeds the threshold
    pub fn classify_embedding(&self, query: &[f32]) -> (Intent, f32) {
        let mut best = (Intent::General, f32::NEG_INFINITY);
        for (intent, embeddings) in &self.intents {
            let score = embeddings
                .iter()
                .map(|e| cosine_similarity(query, e))
                .fold(f32::NEG_INFINITY, f32::max);
            if score > best.1 {
                best = (*intent, score);
            }
        }

        if best.1 > INTENT_THRESHOLD {
            best
        } else {
            (Intent::General, best.1)
        }
    }

    pub async fn classify(&self, query: &str) -> Result<Intent> {
        let embedding = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .pop()
            .ok_or_else(|| RagError::EmbeddingError("no embedding returned for query".to_string()))?;

        let (intent, score) = self.classify_embedding(&embedding);
        debug!("Query classified as {} (score {:.3})", intent, score);
        Ok(intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashEmbedder;

    async fn classifier() -> QueryClassifier {
        QueryClassifier::new(Arc::new(HashEmbedder::default())).await.unwrap()
    }

    #[tokio::test]
    async fn test_template_questions_match_their_intent() {
        let classifier = classifier().await;
        assert_eq!(classifier.classify("What is the return on equity?").await.unwrap(), Intent::Roe);
        assert_eq!(classifier.classify("Show debt to equity ratio").await.unwrap(), Intent::DebtToEquity);
    }

    #[tokio::test]
    async fn test_paraphrase() {
        let classifier = classifier().await;
        assert_eq!(
            classifier.classify("Any recent news about NOG stock?").await.unwrap(),
            Intent::News
        );
    }

    #[tokio::test]
    async fn test_unrelated_query_is_general() {
        let classifier = classifier().await;
        assert_eq!(classifier.classify("zzzz qqqq xxxx").await.unwrap(), Intent::General);
    }

    #[test]
    fn test_intent_names() {
        assert_eq!(Intent::DebtToEquity.to_string(), "debt_to_equity");
        assert_eq!(serde_json::to_string(&Intent::PeRatio).unwrap(), "\"pe_ratio\"");
    }
}
