//! Deterministic feature-hashing embedder for offline indexing

use async_trait::async_trait;
use nog_llm::EmbeddingProvider;

/// Default embedding width
pub const DEFAULT_DIMENSION: usize = 256;

const WORD_WEIGHT: f32 = 1.0;
const BIGRAM_WEIGHT: f32 = 0.5;

/// Bag-of-words embedder: each lowercase word and each character bigram is
/// hashed into a bucket, and the vector is L2-normalised. Texts sharing
/// vocabulary land close together; no model or network is involved.
#[derive(Debug, Clone, Copy)]
pub struct HashEmbedder {
    dimension: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

// FNV-1a, stable across platforms and releases
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325_u64, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    })
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn bucket(&self, bytes: &[u8]) -> usize {
        (fnv1a(bytes) % self.dimension as u64) as usize
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimension];
        let lower = text.to_lowercase();

        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            embedding[self.bucket(word.as_bytes())] += WORD_WEIGHT;

            let chars: Vec<char> = word.chars().collect();
            for pair in chars.windows(2) {
                let bigram: String = pair.iter().collect();
                embedding[self.bucket(format!("#{bigram}").as_bytes())] += BIGRAM_WEIGHT;
            }
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut embedding {
                *x /= norm;
            }
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, texts: &[String]) -> nog_llm::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn name(&self) -> &str {
        "hashing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nog_llm::cosine_similarity;

    #[test]
    fn test_deterministic_and_normalised() {
        let embedder = HashEmbedder::default();
        let a = embedder.embed_text("Northern Oil and Gas");
        let b = embedder.embed_text("northern   OIL and gas!");

        assert_eq!(a.len(), DEFAULT_DIMENSION);
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_shared_vocabulary_is_closer() {
        let embedder = HashEmbedder::default();
        let query = embedder.embed_text("debt to equity ratio");
        let related = embedder.embed_text("Show debt to equity ratio");
        let unrelated = embedder.embed_text("Williston Basin drilling schedule");

        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashEmbedder::new(8);
        assert!(embedder.embed_text("  ...  ").iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn test_provider_batch() {
        let embedder = HashEmbedder::new(32);
        let out = embedder
            .embed(&["a b".to_string(), "c".to_string()])
            .await
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(embedder.name(), "hashing");
    }
}
