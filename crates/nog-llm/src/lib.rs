//! LLM provider abstraction layer for the NOG toolkit
//!
//! This crate provides provider-agnostic abstractions for interacting with
//! Large Language Models. It includes:
//!
//! - Message types for LLM communication
//! - Completion request/response types
//! - Provider traits for chat completion and text embedding
//! - Concrete provider implementations (behind feature flags)

pub mod completion;
pub mod embeddings;
pub mod error;
pub mod messages;
pub mod provider;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use embeddings::{EmbeddingProvider, cosine_similarity};
pub use error::{LLMError, Result};
pub use messages::{ContentBlock, Message, Role};
pub use provider::LLMProvider;

// Provider implementations (feature-gated)
#[cfg(any(feature = "anthropic", feature = "openai"))]
pub mod providers;
