//! Answer generation from retrieved context

use crate::error::{RagError, Result};
use minijinja::{Environment, context};
use nog_llm::{CompletionRequest, LLMProvider, Message};
use std::sync::Arc;
use tracing::{debug, instrument};

const ANSWER_TEMPLATE: &str = "Answer the question based on the context below: \n\
{{ context }}\n\nQuestion: {{ question }}\nAnswer:";

/// Render the answer prompt; context passages are separated by blank lines
pub fn render_prompt(question: &str, contexts: &[String]) -> Result<String> {
    let env = Environment::new();
    let prompt = env.render_str(
        ANSWER_TEMPLATE,
        context! {
            context => contexts.join("\n\n"),
            question => question,
        },
    )?;
    Ok(prompt)
}

/// Asks an LLM to answer from the supplied context only
pub struct AnswerGenerator {
    llm: Arc<dyn LLMProvider>,
    model: String,
    max_tokens: usize,
    temperature: f32,
}

impl AnswerGenerator {
    pub fn new(
        llm: Arc<dyn LLMProvider>,
        model: impl Into<String>,
        max_tokens: usize,
        temperature: f32,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            max_tokens,
            temperature,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, contexts), fields(model = %self.model, passages = contexts.len()))]
    pub async fn generate(&self, question: &str, contexts: &[String]) -> Result<String> {
        let prompt = render_prompt(question, contexts)?;

        let request = CompletionRequest::builder(&self.model)
            .add_message(Message::user(prompt))
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .build();

        let response = self.llm.complete(request).await?;
        debug!("Answer used {} tokens", response.usage.total());

        let answer = response.message.text().trim().to_string();
        if answer.is_empty() {
            return Err(RagError::Other("LLM returned an empty answer".to_string()));
        }
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nog_llm::{CompletionResponse, StopReason, TokenUsage};
    use std::sync::Mutex;

    /// Records the last request and echoes a fixed reply
    struct RecordingProvider {
        reply: String,
        last: Mutex<Option<CompletionRequest>>,
    }

    #[async_trait]
    impl LLMProvider for RecordingProvider {
        async fn complete(&self, request: CompletionRequest) -> nog_llm::Result<CompletionResponse> {
            *self.last.lock().unwrap() = Some(request);
            Ok(CompletionResponse {
                message: Message::assistant(self.reply.clone()),
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            })
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    #[test]
    fn test_render_prompt() {
        let prompt = render_prompt(
            "What is the forecast?",
            &["Close: 25.3".to_string(), "Oil prices rose.".to_string()],
        )
        .unwrap();

        assert_eq!(
            prompt,
            "Answer the question based on the context below: \nClose: 25.3\n\nOil prices rose.\n\nQuestion: What is the forecast?\nAnswer:"
        );
    }

    #[tokio::test]
    async fn test_generate_sends_configured_request() {
        let provider = Arc::new(RecordingProvider {
            reply: "  Production rose 12%.  ".to_string(),
            last: Mutex::new(None),
        });
        let generator = AnswerGenerator::new(provider.clone(), "gpt-4o", 256, 0.2);

        let answer = generator
            .generate("How did production change?", &["Production rose 12% year over year.".to_string()])
            .await
            .unwrap();
        assert_eq!(answer, "Production rose 12%.");

        let request = provider.last.lock().unwrap().clone().unwrap();
        assert_eq!(request.model, "gpt-4o");
        assert_eq!(request.max_tokens, 256);
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.messages.len(), 1);
        assert!(request.messages[0].text().contains("Question: How did production change?"));
    }
}
