//! Generative answers from a language model conditioned on retrieved chunks

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::LlmProvider;
use crate::types::RankedChunk;

use super::prompt::PromptBuilder;

/// Prompt style for the generative strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStyle {
    Grounded,
    Conversational,
}

/// Answers by prompting an [`LlmProvider`]
pub struct GenerativeSynthesizer {
    llm: Arc<dyn LlmProvider>,
    prompts: PromptBuilder,
    style: PromptStyle,
}

impl GenerativeSynthesizer {
    pub fn new(llm: Arc<dyn LlmProvider>, prompts: PromptBuilder, style: PromptStyle) -> Self {
        Self {
            llm,
            prompts,
            style,
        }
    }

    pub fn style(&self) -> PromptStyle {
        self.style
    }

    /// Prompt the model; `ranked` must be non-empty
    pub async fn generate(&self, question: &str, ranked: &[RankedChunk]) -> Result<String> {
        let prompt = match self.style {
            PromptStyle::Grounded => self.prompts.grounded_prompt(question, ranked),
            PromptStyle::Conversational => self.prompts.conversational_prompt(question, ranked),
        };

        tracing::info!(
            provider = self.llm.name(),
            model = self.llm.model(),
            chunks = ranked.len(),
            "Generating answer"
        );

        let text = self.llm.generate(&prompt).await.map_err(|e| match e {
            Error::Timeout { .. } | Error::Synthesis(_) => e,
            other => Error::synthesis(format!("{} ({}): {}", self.llm.name(), self.llm.model(), other)),
        })?;

        let text = text.trim();
        if text.is_empty() {
            return Err(Error::synthesis(format!(
                "{} returned an empty answer",
                self.llm.model()
            )));
        }
        Ok(text.to_string())
    }
}
