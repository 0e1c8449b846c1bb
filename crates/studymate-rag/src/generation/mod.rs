//! Answer synthesis from retrieved chunks

pub mod citation;
pub mod extractive;
pub mod generative;
pub mod prompt;

use std::sync::Arc;

use crate::config::{SynthesisConfig, SynthesisStrategy};
use crate::error::{Error, Result};
use crate::providers::LlmProvider;
use crate::types::{Answer, RankedChunk};

pub use citation::{referenced_citations, truncate_snippet};
pub use extractive::ExtractiveSynthesizer;
pub use generative::{GenerativeSynthesizer, PromptStyle};
pub use prompt::{ContextPassage, PromptBuilder};

/// Answer synthesizer, fixed to one strategy at construction
pub enum AnswerSynthesizer {
    Extractive(ExtractiveSynthesizer),
    Generative(GenerativeSynthesizer),
}

impl AnswerSynthesizer {
    /// Build the synthesizer named by `config.strategy`
    ///
    /// Generative and conversational strategies need a language model.
    pub fn from_config(config: &SynthesisConfig, llm: Option<Arc<dyn LlmProvider>>) -> Result<Self> {
        let style = match config.strategy {
            SynthesisStrategy::Extractive => {
                return Ok(Self::Extractive(ExtractiveSynthesizer::new(config.max_sentences)));
            }
            SynthesisStrategy::Generative => PromptStyle::Grounded,
            SynthesisStrategy::Conversational => PromptStyle::Conversational,
        };

        let llm = llm.ok_or_else(|| {
            Error::config(format!(
                "synthesis strategy {:?} requires a language model provider",
                config.strategy
            ))
        })?;

        Ok(Self::Generative(GenerativeSynthesizer::new(
            llm,
            PromptBuilder::new(config.context_budget_words),
            style,
        )))
    }

    pub fn strategy(&self) -> SynthesisStrategy {
        match self {
            Self::Extractive(_) => SynthesisStrategy::Extractive,
            Self::Generative(g) => match g.style() {
                PromptStyle::Grounded => SynthesisStrategy::Generative,
                PromptStyle::Conversational => SynthesisStrategy::Conversational,
            },
        }
    }

    /// Answer `question` from `ranked`
    ///
    /// With nothing retrieved the result is [`Answer::NoRelevantInformation`]
    /// and no model is invoked. The extractive strategy also answers so when
    /// no retrieved sentence shares a term with the question.
    pub async fn synthesize(&self, question: &str, ranked: &[RankedChunk]) -> Result<Answer> {
        if ranked.is_empty() {
            return Ok(Answer::NoRelevantInformation);
        }

        let text = match self {
            Self::Extractive(extractive) => match extractive.extract(question, ranked) {
                Some(text) => text,
                None => {
                    tracing::debug!("No retrieved sentence matches the question");
                    return Ok(Answer::NoRelevantInformation);
                }
            },
            Self::Generative(generative) => generative.generate(question, ranked).await?,
        };

        Ok(Answer::Grounded {
            text,
            strategy: self.strategy(),
        })
    }
}
