use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::document::Chunk;
use crate::models::flashcard::{GeneratedEntry, GenerationError, GenerationFailure};
use crate::services::completion_service::{Completion, TextCompletionService};
use crate::services::prompt::PromptTemplate;
use crate::utils::error::CompletionError;

/// Turns chunks into flashcards, one completion call per chunk, in order.
///
/// Unusable responses are recorded inline and never abort the batch. There are
/// no retries.
pub struct FlashcardGenerator {
    service: Arc<dyn TextCompletionService>,
    prompt: PromptTemplate,
}

impl FlashcardGenerator {
    pub fn new(service: Arc<dyn TextCompletionService>, prompt: PromptTemplate) -> Self {
        Self { service, prompt }
    }

    pub fn prompt(&self) -> &PromptTemplate {
        &self.prompt
    }

    /// Processes at most `limit` chunks from the front; the rest produce nothing.
    pub async fn generate(
        &self,
        chunks: &[Chunk],
        limit: usize,
    ) -> Result<Vec<GeneratedEntry>, CompletionError> {
        if chunks.is_empty() {
            info!("No chunks found.");
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();

        for chunk in chunks.iter().take(limit) {
            let completion = self.service.complete(self.prompt.messages(&chunk.text)).await?;

            info!(
                "Chunk {} response: finish_reason={:?}, {} chars",
                chunk.index + 1,
                completion.finish_reason,
                completion.content.len()
            );

            entries.extend(Self::interpret(&completion));
        }

        if chunks.len() > limit {
            debug!(
                "Chunk limit {} reached, {} chunks not sent",
                limit,
                chunks.len() - limit
            );
        }

        Ok(entries)
    }

    /// Per-chunk policy:
    /// - normal stop + JSON with `flashcards` array: every entry, as-is
    /// - normal stop + invalid JSON: one `parse failure`
    /// - any other stop: one `incomplete response`
    /// - valid JSON without a `flashcards` array: nothing
    pub fn interpret(completion: &Completion) -> Vec<GeneratedEntry> {
        if !completion.finish_reason.is_normal_stop() {
            return vec![GeneratedEntry::Failed(GenerationError::new(
                GenerationFailure::IncompleteResponse,
            ))];
        }

        let json: Value = match serde_json::from_str(&completion.content) {
            Ok(json) => json,
            Err(e) => {
                error!("JSON decode error: {}", e);
                return vec![GeneratedEntry::Failed(GenerationError::new(
                    GenerationFailure::ParseFailure,
                ))];
            }
        };

        match json.get("flashcards") {
            Some(Value::Array(cards)) => cards.iter().cloned().map(GeneratedEntry::Card).collect(),
            Some(_) => {
                error!("flashcards key in the JSON response is not an array");
                Vec::new()
            }
            None => {
                error!("No flashcards key in the JSON response");
                Vec::new()
            }
        }
    }
}
