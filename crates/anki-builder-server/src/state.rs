use anyhow::{Context, Result};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{BridgeConfig, Settings};
use crate::document::{ChunkSegmenter, PdfExtractor, TiktokenTokenizer, WebPageExtractor};
use crate::services::{FlashcardGenerator, FlashcardPipeline, OpenAiCompletionService, PromptTemplate};

/// Application state shared across handlers
pub struct AppState {
    pub pipeline: Arc<FlashcardPipeline>,
    /// AnkiConnect URL differs per request, so only the HTTP client is shared.
    pub bridge_client: Client,
    pub bridge: BridgeConfig,
}

impl AppState {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let fetch_client = Client::builder()
            .timeout(Duration::from_secs(settings.http.fetch_timeout_seconds))
            .user_agent(settings.http.user_agent.clone())
            .build()
            .context("Failed to create page fetch client")?;

        let bridge_client = Client::builder()
            .timeout(Duration::from_secs(settings.bridge.timeout_seconds))
            .build()
            .context("Failed to create AnkiConnect client")?;

        let tokenizer = TiktokenTokenizer::new(&settings.pipeline.encoding)?;

        let completion_service = OpenAiCompletionService::new(settings.llm.clone())?;
        let prompt = PromptTemplate::from_settings(&settings.prompts)
            .context("Failed to load flashcard prompt template")?;

        let pipeline = FlashcardPipeline::new(
            Arc::new(WebPageExtractor::new(fetch_client)),
            Arc::new(PdfExtractor::new()),
            ChunkSegmenter::new(Arc::new(tokenizer)),
            FlashcardGenerator::new(Arc::new(completion_service), prompt),
            settings.pipeline.clone(),
        );

        Ok(Self {
            pipeline: Arc::new(pipeline),
            bridge_client,
            bridge: settings.bridge.clone(),
        })
    }
}
