use std::sync::Arc;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::document::{ChunkSegmenter, Segmentation, SourceDocument, SourceLocator, TextExtractor};
use crate::models::flashcard::GeneratedEntry;
use crate::models::request::BuildJob;
use crate::services::anki_connect::{DeckPublisher, PublishOutcome};
use crate::services::flashcard_generator::FlashcardGenerator;
use crate::utils::error::PipelineError;

/// Extract -> segment -> generate -> publish, strictly in sequence.
/// Every run owns its document, chunks and cards; nothing is shared between runs.
pub struct FlashcardPipeline {
    web: Arc<dyn TextExtractor>,
    document: Arc<dyn TextExtractor>,
    segmenter: ChunkSegmenter,
    generator: FlashcardGenerator,
    config: PipelineConfig,
}

impl FlashcardPipeline {
    pub fn new(
        web: Arc<dyn TextExtractor>,
        document: Arc<dyn TextExtractor>,
        segmenter: ChunkSegmenter,
        generator: FlashcardGenerator,
        config: PipelineConfig,
    ) -> Self {
        Self {
            web,
            document,
            segmenter,
            generator,
            config,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.generator.prompt().has_placeholder()
    }

    pub async fn extract(&self, input_path: &str) -> Result<SourceDocument, PipelineError> {
        let locator = SourceLocator::parse(input_path)?;
        info!("Processing {}...", locator.kind());

        let text = match &locator {
            SourceLocator::Web(url) => self.web.extract(url).await?,
            SourceLocator::Document(path) => {
                self.document.extract(&path.to_string_lossy()).await?
            }
        };

        let document = SourceDocument::new(&locator, text);
        debug!("Extracted {} characters", document.char_count());
        Ok(document)
    }

    pub fn segment(&self, document: &SourceDocument) -> Result<Segmentation, PipelineError> {
        let segmentation = self
            .segmenter
            .segment(&document.text, self.config.chunk_max_tokens)?;

        info!(
            "Document has {} tokens in {} chunks",
            segmentation.total_tokens,
            segmentation.chunks.len()
        );
        Ok(segmentation)
    }

    /// Cards (and inline generation errors) for the first `chunk_limit` chunks.
    pub async fn generate(&self, input_path: &str) -> Result<Vec<GeneratedEntry>, PipelineError> {
        let document = self.extract(input_path).await?;
        let segmentation = self.segment(&document)?;

        let entries = self
            .generator
            .generate(&segmentation.chunks, self.config.chunk_limit)
            .await?;

        debug!(
            "Generated flashcards: {}",
            serde_json::to_string_pretty(&entries).unwrap_or_default()
        );
        Ok(entries)
    }

    pub async fn run(
        &self,
        job: &BuildJob,
        publisher: &DeckPublisher,
    ) -> Result<Vec<PublishOutcome>, PipelineError> {
        let span = info_span!(
            "build_deck",
            request_id = %Uuid::new_v4(),
            deck = %job.deck_name
        );

        async {
            let entries = self.generate(&job.input_path).await?;
            let outcomes = publisher.publish(&job.deck_name, &entries).await?;

            info!(
                "Published {} of {} generated entries",
                outcomes.len(),
                entries.len()
            );
            Ok::<_, PipelineError>(outcomes)
        }
        .instrument(span)
        .await
    }
}
