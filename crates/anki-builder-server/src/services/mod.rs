pub mod anki_connect;
pub mod completion_service;
pub mod flashcard_generator;
pub mod pipeline;
pub mod prompt;

pub use anki_connect::{AnkiConnectClient, DeckPublisher, FlashcardBridge, PublishOutcome};
pub use completion_service::{OpenAiCompletionService, TextCompletionService};
pub use flashcard_generator::FlashcardGenerator;
pub use pipeline::FlashcardPipeline;
pub use prompt::PromptTemplate;
