pub mod chat;
pub mod flashcard;
pub mod request;

pub use chat::ChatMessage;
pub use flashcard::{Flashcard, GeneratedEntry, GenerationError, GenerationFailure};
pub use request::{BuildJob, BuildRequest};
