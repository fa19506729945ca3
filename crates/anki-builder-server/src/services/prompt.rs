use std::path::Path;

use crate::config::PromptsConfig;
use crate::models::chat::ChatMessage;

pub const TEXT_PLACEHOLDER: &str = "{TEXT_CONTENT}";

const BUILTIN_TEMPLATE: &str = include_str!("../../prompts/chunk_to_notecard.md");

/// System instruction plus the user template a chunk is substituted into.
/// Loaded once at startup and handed to the generator.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    system: String,
    template: String,
}

impl PromptTemplate {
    pub fn new(system: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            template: template.into(),
        }
    }

    pub fn builtin(system: impl Into<String>) -> Self {
        Self::new(system, BUILTIN_TEMPLATE)
    }

    pub fn from_file(system: impl Into<String>, path: &Path) -> std::io::Result<Self> {
        let template = std::fs::read_to_string(path)?;
        Ok(Self::new(system, template))
    }

    pub fn from_settings(prompts: &PromptsConfig) -> std::io::Result<Self> {
        match &prompts.flashcard_template_path {
            Some(path) => Self::from_file(prompts.system_prompt.clone(), path),
            None => Ok(Self::builtin(prompts.system_prompt.clone())),
        }
    }

    /// A template without the placeholder would send every chunk's prompt
    /// without the chunk.
    pub fn has_placeholder(&self) -> bool {
        self.template.contains(TEXT_PLACEHOLDER)
    }

    pub fn render(&self, chunk_text: &str) -> String {
        self.template.replace(TEXT_PLACEHOLDER, chunk_text)
    }

    pub fn messages(&self, chunk_text: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.system.clone()),
            ChatMessage::user(self.render(chunk_text)),
        ]
    }
}
