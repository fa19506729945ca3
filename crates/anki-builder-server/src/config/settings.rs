use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:8765".to_string(),
    ]
}

/// Chat-completion endpoint (OpenAI compatible).
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_true")]
    pub json_mode: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key: None,
            model: default_model(),
            timeout_seconds: default_llm_timeout(),
            max_tokens: default_llm_max_tokens(),
            temperature: default_temperature(),
            json_mode: true,
        }
    }
}

fn default_llm_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_timeout() -> u64 {
    120
}

fn default_llm_max_tokens() -> usize {
    4096
}

fn default_temperature() -> f32 {
    0.2
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_chunk_max_tokens")]
    pub chunk_max_tokens: usize,
    /// Only this many chunks (from the front) are sent to the completion service.
    #[serde(default = "default_chunk_limit")]
    pub chunk_limit: usize,
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_max_tokens: default_chunk_max_tokens(),
            chunk_limit: default_chunk_limit(),
            encoding: default_encoding(),
        }
    }
}

fn default_chunk_max_tokens() -> usize {
    1500
}

fn default_chunk_limit() -> usize {
    2
}

fn default_encoding() -> String {
    "cl100k_base".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PromptsConfig {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Markdown template containing `{TEXT_CONTENT}`; built-in template when unset.
    #[serde(default)]
    pub flashcard_template_path: Option<PathBuf>,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            flashcard_template_path: None,
        }
    }
}

fn default_system_prompt() -> String {
    "You are a helpful assistant designed to output JSON.".to_string()
}

/// AnkiConnect protocol constants.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BridgeConfig {
    #[serde(default = "default_bridge_version")]
    pub version: u8,
    #[serde(default = "default_note_type")]
    pub note_type: String,
    #[serde(default = "default_bridge_timeout")]
    pub timeout_seconds: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            version: default_bridge_version(),
            note_type: default_note_type(),
            timeout_seconds: default_bridge_timeout(),
        }
    }
}

fn default_bridge_version() -> u8 {
    6
}

fn default_note_type() -> String {
    "Basic".to_string()
}

fn default_bridge_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_seconds: default_fetch_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("anki-builder/{}", env!("CARGO_PKG_VERSION"))
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/settings").required(false))
            .add_source(Self::environment())
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;

        Ok(settings)
    }

    /// APP_LLM__API_KEY=sk-... overrides llm.api_key
    fn environment() -> Environment {
        Environment::with_prefix("APP")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipeline.chunk_max_tokens == 0 {
            anyhow::bail!("pipeline.chunk_max_tokens must be greater than zero");
        }

        if self.pipeline.chunk_limit == 0 {
            anyhow::bail!("pipeline.chunk_limit must be greater than zero");
        }

        if let Some(path) = &self.prompts.flashcard_template_path {
            if !path.exists() {
                anyhow::bail!("Flashcard prompt template not found at: {:?}", path);
            }
        }

        Ok(())
    }
}
