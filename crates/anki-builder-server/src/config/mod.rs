pub mod settings;

pub use settings::{
    BridgeConfig, HttpConfig, LlmConfig, PipelineConfig, PromptsConfig, ServerConfig, Settings,
};
