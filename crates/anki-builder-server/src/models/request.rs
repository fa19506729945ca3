use serde::Deserialize;

use crate::utils::error::ApiError;

/// Body of `POST /autonomous-anki-builder`.
#[derive(Debug, Deserialize, Default)]
pub struct BuildRequest {
    #[serde(default)]
    pub input_path: Option<String>,
    #[serde(default)]
    pub deck_name: Option<String>,
    #[serde(default, alias = "anki_connect_url")]
    pub bridge_url: Option<String>,
}

/// A request with every required field present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildJob {
    pub input_path: String,
    pub deck_name: String,
    pub bridge_url: String,
}

impl BuildRequest {
    pub fn into_job(self) -> Result<BuildJob, ApiError> {
        match (
            non_empty(self.input_path),
            non_empty(self.deck_name),
            non_empty(self.bridge_url),
        ) {
            (Some(input_path), Some(deck_name), Some(bridge_url)) => Ok(BuildJob {
                input_path,
                deck_name,
                bridge_url,
            }),
            _ => Err(ApiError::BadRequest(
                "Please pass 'input_path', 'deck_name', and 'bridge_url' in the request body"
                    .to_string(),
            )),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
