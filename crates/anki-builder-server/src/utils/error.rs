use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failures while turning a locator into text.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Input must be a valid URL or a PDF file path: {0}")]
    UnsupportedLocator(String),

    #[error("Failed to fetch web page. Status code: {status}")]
    Fetch { status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("No paragraph text found in document")]
    EmptyContent,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Extraction task failed: {0}")]
    Task(String),
}

impl From<lopdf::Error> for ExtractError {
    fn from(err: lopdf::Error) -> Self {
        ExtractError::Pdf(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum SegmentError {
    #[error("Text content is empty. Extract text first.")]
    EmptyText,

    #[error("Chunk size must be at least one token")]
    InvalidMaxTokens,

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),
}

/// Transport-level failures of the completion service. A response that
/// arrives but is unusable is recorded inline as a `GenerationError`.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Failed to call completion API: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Completion API error: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("No choices returned from completion API")]
    NoChoices,
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Failed to reach AnkiConnect: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("AnkiConnect returned status {0}")]
    Status(u16),
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Permission denied by AnkiConnect: {0}")]
    AuthorizationDenied(String),

    #[error("Failed to add card {index}: {reason}")]
    SubmissionFailure { index: usize, reason: String },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Segment(#[from] SegmentError),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    #[error("Bad gateway: {0}")]
    BadGateway(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let message = err.to_string();
        match err {
            PipelineError::Extract(ExtractError::UnsupportedLocator(_)) => {
                ApiError::BadRequest(message)
            }
            PipelineError::Extract(ExtractError::EmptyContent)
            | PipelineError::Segment(SegmentError::EmptyText) => ApiError::Unprocessable(message),
            PipelineError::Extract(ExtractError::Fetch { .. })
            | PipelineError::Extract(ExtractError::Http(_))
            | PipelineError::Completion(_)
            | PipelineError::Publish(_) => ApiError::BadGateway(message),
            _ => ApiError::InternalError(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, "BadRequest", msg)
            }
            ApiError::Unprocessable(msg) => {
                tracing::warn!("Unprocessable: {}", msg);
                (StatusCode::UNPROCESSABLE_ENTITY, "Unprocessable", msg)
            }
            ApiError::BadGateway(msg) => {
                tracing::error!("Upstream failure: {}", msg);
                (StatusCode::BAD_GATEWAY, "BadGateway", msg)
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalError", msg)
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}
