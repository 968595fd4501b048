use thiserror::Error;

/// Failures raised while producing a reply inside the inference service.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("model error: {0}")]
    Model(String),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("model download failed: {0}")]
    Download(String),

    #[error("generation backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid model config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("generation task aborted: {0}")]
    Join(String),
}

impl From<candle_core::Error> for GenerationError {
    fn from(err: candle_core::Error) -> Self {
        GenerationError::Model(err.to_string())
    }
}

impl From<hf_hub::api::sync::ApiError> for GenerationError {
    fn from(err: hf_hub::api::sync::ApiError) -> Self {
        GenerationError::Download(err.to_string())
    }
}

/// Outcome kinds the chat client distinguishes after a submit.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("no input provided")]
    InvalidInput,

    #[error("unable to connect to the backend: {0}")]
    ConnectionUnavailable(#[source] reqwest::Error),

    #[error("{0}")]
    GenerationFailed(String),

    #[error("{0}")]
    Unexpected(String),
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            ChatError::ConnectionUnavailable(err)
        } else {
            ChatError::Unexpected(err.to_string())
        }
    }
}
