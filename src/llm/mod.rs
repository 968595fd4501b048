pub mod generator;
use serde::{ Deserialize, Serialize };
use std::str::FromStr;
use std::fmt;

pub const DEFAULT_MODEL_ID: &str = "TinyLlama/TinyLlama-1.1B-Chat-v1.0";
pub const DEFAULT_REVISION: &str = "main";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "tinyllama";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    Candle,
    Ollama,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseBackendTypeError {
    message: String,
}

impl fmt::Display for ParseBackendTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseBackendTypeError {}

impl FromStr for BackendType {
    type Err = ParseBackendTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "candle" | "local" => Ok(BackendType::Candle),
            "ollama" => Ok(BackendType::Ollama),
            _ =>
                Err(ParseBackendTypeError {
                    message: format!("Invalid generation backend: '{}'", s),
                }),
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendType::Candle => write!(f, "candle"),
            BackendType::Ollama => write!(f, "ollama"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: BackendType,
    pub model_id: String,
    pub revision: String,
    pub model_dir: Option<String>,
    pub hf_token: Option<String>,
    pub base_url: Option<String>,
    pub completion_model: Option<String>,
    pub force_cpu: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::Candle,
            model_id: DEFAULT_MODEL_ID.to_string(),
            revision: DEFAULT_REVISION.to_string(),
            model_dir: None,
            hf_token: None,
            base_url: None,
            completion_model: None,
            force_cpu: false,
        }
    }
}

/// Decoding knobs applied to every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationParams {
    pub max_new_tokens: usize,
    /// 0.0 selects greedy decoding.
    pub temperature: f64,
    /// Only consulted when sampling, so inert at temperature 0.
    pub top_p: f64,
    pub repetition_penalty: f32,
    /// Generation pads with the end-of-sequence token.
    pub pad_with_eos: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 150,
            temperature: 0.0,
            top_p: 0.9,
            repetition_penalty: 1.2,
            pad_with_eos: true,
        }
    }
}

impl GenerationParams {
    pub fn is_greedy(&self) -> bool {
        self.temperature <= 0.0
    }
}
