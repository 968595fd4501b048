use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use async_trait::async_trait;
use log::debug;
use super::TextGenerator;
use crate::error::GenerationError;
use crate::llm::{ BackendType, GenerationParams, LlmConfig, DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL };

#[derive(Debug)]
pub struct OllamaGenerator {
    http: HttpClient,
    base_url: String,
    completion_model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    /// The prompt is already in the model's chat format.
    raw: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f64,
    top_p: f64,
    repeat_penalty: f32,
    num_predict: usize,
}

#[derive(Deserialize)]
pub struct GenerateResponse {
    pub response: String,
}

impl OllamaGenerator {
    pub fn new(base_url: Option<String>, completion_model: Option<String>) -> Self {
        let model = completion_model.unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string());
        let url = base_url.unwrap_or_else(|| DEFAULT_OLLAMA_URL.into());

        Self {
            http: HttpClient::new(),
            base_url: url.trim_end_matches('/').to_string(),
            completion_model: model,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, GenerationError> {
        if config.backend != BackendType::Ollama {
            return Err(GenerationError::Model("Invalid config type for OllamaGenerator".into()));
        }

        Ok(Self::new(config.base_url.clone(), config.completion_model.clone()))
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams
    ) -> Result<String, GenerationError> {
        let url = format!("{}/api/generate", self.base_url);
        let req = GenerateRequest {
            model: &self.completion_model,
            prompt,
            stream: false,
            raw: true,
            options: GenerateOptions {
                temperature: params.temperature,
                top_p: params.top_p,
                repeat_penalty: params.repetition_penalty,
                num_predict: params.max_new_tokens,
            },
        };
        debug!("POST {} model={}", url, self.completion_model);
        let resp = self.http.post(&url).json(&req).send().await?.error_for_status()?;
        let data = resp.json::<GenerateResponse>().await?;
        Ok(data.response)
    }

    fn describe(&self) -> String {
        format!("ollama model={} url={}", self.completion_model, self.base_url)
    }
}
