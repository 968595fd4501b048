pub mod candle;
pub mod ollama;

use async_trait::async_trait;
use log::info;
use std::sync::Arc;
use super::{ BackendType, GenerationParams, LlmConfig };
use self::candle::CandleGenerator;
use self::ollama::OllamaGenerator;
use crate::error::GenerationError;

/// Turns a fully templated prompt into decoded model output.
///
/// Output may echo the prompt; callers isolate the reply with
/// [`crate::config::prompt::extract_reply`].
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams
    ) -> Result<String, GenerationError>;

    fn describe(&self) -> String;
}

/// Builds the generator once at startup. Candle backends load weights here.
pub async fn new_generator(
    config: &LlmConfig
) -> Result<Arc<dyn TextGenerator>, GenerationError> {
    let generator: Arc<dyn TextGenerator> = match config.backend {
        BackendType::Candle => {
            let cfg = config.clone();
            let specific = tokio::task
                ::spawn_blocking(move || CandleGenerator::from_config(&cfg)).await
                .map_err(|e| GenerationError::Join(e.to_string()))??;
            Arc::new(specific)
        }
        BackendType::Ollama => {
            let specific = OllamaGenerator::from_config(config)?;
            Arc::new(specific)
        }
    };
    info!("Generator ready: {}", generator.describe());
    Ok(generator)
}
