use async_trait::async_trait;
use candle_core::{ DType, Device, Tensor };
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::llama::{ Cache, Config, Llama, LlamaConfig, LlamaEosToks };
use candle_transformers::utils::apply_repeat_penalty;
use hf_hub::api::sync::ApiBuilder;
use hf_hub::{ Repo, RepoType };
use log::{ debug, info };
use std::collections::HashMap;
use std::fs;
use std::path::{ Path, PathBuf };
use std::sync::Arc;
use std::time::Instant;
use tokenizers::Tokenizer;
use super::TextGenerator;
use crate::error::GenerationError;
use crate::llm::{ BackendType, GenerationParams, LlmConfig };

const SAMPLING_SEED: u64 = 299792458;
const FALLBACK_EOS: &str = "</s>";

struct ModelFiles {
    config: PathBuf,
    tokenizer: PathBuf,
    weights: Vec<PathBuf>,
}

struct LoadedModel {
    model: Llama,
    config: Config,
    tokenizer: Tokenizer,
    device: Device,
    eos: LlamaEosToks,
}

/// TinyLlama-style causal model running in-process.
#[derive(Clone)]
pub struct CandleGenerator {
    inner: Arc<LoadedModel>,
    model_id: String,
}

fn tokenizer_err(err: tokenizers::Error) -> GenerationError {
    GenerationError::Tokenizer(err.to_string())
}

/// Leaves room for at least one generated token.
fn ensure_context_room(prompt_len: usize, context_window: usize) -> Result<(), GenerationError> {
    if prompt_len >= context_window {
        return Err(
            GenerationError::Model(
                format!(
                    "prompt exceeds context window ({} tokens, limit {})",
                    prompt_len,
                    context_window
                )
            )
        );
    }
    Ok(())
}

fn resolve_files(config: &LlmConfig) -> Result<ModelFiles, GenerationError> {
    if let Some(dir) = config.model_dir.as_deref().filter(|d| !d.trim().is_empty()) {
        let dir = Path::new(dir);
        info!("Loading model files from local directory {}", dir.display());
        return Ok(ModelFiles {
            config: dir.join("config.json"),
            tokenizer: dir.join("tokenizer.json"),
            weights: vec![dir.join("model.safetensors")],
        });
    }

    info!("Fetching {} (revision {}) from the Hugging Face hub", config.model_id, config.revision);
    let api = ApiBuilder::new()
        .with_token(config.hf_token.clone().filter(|t| !t.trim().is_empty()))
        .build()?;
    let repo = api.repo(
        Repo::with_revision(config.model_id.clone(), RepoType::Model, config.revision.clone())
    );
    Ok(ModelFiles {
        config: repo.get("config.json")?,
        tokenizer: repo.get("tokenizer.json")?,
        weights: vec![repo.get("model.safetensors")?],
    })
}

impl CandleGenerator {
    /// Blocking: downloads (if needed) and maps the weights.
    pub fn from_config(config: &LlmConfig) -> Result<Self, GenerationError> {
        if config.backend != BackendType::Candle {
            return Err(GenerationError::Model("Invalid config type for CandleGenerator".into()));
        }

        let device = if config.force_cpu { Device::Cpu } else { Device::cuda_if_available(0)? };
        let files = resolve_files(config)?;
        let started = Instant::now();

        let tokenizer = Tokenizer::from_file(&files.tokenizer).map_err(tokenizer_err)?;
        let llama_config: LlamaConfig = serde_json::from_slice(&fs::read(&files.config)?)?;
        let model_config = llama_config.into_config(false);

        let mut tensors = HashMap::new();
        for path in &files.weights {
            tensors.extend(candle_core::safetensors::load(path, &device)?);
        }
        let vb = VarBuilder::from_tensors(tensors, DType::F32, &device);
        let model = Llama::load(vb, &model_config)?;

        let eos = match model_config.eos_token_id.clone() {
            Some(eos) => eos,
            None =>
                LlamaEosToks::Single(
                    tokenizer
                        .token_to_id(FALLBACK_EOS)
                        .ok_or_else(||
                            GenerationError::Tokenizer("tokenizer has no end-of-sequence token".into())
                        )?
                ),
        };

        info!(
            "Loaded {} on {:?} in {:.2}s",
            config.model_id,
            device,
            started.elapsed().as_secs_f64()
        );

        Ok(Self {
            inner: Arc::new(LoadedModel {
                model,
                config: model_config,
                tokenizer,
                device,
                eos,
            }),
            model_id: config.model_id.clone(),
        })
    }
}

impl LoadedModel {
    fn is_eos(&self, token: u32) -> bool {
        match &self.eos {
            LlamaEosToks::Single(id) => *id == token,
            LlamaEosToks::Multiple(ids) => ids.contains(&token),
        }
    }

    fn logits_processor(params: &GenerationParams) -> LogitsProcessor {
        if params.is_greedy() {
            LogitsProcessor::new(SAMPLING_SEED, None, None)
        } else {
            LogitsProcessor::new(SAMPLING_SEED, Some(params.temperature), Some(params.top_p))
        }
    }

    fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, GenerationError> {
        let encoding = self.tokenizer.encode(prompt, true).map_err(tokenizer_err)?;
        let mut tokens: Vec<u32> = encoding.get_ids().to_vec();
        let prompt_len = tokens.len();
        ensure_context_room(prompt_len, self.config.max_position_embeddings)?;

        // KV cache is per generation; the weights are shared.
        let mut cache = Cache::new(true, DType::F32, &self.config, &self.device)?;
        let mut logits_processor = Self::logits_processor(params);
        let mut index_pos = 0;

        for step in 0..params.max_new_tokens {
            if tokens.len() >= self.config.max_position_embeddings {
                debug!("Context window full after {} new tokens", step);
                break;
            }
            let (context_size, context_index) = if step > 0 {
                (1, index_pos)
            } else {
                (tokens.len(), 0)
            };
            let ctxt = &tokens[tokens.len().saturating_sub(context_size)..];
            let input = Tensor::new(ctxt, &self.device)?.unsqueeze(0)?;
            let logits = self.model.forward(&input, context_index, &mut cache)?;
            let logits = logits.squeeze(0)?.to_dtype(DType::F32)?;
            let logits = if params.repetition_penalty == 1.0 {
                logits
            } else {
                apply_repeat_penalty(&logits, params.repetition_penalty, &tokens)?
            };
            index_pos += ctxt.len();

            let next_token = logits_processor.sample(&logits)?;
            if self.is_eos(next_token) {
                break;
            }
            tokens.push(next_token);
        }

        debug!("Generated {} tokens after a {}-token prompt", tokens.len() - prompt_len, prompt_len);
        self.tokenizer.decode(&tokens, true).map_err(tokenizer_err)
    }
}

#[async_trait]
impl TextGenerator for CandleGenerator {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams
    ) -> Result<String, GenerationError> {
        let inner = Arc::clone(&self.inner);
        let prompt = prompt.to_string();
        let params = *params;
        tokio::task
            ::spawn_blocking(move || inner.generate(&prompt, &params)).await
            .map_err(|e| GenerationError::Join(e.to_string()))?
    }

    fn describe(&self) -> String {
        format!("candle model={} device={:?}", self.model_id, self.inner.device)
    }
}
