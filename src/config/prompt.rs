use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use log::info;

pub const SYSTEM_MARKER: &str = "<|system|>";
pub const USER_MARKER: &str = "<|user|>";
pub const ASSISTANT_MARKER: &str = "<|assistant|>";

#[derive(Debug)]
pub enum PromptError {
    EmptySystem,
    EmptyExample(usize),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::EmptySystem => write!(f, "Prompt system message is empty"),
            PromptError::EmptyExample(idx) => write!(f, "Few-shot example #{} is empty", idx),
            PromptError::IoError(e) => write!(f, "Prompt file IO error: {}", e),
            PromptError::JsonError(e) => write!(f, "Prompt JSON parsing error: {}", e),
        }
    }
}

impl Error for PromptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PromptError::IoError(e) => Some(e),
            PromptError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PromptError {
    fn from(err: std::io::Error) -> Self {
        PromptError::IoError(err)
    }
}

impl From<serde_json::Error> for PromptError {
    fn from(err: serde_json::Error) -> Self {
        PromptError::JsonError(err)
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FewShotExample {
    pub user: String,
    pub assistant: String,
}

/// The few-shot preamble sent in front of every user message.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PromptConfig {
    pub system: String,
    #[serde(default)]
    pub examples: Vec<FewShotExample>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        let example = |user: &str, assistant: &str| FewShotExample {
            user: user.to_string(),
            assistant: assistant.to_string(),
        };
        Self {
            system: "You are a helpful assistant.".to_string(),
            examples: vec![
                example(
                    "Who are you?",
                    "I am a helpful virtual assistant created to answer your questions and help you with tasks."
                ),
                example(
                    "How are you?",
                    "I'm doing great! Thanks for asking. How can I assist you today?"
                ),
                example(
                    "Can you help me with something?",
                    "Absolutely! Just tell me what you need help with."
                )
            ],
        }
    }
}

impl PromptConfig {
    fn validate(&self) -> Result<(), PromptError> {
        if self.system.trim().is_empty() {
            return Err(PromptError::EmptySystem);
        }
        for (idx, example) in self.examples.iter().enumerate() {
            if example.user.trim().is_empty() || example.assistant.trim().is_empty() {
                return Err(PromptError::EmptyExample(idx));
            }
        }
        Ok(())
    }

    pub fn preamble(&self) -> String {
        let mut out = format!("{}\n{}", SYSTEM_MARKER, self.system);
        for example in &self.examples {
            out.push_str(
                &format!(
                    "\n{}\n{}\n{}\n{}",
                    USER_MARKER,
                    example.user,
                    ASSISTANT_MARKER,
                    example.assistant
                )
            );
        }
        out
    }

    /// Full model input for one request. Earlier turns are never included.
    pub fn build_prompt(&self, user_input: &str) -> String {
        format!("{}\n{}\n{}\n{}\n", self.preamble(), USER_MARKER, user_input, ASSISTANT_MARKER)
    }
}

pub fn load_prompts<P: AsRef<Path>>(path: P) -> Result<Arc<PromptConfig>, PromptError> {
    let file_content = fs::read_to_string(&path)?;
    let config: PromptConfig = serde_json::from_str(&file_content)?;
    config.validate()?;
    info!(
        "Loaded prompt preamble from '{}' ({} examples)",
        path.as_ref().display(),
        config.examples.len()
    );
    Ok(Arc::new(config))
}

pub fn load_prompts_or_default(
    path: Option<&str>
) -> Result<Arc<PromptConfig>, Box<dyn Error + Send + Sync>> {
    match path {
        Some(p) if !p.trim().is_empty() => {
            load_prompts(p).map_err(|e| format!("Failed to load prompts file '{}': {}", p, e).into())
        }
        _ => {
            info!("Using built-in few-shot preamble");
            Ok(Arc::new(PromptConfig::default()))
        }
    }
}

/// Isolates the newly generated reply from the decoded output.
pub fn extract_reply(decoded: &str) -> String {
    decoded.rsplit(ASSISTANT_MARKER).next().unwrap_or(decoded).trim().to_string()
}
