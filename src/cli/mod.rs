use clap::{ Args, Parser, Subcommand };

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the inference service (GET /, POST /chat).
    Serve(ServeArgs),
    /// Run the browser chat client against a running inference service.
    Ui(UiArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Host address and port for the inference service to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "0.0.0.0:8500")]
    pub server_addr: String,

    // --- Generation Backend Args ---
    /// Generation backend (candle, ollama)
    #[arg(long, env = "GENERATION_BACKEND", default_value = "candle")]
    pub backend: String,

    /// Hugging Face model id loaded by the candle backend.
    #[arg(long, env = "MODEL_ID", default_value = "TinyLlama/TinyLlama-1.1B-Chat-v1.0")]
    pub model_id: String,

    /// Model revision (branch, tag or commit) on the hub.
    #[arg(long, env = "MODEL_REVISION", default_value = "main")]
    pub revision: String,

    /// Load config.json, tokenizer.json and model.safetensors from this directory instead of the hub.
    #[arg(long, env = "MODEL_DIR")]
    pub model_dir: Option<String>,

    /// Hugging Face access token used for model downloads.
    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    pub hf_token: Option<String>,

    /// Run the candle backend on CPU even when CUDA is available.
    #[arg(long, env = "FORCE_CPU", default_value = "false")]
    pub cpu: bool,

    /// Base URL for the Ollama API (e.g., http://localhost:11434)
    #[arg(long, env = "OLLAMA_BASE_URL")]
    pub ollama_base_url: Option<String>,

    /// Ollama model name (e.g., tinyllama)
    #[arg(long, env = "OLLAMA_MODEL")]
    pub ollama_model: Option<String>,

    // --- Prompt Args ---
    /// Optional JSON file replacing the built-in few-shot preamble.
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct UiArgs {
    /// Host address and port for the chat UI.
    #[arg(long, env = "UI_ADDR", default_value = "127.0.0.1:8501")]
    pub ui_addr: String,

    /// Full URL of the inference service's chat route.
    #[arg(long, env = "BACKEND_URL", default_value = "http://127.0.0.1:8500/chat")]
    pub backend_url: String,

    /// Label shown for assistant turns.
    #[arg(long, env = "ASSISTANT_NAME", default_value = "Adham GPT")]
    pub assistant_name: String,

    /// Page title.
    #[arg(long, env = "PAGE_TITLE", default_value = "Adham GPT")]
    pub title: String,

    /// Maximum browser sessions kept in memory; the least recently used is evicted.
    #[arg(long, env = "MAX_SESSIONS", default_value = "1024")]
    pub max_sessions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_defaults() {
        let cli = Cli::try_parse_from(["tinychat", "serve"]).unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.server_addr, "0.0.0.0:8500");
        assert_eq!(args.backend, "candle");
        assert_eq!(args.model_id, "TinyLlama/TinyLlama-1.1B-Chat-v1.0");
    }

    #[test]
    fn ui_accepts_backend_url() {
        let cli = Cli::try_parse_from([
            "tinychat",
            "ui",
            "--backend-url",
            "http://10.0.0.2:8500/chat",
        ]).unwrap();
        let Command::Ui(args) = cli.command else {
            panic!("expected ui");
        };
        assert_eq!(args.backend_url, "http://10.0.0.2:8500/chat");
        assert_eq!(args.assistant_name, "Adham GPT");
        assert_eq!(args.max_sessions, 1024);
    }
}
