pub mod models;
pub mod error;
pub mod server;
pub mod config;
pub mod llm;
pub mod cli;
pub mod history;
pub mod client;
pub mod ui;

use cli::{ Command, ServeArgs, UiArgs };
use client::BackendClient;
use history::SessionStore;
use config::prompt::load_prompts_or_default;
use llm::generator::new_generator;
use llm::{ BackendType, GenerationParams, LlmConfig };
use log::info;
use server::Server;
use std::error::Error;
use ui::UiState;

pub async fn run(command: Command) -> Result<(), Box<dyn Error + Send + Sync>> {
    match command {
        Command::Serve(args) => serve(args).await,
        Command::Ui(args) => run_ui(args).await,
    }
}

pub async fn serve(args: ServeArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    let backend: BackendType = args.backend.parse()?;
    let params = GenerationParams::default();

    info!("--- Service Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Generation Backend: {}", backend);
    info!("Model ID: {} (revision {})", args.model_id, args.revision);
    info!("Model Dir: {}", args.model_dir.as_deref().unwrap_or("hub download"));
    info!("HF Token: {}", if args.hf_token.is_some() { "set" } else { "not set" });
    info!("Prompts Path: {}", args.prompts_path.as_deref().unwrap_or("built-in"));
    info!(
        "Generation: max_new_tokens={} temperature={} top_p={} repetition_penalty={}",
        params.max_new_tokens,
        params.temperature,
        params.top_p,
        params.repetition_penalty
    );
    info!("-----------------------------");

    let prompts = load_prompts_or_default(args.prompts_path.as_deref())?;
    let llm_config = LlmConfig {
        backend,
        model_id: args.model_id.clone(),
        revision: args.revision.clone(),
        model_dir: args.model_dir.clone(),
        hf_token: args.hf_token.clone(),
        base_url: args.ollama_base_url.clone(),
        completion_model: args.ollama_model.clone(),
        force_cpu: args.cpu,
    };
    let generator = new_generator(&llm_config).await?;

    info!("Starting inference service on: {}", args.server_addr);
    let server = Server::new(args.server_addr, generator, prompts, params);
    server.run().await
}

pub async fn run_ui(args: UiArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Chat UI Configuration ---");
    info!("UI Address: {}", args.ui_addr);
    info!("Backend URL: {}", args.backend_url);
    info!("Assistant Name: {}", args.assistant_name);
    info!("Max Sessions: {}", args.max_sessions);
    info!("-----------------------------");

    let backend = BackendClient::parse(&args.backend_url).map_err(|e|
        format!("Invalid backend URL '{}': {}", args.backend_url, e)
    )?;
    let state = UiState::new(backend, args.title, args.assistant_name)?.with_sessions(
        SessionStore::with_capacity(args.max_sessions)
    );
    ui::start_ui_server(&args.ui_addr, state).await
}
