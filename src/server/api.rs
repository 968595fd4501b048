use crate::config::prompt::{ extract_reply, PromptConfig };
use crate::llm::generator::TextGenerator;
use crate::llm::GenerationParams;
use crate::models::chat::{ ChatRequest, ChatResponse, StatusMessage };
use std::error::Error;
use std::sync::Arc;
use std::time::Instant;
use axum::{
    routing::{ get, post },
    Router,
    extract::State,
    response::IntoResponse,
    http::StatusCode,
    Json,
};
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, warn, error };

pub const HEALTH_MESSAGE: &str = "TinyLlama backend is running.";
pub const NO_INPUT_MESSAGE: &str = "No input provided.";

#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<dyn TextGenerator>,
    pub prompts: Arc<PromptConfig>,
    pub params: GenerationParams,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/", get(home_handler))
        .route("/chat", post(chat_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_http_server(
    addr: &str,
    state: AppState
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let listener = tokio::net::TcpListener
        ::bind(addr).await
        .map_err(|e| format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e))?;
    info!("Inference service listening on: http://{}", listener.local_addr()?);

    axum::serve(listener, create_router(state).into_make_service()).await?;
    Ok(())
}

async fn home_handler() -> Json<StatusMessage> {
    Json(StatusMessage { message: HEALTH_MESSAGE.to_string() })
}

fn round_secs(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>
) -> impl IntoResponse {
    let user_input = req.user_input.trim();
    if user_input.is_empty() {
        warn!("Rejected empty chat input");
        return (StatusCode::OK, Json(ChatResponse::reply(NO_INPUT_MESSAGE, 0.0)));
    }

    info!("Chat request ({} chars)", user_input.chars().count());
    let prompt = state.prompts.build_prompt(user_input);

    let start = Instant::now();
    match state.generator.generate(&prompt, &state.params).await {
        Ok(decoded) => {
            let reply = extract_reply(&decoded);
            let elapsed = round_secs(start.elapsed().as_secs_f64());
            info!("Replied in {}s ({} chars)", elapsed, reply.chars().count());
            (StatusCode::OK, Json(ChatResponse::reply(reply, elapsed)))
        }
        Err(e) => {
            error!("Generation failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ChatResponse::error(e)))
        }
    }
}
