pub mod api;

use crate::config::prompt::PromptConfig;
use crate::llm::generator::TextGenerator;
use crate::llm::GenerationParams;
use std::error::Error;
use std::sync::Arc;

pub use api::{ create_router, AppState };

pub struct Server {
    addr: String,
    state: AppState,
}

impl Server {
    pub fn new(
        addr: String,
        generator: Arc<dyn TextGenerator>,
        prompts: Arc<PromptConfig>,
        params: GenerationParams
    ) -> Self {
        Self {
            addr,
            state: AppState { generator, prompts, params },
        }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        api::start_http_server(&self.addr, self.state.clone()).await
    }
}
