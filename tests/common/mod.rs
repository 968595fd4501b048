#![allow(dead_code)]

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::sync::{ Arc, Mutex };
use std::time::Duration;
use tinychat::config::prompt::PromptConfig;
use tinychat::error::GenerationError;
use tinychat::llm::generator::TextGenerator;
use tinychat::llm::GenerationParams;
use tinychat::server::{ create_router, AppState };

pub enum StubMode {
    /// Echo the prompt followed by `Reply #n`, the way a causal model decodes.
    Echo,
    /// Return this decoded text verbatim.
    Fixed(String),
    Fail(String),
}

pub struct StubGenerator {
    mode: StubMode,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    params: Mutex<Vec<GenerationParams>>,
}

impl StubGenerator {
    pub fn new(mode: StubMode) -> Arc<Self> {
        Arc::new(Self::build(mode, None))
    }

    pub fn slow(mode: StubMode, delay: Duration) -> Arc<Self> {
        Arc::new(Self::build(mode, Some(delay)))
    }

    fn build(mode: StubMode, delay: Option<Duration>) -> Self {
        Self {
            mode,
            delay,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            params: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn params(&self) -> Vec<GenerationParams> {
        self.params.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams
    ) -> Result<String, GenerationError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.params.lock().unwrap().push(*params);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.mode {
            StubMode::Echo => Ok(format!("{prompt}Reply #{n}")),
            StubMode::Fixed(text) => Ok(text.clone()),
            StubMode::Fail(msg) => Err(GenerationError::Model(msg.clone())),
        }
    }

    fn describe(&self) -> String {
        "stub".to_string()
    }
}

pub fn app_state(generator: Arc<StubGenerator>) -> AppState {
    AppState {
        generator,
        prompts: Arc::new(PromptConfig::default()),
        params: GenerationParams::default(),
    }
}

/// Serves the inference router on an ephemeral loopback port.
pub async fn spawn_service(generator: Arc<StubGenerator>) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(app_state(generator));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// An address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn chat_url(addr: SocketAddr) -> String {
    format!("http://{addr}/chat")
}
