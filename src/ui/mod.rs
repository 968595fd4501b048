use crate::client::{ submit_message, BackendClient };
use crate::history::{ Notice, SessionStore };
use crate::models::chat::ConversationTurn;
use std::error::Error;
use std::sync::Arc;
use axum::{
    extract::{ Form, State },
    http::{ header, HeaderMap, StatusCode },
    response::{ Html, IntoResponse, Redirect, Response },
    routing::{ get, post },
    Router,
};
use minijinja::{ context, Environment };
use serde::{ Deserialize, Serialize };
use uuid::Uuid;
use log::{ debug, info, error };

pub const SESSION_COOKIE: &str = "tinychat_session";
const INDEX_TEMPLATE: &str = include_str!("index.html");

#[derive(Clone)]
pub struct UiState {
    pub sessions: SessionStore,
    pub backend: BackendClient,
    pub title: String,
    pub assistant_name: String,
    templates: Arc<Environment<'static>>,
}

impl UiState {
    pub fn new(
        backend: BackendClient,
        title: String,
        assistant_name: String
    ) -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template("index.html", INDEX_TEMPLATE)?;
        Ok(Self {
            sessions: SessionStore::new(),
            backend,
            title,
            assistant_name,
            templates: Arc::new(env),
        })
    }

    pub fn with_sessions(mut self, sessions: SessionStore) -> Self {
        self.sessions = sessions;
        self
    }
}

#[derive(Deserialize)]
pub struct SendForm {
    #[serde(default)]
    pub user_input: String,
}

#[derive(Serialize)]
struct NoticeView {
    kind: &'static str,
    text: String,
}

impl From<Notice> for NoticeView {
    fn from(notice: Notice) -> Self {
        match notice {
            Notice::Success(text) => NoticeView { kind: "success", text },
            Notice::Error(text) => NoticeView { kind: "error", text },
        }
    }
}

pub fn create_router(state: UiState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/send", post(send_handler))
        .route("/clear", post(clear_handler))
        .with_state(state)
}

pub async fn start_ui_server(
    addr: &str,
    state: UiState
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let listener = tokio::net::TcpListener
        ::bind(addr).await
        .map_err(|e| format!("Failed to bind chat UI to {}: {}. Try a different port.", addr, e))?;
    info!("Chat UI available at http://{}", listener.local_addr()?);

    axum::serve(listener, create_router(state).into_make_service()).await?;
    Ok(())
}

fn session_from_cookies(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
        .find_map(|id| Uuid::parse_str(id.trim()).ok())
}

fn session_cookie(id: Uuid) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id)
}

fn render_page(
    state: &UiState,
    turns: &[ConversationTurn],
    notice: Option<Notice>
) -> Result<String, minijinja::Error> {
    let template = state.templates.get_template("index.html")?;
    template.render(
        context! {
            title => state.title,
            assistant_name => state.assistant_name,
            turns => turns,
            notice => notice.map(NoticeView::from),
        }
    )
}

async fn index_handler(State(state): State<UiState>, headers: HeaderMap) -> Response {
    let id = state.sessions.open(session_from_cookies(&headers)).await;
    let conversation = state.sessions.conversation(id).await;
    let mut conversation = conversation.lock().await;
    let notice = conversation.take_notice();

    match render_page(&state, conversation.turns(), notice) {
        Ok(body) => ([(header::SET_COOKIE, session_cookie(id))], Html(body)).into_response(),
        Err(e) => {
            error!("Failed to render chat page: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
        }
    }
}

async fn send_handler(
    State(state): State<UiState>,
    headers: HeaderMap,
    Form(form): Form<SendForm>
) -> Response {
    let id = state.sessions.open(session_from_cookies(&headers)).await;
    let conversation = state.sessions.conversation(id).await;
    {
        let mut conversation = conversation.lock().await;
        if let Err(e) = submit_message(&mut conversation, &state.backend, &form.user_input).await {
            debug!("Submit for session {} ended with: {}", id, e);
        }
    }
    ([(header::SET_COOKIE, session_cookie(id))], Redirect::to("/")).into_response()
}

async fn clear_handler(State(state): State<UiState>, headers: HeaderMap) -> Response {
    let id = state.sessions.open(session_from_cookies(&headers)).await;
    state.sessions.conversation(id).await.lock().await.clear();
    info!("Cleared chat session {}", id);
    ([(header::SET_COOKIE, session_cookie(id))], Redirect::to("/")).into_response()
}
