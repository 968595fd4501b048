use crate::error::ChatError;
use crate::history::{ Conversation, Notice };
use crate::models::chat::{ ChatRequest, ChatResponse, ConversationTurn };
use log::{ info, warn, error };
use reqwest::Client as HttpClient;
use url::Url;

pub const CONNECTION_FAILED_MESSAGE: &str = "Unable to connect to the backend.";

/// Calls the inference service's `/chat` route.
///
/// No request timeout is configured, so a stalled service stalls the submit.
#[derive(Clone, Debug)]
pub struct BackendClient {
    http: HttpClient,
    chat_url: Url,
}

impl BackendClient {
    pub fn new(chat_url: Url) -> Self {
        Self { http: HttpClient::new(), chat_url }
    }

    pub fn parse(chat_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(Url::parse(chat_url)?))
    }

    pub fn chat_url(&self) -> &Url {
        &self.chat_url
    }

    pub async fn send(&self, user_input: &str) -> Result<ChatResponse, ChatError> {
        let req = ChatRequest { user_input: user_input.to_string() };
        let resp = self.http.post(self.chat_url.clone()).json(&req).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        let parsed = serde_json::from_str::<ChatResponse>(&body);
        if !status.is_success() {
            let message = match parsed {
                Ok(r) => r.response,
                Err(_) => format!("backend returned {}", status),
            };
            return Err(ChatError::GenerationFailed(message));
        }
        parsed.map_err(|e| ChatError::Unexpected(format!("invalid backend response: {}", e)))
    }
}

/// One form submission: optimistic user turn, backend call, then either an
/// assistant turn or an error notice.
pub async fn submit_message(
    conversation: &mut Conversation,
    client: &BackendClient,
    user_input: &str
) -> Result<ChatResponse, ChatError> {
    if user_input.is_empty() {
        return Err(ChatError::InvalidInput);
    }

    conversation.append(ConversationTurn::user(user_input));

    match client.send(user_input).await {
        Ok(resp) => {
            info!("Backend responded in {} seconds", resp.elapsed());
            conversation.append(ConversationTurn::assistant(resp.response.clone()));
            conversation.set_notice(
                Notice::Success(format!("Responded in {} seconds", resp.elapsed()))
            );
            Ok(resp)
        }
        Err(ChatError::ConnectionUnavailable(e)) => {
            warn!("Backend unreachable at {}: {}", client.chat_url(), e);
            conversation.set_notice(Notice::Error(CONNECTION_FAILED_MESSAGE.to_string()));
            Err(ChatError::ConnectionUnavailable(e))
        }
        Err(ChatError::GenerationFailed(message)) => {
            error!("Backend failed to generate: {}", message);
            conversation.set_notice(Notice::Error(message.clone()));
            Err(ChatError::GenerationFailed(message))
        }
        Err(e) => {
            error!("Chat request failed: {}", e);
            conversation.set_notice(Notice::Error(format!("Error: {}", e)));
            Err(e)
        }
    }
}
