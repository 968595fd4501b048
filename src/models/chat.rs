use serde::{ Deserialize, Serialize };
use std::fmt;

pub const NO_RESPONSE_RECEIVED: &str = "No response received.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub user_input: String,
}

/// Body of every `/chat` answer. Failures carry no `time`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default = "no_response_received")]
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
}

fn no_response_received() -> String {
    NO_RESPONSE_RECEIVED.to_string()
}

impl ChatResponse {
    pub fn reply(response: impl Into<String>, time: f64) -> Self {
        Self { response: response.into(), time: Some(time) }
    }

    pub fn error(message: impl fmt::Display) -> Self {
        Self { response: format!("Error: {}", message), time: None }
    }

    pub fn elapsed(&self) -> f64 {
        self.time.unwrap_or(0.0)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusMessage {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let parsed: ChatResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.response, NO_RESPONSE_RECEIVED);
        assert_eq!(parsed.elapsed(), 0.0);

        let req: ChatRequest = serde_json::from_str("{}").unwrap();
        assert!(req.user_input.is_empty());
    }

    #[test]
    fn error_body_has_no_time_key() {
        let body = serde_json::to_value(ChatResponse::error("boom")).unwrap();
        assert_eq!(body, serde_json::json!({ "response": "Error: boom" }));
    }
}
