use crate::models::chat::ConversationTurn;
use log::{ debug, info };
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Banner shown once next to the form after a submit.
#[derive(Clone, Debug, PartialEq)]
pub enum Notice {
    Success(String),
    Error(String),
}

/// The turn log of one UI session. Append-only until cleared.
#[derive(Clone, Debug, Default)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
    notice: Option<Notice>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn append(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.notice = None;
    }

    pub fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }
}

pub type SharedConversation = Arc<Mutex<Conversation>>;

pub const DEFAULT_MAX_SESSIONS: usize = 1024;

struct SessionEntry {
    conversation: SharedConversation,
    last_touched: Instant,
}

impl SessionEntry {
    fn new() -> Self {
        Self { conversation: SharedConversation::default(), last_touched: Instant::now() }
    }
}

/// In-memory conversations keyed by browser session id.
///
/// Holds at most `max_sessions` entries; opening one more evicts the
/// least recently touched session.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<Uuid, SessionEntry>>>,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    /// Returns the id of an existing session, or registers a fresh one.
    pub async fn open(&self, id: Option<Uuid>) -> Uuid {
        let mut sessions = self.sessions.lock().await;
        if let Some(id) = id {
            if let Some(entry) = sessions.get_mut(&id) {
                entry.last_touched = Instant::now();
                return id;
            }
        }
        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_touched)
                .map(|(id, _)| *id);
            match oldest {
                Some(old) => {
                    sessions.remove(&old);
                    debug!("Evicted idle chat session {}", old);
                }
                None => break,
            }
        }
        let id = Uuid::new_v4();
        sessions.insert(id, SessionEntry::new());
        info!("Opened chat session {}", id);
        id
    }

    /// Handle to one session's conversation, created on first use.
    ///
    /// Holding the inner lock serializes submits within a session while
    /// other sessions proceed.
    pub async fn conversation(&self, id: Uuid) -> SharedConversation {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions.entry(id).or_insert_with(SessionEntry::new);
        entry.last_touched = Instant::now();
        Arc::clone(&entry.conversation)
    }

    pub async fn contains(&self, id: &Uuid) -> bool {
        self.sessions.lock().await.contains_key(id)
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
