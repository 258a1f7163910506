//! UI-agnostic chat state and the reducer that drives it
//!
//! Every change to a [`ChatState`] is expressed as a [`ChatAction`] and applied
//! by [`reduce`]. The reducer is pure and total: no action can fail.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

/// A single chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

static LAST_ID: AtomicU64 = AtomicU64::new(0);

/// Millisecond-clock id, bumped past the previous one when two messages land
/// in the same millisecond. Ids grow in creation order within a process.
fn next_message_id(now: DateTime<Utc>) -> String {
    let candidate = now.timestamp_millis().max(0) as u64;
    let previous = LAST_ID
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(candidate.max(last + 1))
        })
        .unwrap_or_else(|last| last);
    candidate.max(previous + 1).to_string()
}

impl Message {
    pub fn new(text: impl Into<String>, sender: Sender) -> Self {
        let timestamp = Utc::now();
        Self {
            id: next_message_id(timestamp),
            text: text.into(),
            sender,
            timestamp,
        }
    }

    pub fn is_ai(&self) -> bool {
        self.sender == Sender::Ai
    }
}

/// Running metrics for the current conversation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub grammar_score: u8,
    pub vocabulary_tips: Vec<String>,
    pub improvements: Vec<String>,
    pub total_messages: usize,
    /// Carried for parity with the backend's session model; never updated.
    pub session_duration: u64,
}

/// Partial update shallow-merged into [`SessionData`]. `None` keeps the
/// current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionDataUpdate {
    pub grammar_score: Option<u8>,
    pub vocabulary_tips: Option<Vec<String>>,
    pub improvements: Option<Vec<String>>,
    pub total_messages: Option<usize>,
    pub session_duration: Option<u64>,
}

impl SessionData {
    fn merge(mut self, update: SessionDataUpdate) -> Self {
        if let Some(score) = update.grammar_score {
            self.grammar_score = score.min(100);
        }
        if let Some(tips) = update.vocabulary_tips {
            self.vocabulary_tips = tips;
        }
        if let Some(improvements) = update.improvements {
            self.improvements = improvements;
        }
        if let Some(total) = update.total_messages {
            self.total_messages = total;
        }
        if let Some(duration) = update.session_duration {
            self.session_duration = duration;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatState {
    pub messages: Vec<Message>,
    pub session_data: SessionData,
    pub is_loading: bool,
    pub voice_enabled: bool,
}

impl Default for ChatState {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            session_data: SessionData::default(),
            is_loading: false,
            voice_enabled: true,
        }
    }
}

impl ChatState {
    pub fn last_ai_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_ai())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatAction {
    AddMessage(Message),
    SetLoading(bool),
    UpdateSessionData(SessionDataUpdate),
    ResetChat,
    ToggleVoice(bool),
}

pub fn reduce(state: ChatState, action: ChatAction) -> ChatState {
    match action {
        ChatAction::AddMessage(message) => {
            let mut messages = state.messages;
            messages.push(message);
            ChatState {
                messages,
                session_data: SessionData {
                    total_messages: state.session_data.total_messages + 1,
                    ..state.session_data
                },
                ..state
            }
        }
        ChatAction::SetLoading(is_loading) => ChatState { is_loading, ..state },
        ChatAction::UpdateSessionData(update) => ChatState {
            session_data: state.session_data.merge(update),
            ..state
        },
        ChatAction::ResetChat => ChatState::default(),
        ChatAction::ToggleVoice(voice_enabled) => ChatState {
            voice_enabled,
            ..state
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(state: ChatState, text: &str, sender: Sender) -> ChatState {
        reduce(state, ChatAction::AddMessage(Message::new(text, sender)))
    }

    #[test]
    fn test_initial_state() {
        let state = ChatState::default();
        assert!(state.messages.is_empty());
        assert_eq!(state.session_data, SessionData::default());
        assert!(!state.is_loading);
        assert!(state.voice_enabled);
    }

    #[test]
    fn test_add_message_counts_and_orders() {
        let mut state = ChatState::default();
        let texts = ["one", "two", "three", "four", "five"];
        for (i, text) in texts.iter().enumerate() {
            let sender = if i % 2 == 0 { Sender::User } else { Sender::Ai };
            state = add(state, text, sender);
        }

        assert_eq!(state.session_data.total_messages, texts.len());
        let stored: Vec<&str> = state.messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(stored, texts);
    }

    #[test]
    fn test_message_ids_are_unique_and_increasing() {
        let messages: Vec<Message> = (0..200).map(|i| Message::new(i.to_string(), Sender::User)).collect();
        let ids: Vec<u64> = messages.iter().map(|m| m.id.parse().unwrap()).collect();
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1], "{} should precede {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_set_loading_and_toggle_voice() {
        let state = reduce(ChatState::default(), ChatAction::SetLoading(true));
        assert!(state.is_loading);
        let state = reduce(state, ChatAction::ToggleVoice(false));
        assert!(!state.voice_enabled);
        assert!(state.is_loading);
        let state = reduce(state, ChatAction::SetLoading(false));
        assert!(!state.is_loading);
        assert_eq!(state.session_data.total_messages, 0);
    }

    #[test]
    fn test_update_session_data_is_shallow_merge() {
        let state = ChatState::default();
        let state = reduce(
            state,
            ChatAction::UpdateSessionData(SessionDataUpdate {
                vocabulary_tips: Some(vec!["tip".to_string()]),
                ..Default::default()
            }),
        );
        let state = reduce(
            state,
            ChatAction::UpdateSessionData(SessionDataUpdate {
                grammar_score: Some(12),
                ..Default::default()
            }),
        );

        assert_eq!(state.session_data.grammar_score, 12);
        assert_eq!(state.session_data.vocabulary_tips, vec!["tip".to_string()]);
        assert!(state.session_data.improvements.is_empty());
    }

    #[test]
    fn test_grammar_score_clamped() {
        let state = reduce(
            ChatState::default(),
            ChatAction::UpdateSessionData(SessionDataUpdate {
                grammar_score: Some(250),
                ..Default::default()
            }),
        );
        assert_eq!(state.session_data.grammar_score, 100);
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let state = add(ChatState::default(), "hello", Sender::User);
        let state = reduce(state, ChatAction::ToggleVoice(false));
        let state = reduce(state, ChatAction::SetLoading(true));
        let state = reduce(state, ChatAction::ResetChat);
        assert_eq!(state, ChatState::default());
    }

    #[test]
    fn test_last_ai_message() {
        let state = add(ChatState::default(), "hi", Sender::User);
        assert!(state.last_ai_message().is_none());
        let state = add(state, "hello there", Sender::Ai);
        let state = add(state, "how are you", Sender::User);
        assert_eq!(state.last_ai_message().unwrap().text, "hello there");
    }

    #[test]
    fn test_sender_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Sender::Ai).unwrap(), "\"ai\"");
        assert_eq!(serde_json::to_string(&Sender::User).unwrap(), "\"user\"");
    }
}
