//! Read-only session summary derived from the chat state

use chrono::{DateTime, Utc};

use crate::state::ChatState;

const MESSAGE_GOAL: usize = 20;
const DURATION_GOAL_MINUTES: i64 = 30;
const RECENT_ITEMS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrammarTier {
    Good,
    Fair,
    Low,
}

impl GrammarTier {
    pub fn for_score(score: u8) -> Self {
        if score >= 70 {
            GrammarTier::Good
        } else if score >= 50 {
            GrammarTier::Fair
        } else {
            GrammarTier::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub grammar_score: u8,
    pub grammar_tier: GrammarTier,
    pub total_messages: usize,
    pub messages_progress: u16,
    pub duration_minutes: i64,
    pub duration_progress: u16,
    pub recent_tips: Vec<String>,
    pub recent_improvements: Vec<String>,
    pub encouragement: &'static str,
}

impl SessionSummary {
    pub fn from_state(state: &ChatState, now: DateTime<Utc>) -> Self {
        let data = &state.session_data;

        // Duration counts from the first message; an empty chat has none yet
        let duration_minutes = state
            .messages
            .first()
            .map(|m| (now - m.timestamp).num_minutes().max(0))
            .unwrap_or(0);

        Self {
            grammar_score: data.grammar_score,
            grammar_tier: GrammarTier::for_score(data.grammar_score),
            total_messages: data.total_messages,
            messages_progress: (data.total_messages * 100 / MESSAGE_GOAL).min(100) as u16,
            duration_minutes,
            duration_progress: (duration_minutes * 100 / DURATION_GOAL_MINUTES).min(100) as u16,
            recent_tips: last_n(&data.vocabulary_tips, RECENT_ITEMS),
            recent_improvements: last_n(&data.improvements, RECENT_ITEMS),
            encouragement: encouragement(state.messages.len()),
        }
    }
}

fn last_n(items: &[String], n: usize) -> Vec<String> {
    items[items.len().saturating_sub(n)..].to_vec()
}

pub fn encouragement(message_count: usize) -> &'static str {
    if message_count < 5 {
        "You're just getting started! Keep the conversation flowing."
    } else if message_count < 15 {
        "Great progress! Your English is improving with each message."
    } else {
        "Amazing work! You're having a fantastic conversation!"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{reduce, ChatAction, Message, Sender, SessionDataUpdate};
    use chrono::Duration;

    fn with_messages(count: usize) -> ChatState {
        (0..count).fold(ChatState::default(), |state, i| {
            reduce(state, ChatAction::AddMessage(Message::new(i.to_string(), Sender::User)))
        })
    }

    #[test]
    fn test_grammar_tiers() {
        assert_eq!(GrammarTier::for_score(0), GrammarTier::Low);
        assert_eq!(GrammarTier::for_score(49), GrammarTier::Low);
        assert_eq!(GrammarTier::for_score(50), GrammarTier::Fair);
        assert_eq!(GrammarTier::for_score(69), GrammarTier::Fair);
        assert_eq!(GrammarTier::for_score(70), GrammarTier::Good);
        assert_eq!(GrammarTier::for_score(100), GrammarTier::Good);
    }

    #[test]
    fn test_empty_state() {
        let summary = SessionSummary::from_state(&ChatState::default(), Utc::now());
        assert_eq!(summary.total_messages, 0);
        assert_eq!(summary.messages_progress, 0);
        assert_eq!(summary.duration_minutes, 0);
        assert!(summary.recent_tips.is_empty());
        assert_eq!(
            summary.encouragement,
            "You're just getting started! Keep the conversation flowing."
        );
    }

    #[test]
    fn test_message_progress_caps_at_goal() {
        let summary = SessionSummary::from_state(&with_messages(10), Utc::now());
        assert_eq!(summary.messages_progress, 50);
        let summary = SessionSummary::from_state(&with_messages(25), Utc::now());
        assert_eq!(summary.messages_progress, 100);
    }

    #[test]
    fn test_duration_from_first_message() {
        let state = with_messages(1);
        let start = state.messages[0].timestamp;

        let summary = SessionSummary::from_state(&state, start + Duration::minutes(15));
        assert_eq!(summary.duration_minutes, 15);
        assert_eq!(summary.duration_progress, 50);

        let summary = SessionSummary::from_state(&state, start + Duration::minutes(45));
        assert_eq!(summary.duration_progress, 100);
    }

    #[test]
    fn test_recent_items_keep_last_three() {
        let tips: Vec<String> = (1..=5).map(|i| format!("tip {}", i)).collect();
        let state = reduce(
            ChatState::default(),
            ChatAction::UpdateSessionData(SessionDataUpdate {
                vocabulary_tips: Some(tips),
                improvements: Some(vec!["only one".to_string()]),
                ..Default::default()
            }),
        );
        let summary = SessionSummary::from_state(&state, Utc::now());
        assert_eq!(summary.recent_tips, vec!["tip 3", "tip 4", "tip 5"]);
        assert_eq!(summary.recent_improvements, vec!["only one"]);
    }

    #[test]
    fn test_encouragement_thresholds() {
        assert_eq!(encouragement(4), encouragement(0));
        assert_eq!(
            encouragement(5),
            "Great progress! Your English is improving with each message."
        );
        assert_eq!(encouragement(14), encouragement(5));
        assert_eq!(
            encouragement(15),
            "Amazing work! You're having a fantastic conversation!"
        );
    }
}
