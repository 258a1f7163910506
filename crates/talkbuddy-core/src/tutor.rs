//! The conversation driver.
//!
//! [`Tutor`] wires the chat store to the backend, the session identifier and
//! speech output. It is cheap to clone so each network exchange can run on its
//! own task while the UI keeps reading snapshots from the shared store.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::analysis::{fetch_analysis, AnalysisOutcome};
use crate::backend::{ChatBackend, SendResponse};
use crate::error::Result;
use crate::session::SessionStore;
use crate::speech::{SpeechSynthesizer, Utterance};
use crate::state::{ChatAction, ChatState, Message, Sender, SessionDataUpdate};
use crate::store::ChatStore;

/// Opening instruction sent before the learner says anything
pub const CONVERSATION_INSTRUCTION: &str = "Give me short, natural replies (like a human, not like an AI).Do not use emojis or overly formal language.Actively take part in the conversation by asking me simple follow-up questions related to what I said.";

pub const WELCOME_MESSAGE: &str = "Hello! I'm your English learning buddy. Let's start practicing! Tell me about your day or ask me anything you'd like to discuss in English.";

/// Used when the backend answers without a reply
pub const FALLBACK_REPLY: &str =
    "That's great! Keep practicing your English. Can you tell me more about that?";

pub const CONNECTION_APOLOGY: &str =
    "I'm sorry, I'm having trouble connecting right now. Can you try again?";

pub const VOCABULARY_TIP: &str = "Great use of vocabulary!";
pub const IMPROVEMENT_NOTE: &str = "Your sentence structure is improving!";

/// Largest grammar score gain per successful exchange
const MAX_SCORE_STEP: u8 = 4;

/// Pauses applied before the tutor's answer appears
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTiming {
    pub reply_delay: RangeInclusive<Duration>,
    pub failure_delay: Duration,
}

impl Default for ReplyTiming {
    fn default() -> Self {
        Self {
            reply_delay: Duration::from_millis(1000)..=Duration::from_millis(2000),
            failure_delay: Duration::from_millis(1000),
        }
    }
}

impl ReplyTiming {
    pub fn immediate() -> Self {
        Self {
            reply_delay: Duration::ZERO..=Duration::ZERO,
            failure_delay: Duration::ZERO,
        }
    }

    fn pick_reply_delay(&self) -> Duration {
        let start = self.reply_delay.start().as_millis() as u64;
        let end = self.reply_delay.end().as_millis() as u64;
        if end <= start {
            return Duration::from_millis(start);
        }
        Duration::from_millis(rand::rng().random_range(start..=end))
    }
}

#[derive(Clone)]
pub struct Tutor {
    store: ChatStore,
    backend: Arc<dyn ChatBackend>,
    sessions: SessionStore,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    timing: ReplyTiming,
}

impl Tutor {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        sessions: SessionStore,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            store: ChatStore::new(),
            backend,
            sessions,
            synthesizer,
            timing: ReplyTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: ReplyTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    pub fn snapshot(&self) -> ChatState {
        self.store.snapshot()
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn speech_supported(&self) -> bool {
        self.synthesizer.is_supported()
    }

    pub fn add_message(&self, text: &str, sender: Sender) {
        self.store
            .dispatch(ChatAction::AddMessage(Message::new(text, sender)));
    }

    pub fn set_loading(&self, loading: bool) {
        self.store.dispatch(ChatAction::SetLoading(loading));
    }

    pub fn update_session_data(&self, update: SessionDataUpdate) {
        self.store.dispatch(ChatAction::UpdateSessionData(update));
    }

    pub fn reset_chat(&self) {
        self.store.dispatch(ChatAction::ResetChat);
    }

    pub fn toggle_voice(&self, enabled: bool) {
        self.store.dispatch(ChatAction::ToggleVoice(enabled));
    }

    /// Post the opening greeting shown when the chat screen opens. Not spoken.
    pub fn greet(&self) {
        self.add_message(WELCOME_MESSAGE, Sender::Ai);
    }

    /// Read `text` aloud if speech output exists and voice is enabled.
    pub fn speak_message(&self, text: &str) {
        if self.synthesizer.is_supported() && self.store.voice_enabled() {
            self.synthesizer.speak(&Utterance::tutor(text));
        }
    }

    async fn exchange(&self, message: &str) -> Result<SendResponse> {
        let session_id = self.sessions.get_or_create_session_id()?;
        self.backend.send_message(&session_id, message).await
    }

    /// Ask the backend to open the conversation.
    ///
    /// Failures only clear the loading flag; nothing is shown to the learner.
    pub async fn start_conversation(&self) {
        self.set_loading(true);

        match self.exchange(CONVERSATION_INSTRUCTION).await {
            Ok(response) => {
                tracing::info!(?response, "conversation started");
                if let Some(first_reply) = response.first_reply.filter(|r| !r.is_empty()) {
                    self.add_message(&first_reply, Sender::Ai);
                    self.speak_message(&first_reply);
                }
                self.set_loading(false);
            }
            Err(e) => {
                tracing::error!("Error starting conversation: {}", e);
                self.set_loading(false);
            }
        }
    }

    /// Send the learner's message and wait for the tutor's answer.
    ///
    /// The user message is committed before the request goes out and stays
    /// whatever the outcome. A failed exchange posts an apology instead of a
    /// reply.
    pub async fn send_message(&self, text: &str) {
        self.add_message(text, Sender::User);
        self.set_loading(true);

        match self.exchange(text).await {
            Ok(response) => {
                tokio::time::sleep(self.timing.pick_reply_delay()).await;

                let reply = response
                    .reply
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| FALLBACK_REPLY.to_string());
                self.add_message(&reply, Sender::Ai);
                self.speak_message(&reply);
                self.record_progress();
                self.set_loading(false);
            }
            Err(e) => {
                tracing::error!("Error sending message: {}", e);
                tokio::time::sleep(self.timing.failure_delay).await;

                self.add_message(CONNECTION_APOLOGY, Sender::Ai);
                self.speak_message(CONNECTION_APOLOGY);
                self.set_loading(false);
            }
        }
    }

    fn record_progress(&self) {
        let step = rand::rng().random_range(0..=MAX_SCORE_STEP);
        self.store.dispatch_with(|state| {
            let data = &state.session_data;
            let mut vocabulary_tips = data.vocabulary_tips.clone();
            vocabulary_tips.push(VOCABULARY_TIP.to_string());
            let mut improvements = data.improvements.clone();
            improvements.push(IMPROVEMENT_NOTE.to_string());

            ChatAction::UpdateSessionData(SessionDataUpdate {
                grammar_score: Some(data.grammar_score.saturating_add(step).min(100)),
                vocabulary_tips: Some(vocabulary_tips),
                improvements: Some(improvements),
                ..Default::default()
            })
        });
    }

    pub async fn analyze(&self) -> AnalysisOutcome {
        fetch_analysis(self.backend.as_ref(), &self.sessions).await
    }
}
