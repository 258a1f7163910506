pub mod analysis;
pub mod backend;
pub mod config;
pub mod error;
pub mod session;
pub mod speech;
pub mod state;
pub mod store;
pub mod summary;
pub mod tutor;

// Re-export main types for convenience
pub use analysis::{fetch_analysis, strip_marker, AnalysisOutcome, AnalysisReport};
pub use backend::{AnalyzeResponse, ChatBackend, HttpBackend, SendResponse, DEFAULT_BACKEND_URL};
pub use config::Config;
pub use error::{Result, TutorError};
pub use session::{LocalStorage, SessionStore, SESSION_KEY};
pub use speech::{
    CommandSynthesizer, NoSpeechRecognizer, NoSpeechSynthesizer, SpeechRecognizer,
    SpeechSynthesizer, Utterance,
};
pub use state::{ChatAction, ChatState, Message, Sender, SessionData, SessionDataUpdate};
pub use store::ChatStore;
pub use summary::{GrammarTier, SessionSummary};
pub use tutor::{ReplyTiming, Tutor, WELCOME_MESSAGE};
