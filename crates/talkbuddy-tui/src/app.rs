use talkbuddy_core::{AnalysisOutcome, ChatState, SpeechRecognizer, Tutor};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Chat,
    Analysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisView {
    Loading,
    Done(AnalysisOutcome),
}

/// Short-lived status line, e.g. after toggling voice output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub is_error: bool,
    ticks_left: u8,
}

/// About three seconds at the 300ms tick rate
const NOTICE_TICKS: u8 = 10;

pub struct App {
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,

    pub tutor: Tutor,
    pub recognizer: Box<dyn SpeechRecognizer>,
    pub greeted: bool,

    // Message draft
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Chat scroll state
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of the message pane
    pub chat_width: u16,  // Inner width of the message pane
    pub seen_messages: usize,
    pub seen_loading: bool,

    pub notice: Option<Notice>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Analysis state
    pub analysis: AnalysisView,
    pub analysis_task: Option<JoinHandle<AnalysisOutcome>>,
    pub analysis_scroll: u16,
}

impl App {
    pub fn new(tutor: Tutor, recognizer: Box<dyn SpeechRecognizer>) -> Self {
        Self {
            should_quit: false,
            screen: Screen::Home,
            input_mode: InputMode::Normal,

            tutor,
            recognizer,
            greeted: false,

            input: String::new(),
            cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            seen_messages: 0,
            seen_loading: false,

            notice: None,
            animation_frame: 0,

            analysis: AnalysisView::Loading,
            analysis_task: None,
            analysis_scroll: 0,
        }
    }

    /// Kick off the opening exchange in the background.
    pub fn start(&self) {
        let tutor = self.tutor.clone();
        tokio::spawn(async move {
            tutor.start_conversation().await;
        });
    }

    pub fn state(&self) -> ChatState {
        self.tutor.snapshot()
    }

    pub fn open_chat(&mut self) {
        self.screen = Screen::Chat;
        self.input_mode = InputMode::Editing;
        if !self.greeted {
            self.greeted = true;
            self.tutor.greet();
        }
    }

    pub fn open_home(&mut self) {
        self.screen = Screen::Home;
        self.input_mode = InputMode::Normal;
    }

    /// Switch to the analysis screen and fetch a fresh report.
    pub fn open_analysis(&mut self) {
        self.screen = Screen::Analysis;
        self.input_mode = InputMode::Normal;
        self.analysis = AnalysisView::Loading;
        self.analysis_scroll = 0;

        if let Some(task) = self.analysis_task.take() {
            task.abort();
        }
        let tutor = self.tutor.clone();
        self.analysis_task = Some(tokio::spawn(async move { tutor.analyze().await }));
    }

    /// Collect the analysis result once its task has finished.
    pub async fn poll_analysis(&mut self) {
        let finished = self
            .analysis_task
            .as_ref()
            .map(|task| task.is_finished())
            .unwrap_or(false);
        if !finished {
            return;
        }

        if let Some(task) = self.analysis_task.take() {
            let outcome = task.await.unwrap_or_else(|e| {
                tracing::error!("analysis task failed: {}", e);
                AnalysisOutcome::Failed
            });
            self.analysis = AnalysisView::Done(outcome);
        }
    }

    pub fn can_send(&self) -> bool {
        !self.input.trim().is_empty() && !self.tutor.store().is_loading()
    }

    /// Send the draft. Ignored while the tutor is still answering.
    pub fn submit_message(&mut self) {
        if !self.can_send() {
            return;
        }

        let text = self.input.trim().to_string();
        self.input.clear();
        self.cursor = 0;
        if self.recognizer.is_listening() {
            self.recognizer.stop();
        }
        self.recognizer.reset();

        let tutor = self.tutor.clone();
        tokio::spawn(async move {
            tutor.send_message(&text).await;
        });
    }

    pub fn toggle_voice(&mut self) {
        let enabled = !self.tutor.store().voice_enabled();
        self.tutor.toggle_voice(enabled);
        if enabled {
            self.show_notice("Voice Output Enabled", "AI messages will now be spoken aloud.", false);
        } else {
            self.show_notice(
                "Voice Output Disabled",
                "AI messages will no longer be spoken aloud.",
                false,
            );
        }
    }

    pub fn replay_last_reply(&mut self) {
        let state = self.state();
        if let Some(message) = state.last_ai_message() {
            self.tutor.speak_message(&message.text);
        }
    }

    pub fn toggle_listening(&mut self) {
        if !self.recognizer.is_supported() {
            self.show_notice(
                "Voice Input Not Supported",
                "This terminal has no speech recognition engine.",
                true,
            );
            return;
        }

        if self.recognizer.is_listening() {
            self.recognizer.stop();
            self.recognizer.reset();
        } else {
            self.recognizer.start();
        }
    }

    /// A fresh transcript replaces the draft.
    pub fn sync_transcript(&mut self) {
        let transcript = self.recognizer.transcript();
        if !transcript.is_empty() && transcript != self.input {
            self.input = transcript.to_string();
            self.cursor = self.input.chars().count();
        }
    }

    pub fn show_notice(&mut self, title: &str, description: &str, is_error: bool) {
        self.notice = Some(Notice {
            title: title.to_string(),
            description: description.to_string(),
            is_error,
            ticks_left: NOTICE_TICKS,
        });
    }

    pub fn tick(&mut self) {
        if self.tutor.store().is_loading() || self.analysis_task.is_some() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }

        if let Some(notice) = self.notice.as_mut() {
            notice.ticks_left = notice.ticks_left.saturating_sub(1);
            if notice.ticks_left == 0 {
                self.notice = None;
            }
        }
    }

    pub fn scroll_chat_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    /// Scroll chat to bottom so the newest message (or typing indicator) is visible
    pub fn scroll_chat_to_bottom(&mut self, state: &ChatState) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in &state.messages {
            total_lines += 1; // Sender line
            for line in msg.text.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after message
        }

        if state.is_loading {
            total_lines += 2; // "AI:" + "typing..."
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }
}
