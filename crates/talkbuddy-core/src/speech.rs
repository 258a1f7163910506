//! Speech adapters.
//!
//! Both directions are optional host capabilities. Callers check
//! `is_supported` at call time and hide the matching control when it is false.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Text plus voice settings for one playback request
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Utterance {
    /// Slightly slowed speech at normal pitch and full volume, tuned for learners.
    pub fn tutor(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rate: 0.9,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

/// Text-to-speech sink. `speak` returns immediately; completion is not tracked.
pub trait SpeechSynthesizer: Send + Sync {
    fn is_supported(&self) -> bool;

    fn speak(&self, utterance: &Utterance);
}

/// Speech-to-text source. A non-empty transcript is the current draft of the
/// outgoing message.
pub trait SpeechRecognizer: Send {
    fn is_supported(&self) -> bool;

    fn is_listening(&self) -> bool;

    fn transcript(&self) -> &str;

    fn start(&mut self);

    fn stop(&mut self);

    fn reset(&mut self);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoSpeechSynthesizer;

impl SpeechSynthesizer for NoSpeechSynthesizer {
    fn is_supported(&self) -> bool {
        false
    }

    fn speak(&self, _utterance: &Utterance) {}
}

/// Recognizer for hosts without a dictation engine
#[derive(Debug, Clone, Default)]
pub struct NoSpeechRecognizer;

impl SpeechRecognizer for NoSpeechRecognizer {
    fn is_supported(&self) -> bool {
        false
    }

    fn is_listening(&self) -> bool {
        false
    }

    fn transcript(&self) -> &str {
        ""
    }

    fn start(&mut self) {}

    fn stop(&mut self) {}

    fn reset(&mut self) {}
}

/// Speech engines probed on `PATH`, in order of preference
const KNOWN_ENGINES: &[&str] = &["espeak-ng", "espeak", "spd-say", "say"];

/// espeak and say both default to roughly 175 words per minute
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

/// Plays utterances through a host speech command such as `espeak-ng` or `say`.
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    program: PathBuf,
}

impl CommandSynthesizer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// First known speech engine found on `PATH`.
    pub fn detect() -> Option<Self> {
        let path_var = std::env::var_os("PATH")?;
        let dirs: Vec<PathBuf> = std::env::split_paths(&path_var).collect();
        KNOWN_ENGINES.iter().find_map(|engine| {
            dirs.iter()
                .map(|dir| dir.join(engine))
                .find(|candidate| candidate.is_file())
                .map(Self::new)
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn engine_name(&self) -> &str {
        self.program
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// Command-line arguments mapping the utterance settings onto the engine's flags.
    pub fn args_for(&self, utterance: &Utterance) -> Vec<String> {
        let wpm = (BASE_WORDS_PER_MINUTE * utterance.rate).round() as i32;
        let mut args = match self.engine_name() {
            "espeak" | "espeak-ng" => vec![
                "-s".to_string(),
                wpm.to_string(),
                "-p".to_string(),
                ((utterance.pitch * 50.0).round() as i32).clamp(0, 99).to_string(),
                "-a".to_string(),
                ((utterance.volume * 100.0).round() as i32).clamp(0, 200).to_string(),
            ],
            // spd-say takes offsets in -100..=100 around the voice default
            "spd-say" => vec![
                "-r".to_string(),
                offset_percent(utterance.rate).to_string(),
                "-p".to_string(),
                offset_percent(utterance.pitch).to_string(),
                "-i".to_string(),
                offset_percent(utterance.volume).to_string(),
            ],
            "say" => vec!["-r".to_string(), wpm.to_string()],
            _ => Vec::new(),
        };
        args.push(utterance.text.clone());
        args
    }
}

fn offset_percent(factor: f32) -> i32 {
    (((factor - 1.0) * 100.0).round() as i32).clamp(-100, 100)
}

impl SpeechSynthesizer for CommandSynthesizer {
    fn is_supported(&self) -> bool {
        true
    }

    fn speak(&self, utterance: &Utterance) {
        let spawned = Command::new(&self.program)
            .args(self.args_for(utterance))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(mut child) => {
                // Reap in the background so finished engines don't linger as zombies
                std::thread::spawn(move || {
                    let _ = child.wait();
                });
            }
            Err(e) => {
                tracing::warn!(program = %self.program.display(), "speech command failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tutor_utterance_settings() {
        let u = Utterance::tutor("Hello");
        assert_eq!(u.text, "Hello");
        assert_eq!(u.rate, 0.9);
        assert_eq!(u.pitch, 1.0);
        assert_eq!(u.volume, 1.0);
    }

    #[test]
    fn test_espeak_args() {
        let synth = CommandSynthesizer::new("/usr/bin/espeak-ng");
        let args = synth.args_for(&Utterance::tutor("Good job!"));
        assert_eq!(args, vec!["-s", "158", "-p", "50", "-a", "100", "Good job!"]);
    }

    #[test]
    fn test_spd_say_args() {
        let synth = CommandSynthesizer::new("spd-say");
        let args = synth.args_for(&Utterance::tutor("Hi"));
        assert_eq!(args, vec!["-r", "-10", "-p", "0", "-i", "0", "Hi"]);
    }

    #[test]
    fn test_say_args() {
        let synth = CommandSynthesizer::new("/usr/bin/say");
        assert_eq!(synth.args_for(&Utterance::tutor("Hi")), vec!["-r", "158", "Hi"]);
    }

    #[test]
    fn test_unknown_engine_gets_text_only() {
        let synth = CommandSynthesizer::new("/opt/tts/custom-voice");
        assert_eq!(synth.args_for(&Utterance::tutor("Hi")), vec!["Hi"]);
    }

    #[test]
    fn test_missing_program_does_not_panic() {
        let synth = CommandSynthesizer::new("/nonexistent/talkbuddy-tts");
        synth.speak(&Utterance::tutor("nobody hears this"));
    }

    #[test]
    fn test_no_capabilities() {
        assert!(!NoSpeechSynthesizer.is_supported());
        let mut recognizer = NoSpeechRecognizer;
        assert!(!recognizer.is_supported());
        recognizer.start();
        assert!(!recognizer.is_listening());
        assert_eq!(recognizer.transcript(), "");
    }
}
