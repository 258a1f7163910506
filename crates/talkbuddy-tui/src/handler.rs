use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crate::app::{App, InputMode, Screen};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize(_, _) | AppEvent::StateChanged => {}
        AppEvent::Tick => {
            app.tick();
            app.sync_transcript();
            app.poll_analysis().await;
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match app.screen {
        Screen::Home => handle_home(app, key),
        Screen::Chat => handle_chat_normal(app, key),
        Screen::Analysis => handle_analysis(app, key),
    }
}

fn handle_home(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Enter | KeyCode::Char('s') => app.open_chat(),
        KeyCode::Char('a') => app.open_analysis(),
        _ => {}
    }
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Esc | KeyCode::Char('h') => app.open_home(),

        // Back to typing
        KeyCode::Char('i') | KeyCode::Enter | KeyCode::Tab => {
            app.input_mode = InputMode::Editing;
        }

        KeyCode::Char('j') | KeyCode::Down => app.scroll_chat_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_chat_up(1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_chat_down(app.chat_height / 2);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_chat_up(app.chat_height / 2);
        }

        // Voice controls, only offered when the capability exists
        KeyCode::Char('v') if app.tutor.speech_supported() => app.toggle_voice(),
        KeyCode::Char('p') if app.tutor.speech_supported() => app.replay_last_reply(),
        KeyCode::Char('m') if app.recognizer.is_supported() => app.toggle_listening(),

        KeyCode::Char('a') => app.open_analysis(),
        _ => {}
    }
}

fn handle_analysis(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Esc | KeyCode::Char('h') | KeyCode::Backspace => app.open_home(),
        KeyCode::Char('j') | KeyCode::Down => {
            app.analysis_scroll = app.analysis_scroll.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.analysis_scroll = app.analysis_scroll.saturating_sub(1);
        }
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    if app.screen != Screen::Chat {
        app.input_mode = InputMode::Normal;
        return;
    }

    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            // Shift+Enter is swallowed rather than sending
            if !key.modifiers.contains(KeyModifiers::SHIFT) {
                app.submit_message();
            }
        }
        _ if app.tutor.store().is_loading() => {
            // Input is locked until the tutor answers
        }
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.cursor = (app.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use talkbuddy_core::{
        HttpBackend, LocalStorage, NoSpeechRecognizer, NoSpeechSynthesizer, SessionStore, Tutor,
    };
    use tempfile::TempDir;

    fn app(dir: &TempDir) -> App {
        let tutor = Tutor::new(
            Arc::new(HttpBackend::new("http://127.0.0.1:9")),
            SessionStore::new(LocalStorage::in_dir(dir.path())),
            Arc::new(NoSpeechSynthesizer),
        );
        App::new(tutor, Box::new(NoSpeechRecognizer))
    }

    fn press(app: &mut App, code: KeyCode) {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_char_to_byte_index() {
        assert_eq!(char_to_byte_index("héllo", 2), 3);
        assert_eq!(char_to_byte_index("abc", 10), 3);
    }

    #[test]
    fn test_editing_with_cursor() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        app.open_chat();

        type_text(&mut app, "I go");
        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Left);
        type_text(&mut app, "é ");
        assert_eq!(app.input, "I é go");

        press(&mut app, KeyCode::Home);
        press(&mut app, KeyCode::Delete);
        assert_eq!(app.input, " é go");

        press(&mut app, KeyCode::End);
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.input, " é g");
    }

    #[test]
    fn test_input_locked_while_loading() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        app.open_chat();
        app.tutor.set_loading(true);

        type_text(&mut app, "abc");
        assert!(app.input.is_empty());

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[test]
    fn test_voice_keys_hidden_without_speech() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        app.open_chat();
        press(&mut app, KeyCode::Esc);

        press(&mut app, KeyCode::Char('v'));
        assert!(app.tutor.store().voice_enabled());
        assert!(app.notice.is_none());

        press(&mut app, KeyCode::Char('m'));
        assert!(app.notice.is_none());
    }

    #[test]
    fn test_navigation_between_screens() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        assert_eq!(app.screen, Screen::Home);

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.screen, Screen::Chat);

        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('h'));
        assert_eq!(app.screen, Screen::Home);

        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn test_ctrl_c_quits_while_editing() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        app.open_chat();
        handle_key(&mut app, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }
}
