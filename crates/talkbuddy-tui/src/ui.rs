use chrono::{Local, Utc};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
};
use crate::app::{AnalysisView, App, InputMode, Screen};
use talkbuddy_core::{AnalysisOutcome, ChatState, GrammarTier, Sender, SessionSummary};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("**") else {
            break;
        };
        if end == 0 {
            // "****" has nothing to embolden
            spans.push(Span::raw(rest[..start + 4].to_string()));
            rest = &after[2..];
            continue;
        }

        if start > 0 {
            spans.push(Span::raw(rest[..start].to_string()));
        }
        spans.push(Span::styled(
            after[..end].to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        rest = &after[end + 2..];
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

fn tier_color(tier: GrammarTier) -> Color {
    match tier {
        GrammarTier::Good => Color::Green,
        GrammarTier::Fair => Color::Yellow,
        GrammarTier::Low => Color::Red,
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let state = app.state();

    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(frame, header_area);

    match app.screen {
        Screen::Home => render_home_screen(app, frame, body_area),
        Screen::Chat => render_chat_screen(app, &state, frame, body_area),
        Screen::Analysis => render_analysis_screen(app, frame, body_area),
    }

    render_footer(app, &state, frame, footer_area);
}

fn render_header(frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" English Talk Buddy ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, state: &ChatState, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.screen {
        Screen::Home => " HOME ",
        Screen::Chat => " CHAT ",
        Screen::Analysis => " ANALYSIS ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut spans = vec![
        Span::styled(mode_text, mode_style),
        Span::styled(" ", label_style),
    ];

    // A live notice takes the place of the key hints
    if let Some(notice) = &app.notice {
        let color = if notice.is_error { Color::Red } else { Color::Green };
        spans.push(Span::styled(
            format!(" {} ", notice.title),
            Style::default().bg(color).fg(Color::Black).bold(),
        ));
        spans.push(Span::styled(format!(" {}", notice.description), label_style));
        let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
        frame.render_widget(footer, area);
        return;
    }

    let hints = match (app.screen, app.input_mode) {
        (Screen::Home, _) => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" start chatting ", label_style),
            Span::styled(" a ", key_style),
            Span::styled(" analysis ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
        (Screen::Chat, InputMode::Editing) => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
        (Screen::Chat, InputMode::Normal) => {
            let mut hints = vec![
                Span::styled(" i ", key_style),
                Span::styled(" type ", label_style),
                Span::styled(" j/k ", key_style),
                Span::styled(" scroll ", label_style),
            ];
            if app.tutor.speech_supported() {
                let voice_label = if state.voice_enabled { " voice off " } else { " voice on " };
                hints.extend(vec![
                    Span::styled(" v ", key_style),
                    Span::styled(voice_label, label_style),
                    Span::styled(" p ", key_style),
                    Span::styled(" replay ", label_style),
                ]);
            }
            if app.recognizer.is_supported() {
                let mic_label = if app.recognizer.is_listening() { " stop mic " } else { " mic " };
                hints.extend(vec![
                    Span::styled(" m ", key_style),
                    Span::styled(mic_label, label_style),
                ]);
            }
            hints.extend(vec![
                Span::styled(" a ", key_style),
                Span::styled(" analysis ", label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" home ", label_style),
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ]);
            hints
        }
        (Screen::Analysis, _) => vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" home ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
    };
    spans.extend(hints);

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_home_screen(_app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Welcome ");

    let heading = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let muted = Style::default().fg(Color::DarkGray);

    let lines = vec![
        Line::default(),
        Line::from(Span::styled("Practice English with your AI tutor", heading)).centered(),
        Line::from(Span::styled(
            "Have natural conversations, get instant feedback and build confidence.",
            muted,
        ))
        .centered(),
        Line::default(),
        Line::from(Span::styled("Real-time Chat", Style::default().bold())).centered(),
        Line::from(Span::styled(
            "Talk about anything and get a reply within seconds.",
            muted,
        ))
        .centered(),
        Line::default(),
        Line::from(Span::styled("Voice Practice", Style::default().bold())).centered(),
        Line::from(Span::styled(
            "Hear every reply spoken aloud to train your listening.",
            muted,
        ))
        .centered(),
        Line::default(),
        Line::from(Span::styled("Grammar Insights", Style::default().bold())).centered(),
        Line::from(Span::styled(
            "Review mistakes, suggestions and vocabulary tips after you chat.",
            muted,
        ))
        .centered(),
        Line::default(),
        Line::from(vec![
            Span::raw("Press "),
            Span::styled("Enter", Style::default().fg(Color::Yellow).bold()),
            Span::raw(" to start chatting"),
        ])
        .centered(),
    ];

    let home = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(home, area);
}

fn render_chat_screen(app: &mut App, state: &ChatState, frame: &mut Frame, area: Rect) {
    let [conversation_area, summary_area] = Layout::horizontal([
        Constraint::Percentage(67),
        Constraint::Percentage(33),
    ])
    .areas(area);

    let [messages_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(conversation_area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = messages_area.height.saturating_sub(2);
    app.chat_width = messages_area.width.saturating_sub(2);

    // Follow the conversation whenever it grows or the typing indicator flips
    if state.messages.len() != app.seen_messages || state.is_loading != app.seen_loading {
        app.seen_messages = state.messages.len();
        app.seen_loading = state.is_loading;
        app.scroll_chat_to_bottom(state);
    }

    render_messages(app, state, frame, messages_area);
    render_input(app, state, frame, input_area);
    render_summary(state, frame, summary_area);
}

fn render_messages(app: &App, state: &ChatState, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    let chat_text = if state.messages.is_empty() && !state.is_loading {
        Text::from(Span::styled(
            "Say hello to start practicing...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in &state.messages {
            let time = msg.timestamp.with_timezone(&Local).format("%H:%M").to_string();
            let (label, color) = match msg.sender {
                Sender::User => ("You", Color::Cyan),
                Sender::Ai => ("AI", Color::Yellow),
            };
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{}:", label),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!(" {}", time), Style::default().fg(Color::DarkGray)),
            ]));
            for line in msg.text.lines() {
                lines.push(parse_markdown_line(line));
            }
            lines.push(Line::default());
        }

        if state.is_loading {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("typing{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, state: &ChatState, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if state.is_loading {
        Color::DarkGray
    } else if editing {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let title = if app.recognizer.is_listening() {
        " Listening... "
    } else {
        " Type your message "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Calculate visible portion of input with horizontal scrolling
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;

    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let input = if app.input.is_empty() {
        let placeholder = if state.is_loading {
            "Waiting for the tutor..."
        } else {
            "Type your message..."
        };
        Paragraph::new(placeholder).style(Style::default().fg(Color::DarkGray))
    } else {
        let visible_text: String = app.input
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        let color = if state.is_loading { Color::DarkGray } else { Color::Cyan };
        Paragraph::new(visible_text).style(Style::default().fg(color))
    };

    frame.render_widget(input.block(block), area);

    if editing && !state.is_loading {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_summary(state: &ChatState, frame: &mut Frame, area: Rect) {
    let summary = SessionSummary::from_state(state, Utc::now());

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(" Session Summary ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [grammar_area, messages_area, duration_area, notes_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(inner);

    let grammar = Gauge::default()
        .block(Block::default().title("Grammar"))
        .gauge_style(Style::default().fg(tier_color(summary.grammar_tier)))
        .percent(u16::from(summary.grammar_score.min(100)))
        .label(format!("{}%", summary.grammar_score));
    frame.render_widget(grammar, grammar_area);

    let messages = Gauge::default()
        .block(Block::default().title("Messages"))
        .gauge_style(Style::default().fg(Color::Blue))
        .percent(summary.messages_progress)
        .label(summary.total_messages.to_string());
    frame.render_widget(messages, messages_area);

    let duration = Gauge::default()
        .block(Block::default().title("Duration"))
        .gauge_style(Style::default().fg(Color::Cyan))
        .percent(summary.duration_progress)
        .label(format!("{} min", summary.duration_minutes));
    frame.render_widget(duration, duration_area);

    let mut lines: Vec<Line> = Vec::new();
    if !summary.recent_tips.is_empty() {
        lines.push(Line::from(Span::styled(
            "Vocabulary Tips",
            Style::default().fg(Color::Blue).bold(),
        )));
        for tip in &summary.recent_tips {
            lines.push(Line::from(format!("• {}", tip)));
        }
        lines.push(Line::default());
    }
    if !summary.recent_improvements.is_empty() {
        lines.push(Line::from(Span::styled(
            "Improvements",
            Style::default().fg(Color::Green).bold(),
        )));
        for note in &summary.recent_improvements {
            lines.push(Line::from(format!("• {}", note)));
        }
        lines.push(Line::default());
    }
    lines.push(Line::from(Span::styled(
        summary.encouragement,
        Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
    )));

    let notes = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true });
    frame.render_widget(notes, notes_area);
}

fn render_analysis_screen(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Conversation Analysis ");

    let text = match &app.analysis {
        AnalysisView::Loading => {
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            Text::from(Span::styled(
                format!("Analyzing your conversation{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            ))
        }
        AnalysisView::Done(AnalysisOutcome::Failed) => Text::from(Span::styled(
            AnalysisOutcome::FAILURE_NOTICE,
            Style::default().fg(Color::Red).bold(),
        )),
        AnalysisView::Done(AnalysisOutcome::Loaded(report)) => {
            let mut lines: Vec<Line> = Vec::new();
            let sections = [
                ("Mistakes", Color::Red, &report.mistakes),
                ("Suggestions", Color::Green, &report.suggestions),
                ("Vocabulary Tips", Color::Blue, &report.vocab_tips),
            ];
            for (title, color, entries) in sections {
                lines.push(Line::from(Span::styled(
                    title,
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                )));
                if entries.is_empty() {
                    lines.push(Line::from(Span::styled(
                        "  Nothing to report",
                        Style::default().fg(Color::DarkGray),
                    )));
                }
                for entry in entries {
                    lines.push(Line::from(vec![
                        Span::styled("  • ", Style::default().fg(color)),
                        Span::raw(entry.clone()),
                    ]));
                }
                lines.push(Line::default());
            }
            Text::from(lines)
        }
    };

    let analysis = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.analysis_scroll, 0));
    frame.render_widget(analysis, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_parse_markdown_bold() {
        let line = parse_markdown_line("Try **went** instead");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "went");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(plain(&line), "Try went instead");
    }

    #[test]
    fn test_parse_markdown_unclosed_is_literal() {
        let line = parse_markdown_line("a **b");
        assert_eq!(plain(&line), "a **b");
    }

    #[test]
    fn test_parse_markdown_empty() {
        assert!(parse_markdown_line("").spans.is_empty());
    }

    #[test]
    fn test_tier_colors() {
        assert_eq!(tier_color(GrammarTier::Good), Color::Green);
        assert_eq!(tier_color(GrammarTier::Fair), Color::Yellow);
        assert_eq!(tier_color(GrammarTier::Low), Color::Red);
    }
}
