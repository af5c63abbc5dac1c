use ratatui::{
    Frame,
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use crate::app::{App, InputMode};
use crate::chat::{self, ChatRole, Segment};
use crate::model::Model;

/// Parse a line of text and convert **bold** and `code` markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    // Headings render as a single bold span
    let trimmed = text.trim_start();
    if trimmed.starts_with('#') {
        let heading = trimmed.trim_start_matches('#').trim_start();
        return Line::from(Span::styled(
            heading.to_string(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
    }

    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            // Consume the second *
            chars.next();

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;

            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                if !current_text.is_empty() {
                    spans.push(Span::raw(std::mem::take(&mut current_text)));
                }
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else if c == '`' {
            let mut code_text = String::new();
            let mut found_close = false;

            for c in chars.by_ref() {
                if c == '`' {
                    found_close = true;
                    break;
                }
                code_text.push(c);
            }

            if found_close && !code_text.is_empty() {
                if !current_text.is_empty() {
                    spans.push(Span::raw(std::mem::take(&mut current_text)));
                }
                spans.push(Span::styled(code_text, Style::default().fg(Color::Green)));
            } else {
                current_text.push('`');
                current_text.push_str(&code_text);
                if found_close {
                    current_text.push('`');
                }
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

/// Lines for one message body: prose through the markdown parser, fenced
/// code as a boxed block
fn message_lines(content: &str) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let code_style = Style::default().fg(Color::Green);
    let frame_style = Style::default().fg(Color::DarkGray);

    for segment in chat::segments(content) {
        match segment {
            Segment::Text(text) => {
                lines.extend(text.lines().map(parse_markdown_line));
            }
            Segment::Code { language, code } => {
                let label = language.unwrap_or_else(|| "code".to_string());
                lines.push(Line::from(Span::styled(format!("┌─ {} ", label), frame_style)));
                for code_line in code.lines() {
                    lines.push(Line::from(vec![
                        Span::styled("│ ", frame_style),
                        Span::styled(code_line.to_string(), code_style),
                    ]));
                }
                lines.push(Line::from(Span::styled("└─", frame_style)));
            }
        }
    }

    lines
}

/// Banner rows are capped so the chat keeps most of a small terminal
const MAX_BANNER_HEIGHT: u16 = 8;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Banner height follows its wrapped text plus the two border rows
    let banner = banner_paragraph(app);
    let banner_height = match &banner {
        Some(paragraph) => {
            let lines = paragraph.line_count(area.width.saturating_sub(2)) as u16;
            (lines + 2).min(MAX_BANNER_HEIGHT)
        }
        None => 0,
    };

    // Main layout: header, banner, chat, input, footer
    let [header_area, banner_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(banner_height),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    if let Some(paragraph) = banner {
        render_banner(app, paragraph, frame, banner_area);
    }
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.show_model_picker {
        render_model_picker(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let (status_text, status_color) = if app.is_checking() {
        ("checking", Color::Yellow)
    } else if app.status.ok {
        ("connected", Color::Green)
    } else {
        ("offline", Color::Red)
    };

    let mut spans = vec![
        Span::styled(" Ollama Chat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw("  "),
        Span::styled(format!("[{}]", app.model), Style::default().fg(Color::Magenta).bold()),
        Span::raw(" "),
        Span::styled(status_text, Style::default().fg(status_color)),
    ];

    if let Some(version) = &app.server_version {
        spans.push(Span::styled(
            format!("  ollama {}", version),
            Style::default().fg(Color::DarkGray),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn banner_paragraph(app: &App) -> Option<Paragraph<'static>> {
    let detail = app.banner()?;
    Some(
        Paragraph::new(Line::from(Span::styled(
            detail.to_string(),
            Style::default().fg(Color::Red),
        )))
        .wrap(Wrap { trim: true }),
    )
}

fn render_banner(app: &App, banner: Paragraph<'static>, frame: &mut Frame, area: Rect) {
    let action = if app.is_checking() {
        Span::styled(" Checking... ", Style::default().fg(Color::Yellow))
    } else {
        Span::styled(" [r] Retry Connection ", Style::default().fg(Color::White).bold())
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Error ")
        .title_bottom(Line::from(action).right_aligned());

    frame.render_widget(banner.block(block), area);
}

fn chat_text(app: &App) -> Text<'static> {
    if app.transcript.is_empty() && !app.is_loading() {
        return Text::from(Span::styled(
            "Send a message to start chatting.",
            Style::default().fg(Color::DarkGray),
        ));
    }

    let assistant_style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let mut lines: Vec<Line<'static>> = Vec::new();

    for msg in app.transcript.messages() {
        let label = match msg.role {
            ChatRole::User => Span::styled(
                "You:",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            ChatRole::Assistant => Span::styled("AI:", assistant_style),
        };
        lines.push(Line::from(label));
        lines.extend(message_lines(&msg.content));
        lines.push(Line::default());
    }

    if app.is_loading() {
        lines.push(Line::from(Span::styled("AI:", assistant_style)));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    Text::from(lines)
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);

    // Count rows with the same wrapping the paragraph renders with
    let chat = Paragraph::new(chat_text(app)).wrap(Wrap { trim: false });
    let line_count = chat.line_count(inner_width).min(u16::MAX as usize) as u16;
    app.set_chat_layout(inner_height, line_count);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Chat ");

    frame.render_widget(chat.block(block).scroll((app.chat_scroll, 0)), area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let enabled = app.input_enabled();

    let border_color = if editing {
        Color::Cyan
    } else if enabled {
        Color::White
    } else {
        Color::DarkGray
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Message ");

    let inner_width = area.width.saturating_sub(2) as usize;

    let paragraph = if app.input.is_empty() {
        let placeholder = if app.banner().is_some() {
            "Cannot connect to Ollama API..."
        } else if app.is_checking() {
            "Checking connection..."
        } else {
            "Type your message..."
        };
        Paragraph::new(Span::styled(placeholder, Style::default().fg(Color::DarkGray)))
    } else {
        // Keep the cursor in view on long input
        let offset = app.input_cursor.saturating_sub(inner_width.saturating_sub(1));
        let visible: String = app.input.chars().skip(offset).take(inner_width).collect();
        let style = if enabled {
            Style::default()
        } else {
            Style::default().fg(Color::DarkGray)
        };
        Paragraph::new(Span::styled(visible, style))
    };

    frame.render_widget(paragraph.block(block), area);

    if editing {
        let offset = app.input_cursor.saturating_sub(inner_width.saturating_sub(1));
        let x = area.x + 1 + (app.input_cursor - offset) as u16;
        frame.set_cursor_position(Position::new(x, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let hints = if app.show_model_picker {
        " j/k: move | Enter: select | Esc: cancel "
    } else {
        match app.input_mode {
            InputMode::Editing => " Enter: send | Esc: stop typing | Ctrl+C: quit ",
            InputMode::Normal if app.banner().is_some() => {
                " r: retry | m: model | j/k: scroll | q: quit "
            }
            InputMode::Normal => " i: type | m: model | j/k: scroll | r: recheck | q: quit ",
        }
    };

    let footer = Paragraph::new(Line::from(Span::styled(
        hints,
        Style::default().fg(Color::DarkGray),
    )));
    frame.render_widget(footer, area);
}

fn render_model_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let models = Model::all();

    // Calculate popup size and position (centered)
    let popup_width = 40.min(area.width.saturating_sub(4));
    let popup_height = (models.len() as u16 + 2).min(area.height.saturating_sub(4));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Select Model ");

    let items: Vec<ListItem> = models
        .iter()
        .map(|model| {
            let style = if *model == app.model {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} ", model)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.model_picker_state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::SEND_FAILED;
    use crate::chat::ConnectionStatus;
    use crate::ollama::OllamaError;
    use ratatui::{backend::TestBackend, Terminal};

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn draw(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_parse_markdown_bold_and_code() {
        let line = parse_markdown_line("use **cargo** and `rustc` here");
        assert_eq!(line_text(&line), "use cargo and rustc here");
        assert_eq!(line.spans.len(), 5);
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(line.spans[3].style.fg, Some(Color::Green));
    }

    #[test]
    fn test_parse_markdown_unclosed_markers_are_literal() {
        assert_eq!(line_text(&parse_markdown_line("a **b")), "a **b");
        assert_eq!(line_text(&parse_markdown_line("x `y")), "x `y");
    }

    #[test]
    fn test_parse_markdown_heading() {
        let line = parse_markdown_line("## Title");
        assert_eq!(line_text(&line), "Title");
    }

    #[test]
    fn test_message_lines_boxes_code() {
        let lines = message_lines("Try:\n```sh\necho hi\n```");
        let texts: Vec<String> = lines.iter().map(line_text).collect();
        assert_eq!(texts, vec!["Try:", "┌─ sh ", "│ echo hi", "└─"]);
    }

    #[test]
    fn test_render_shows_banner_when_offline() {
        let mut app = App::new(None, Model::Mistral);
        app.status = ConnectionStatus::failed(OllamaError::NotConfigured.to_string());
        let screen = draw(&mut app);
        assert!(screen.contains("Ollama API URL is not configured."));
        assert!(screen.contains("variables."), "banner tail cut off");
        assert!(screen.contains("Retry Connection"));
        assert!(screen.contains("Cannot connect to Ollama API..."));
        assert!(screen.contains("[mistral]"));
    }

    #[test]
    fn test_long_banners_wrap_fully() {
        let cases = [
            (SEND_FAILED.to_string(), "again."),
            (
                OllamaError::ModelUnavailable("codellama".to_string()).to_string(),
                "server.",
            ),
        ];
        for (detail, tail) in cases {
            let mut app = App::new(None, Model::Llama2);
            app.status = ConnectionStatus::failed(detail);
            let screen = draw(&mut app);
            assert!(screen.contains(tail), "missing {tail:?}");
        }
    }

    #[test]
    fn test_render_transcript() {
        let mut app = App::new(None, Model::Llama2);
        app.status = ConnectionStatus::ok();
        app.transcript.push_user("hello **there**");
        app.transcript.push_assistant("**hi**");
        let screen = draw(&mut app);
        assert!(screen.contains("You:"));
        assert!(screen.contains("hello there"));
        assert!(screen.contains("AI:"));
        assert!(!screen.contains("Error"));
    }

    #[test]
    fn test_earlier_replies_keep_neutral_label_after_model_change() {
        let mut app = App::new(None, Model::Llama2);
        app.status = ConnectionStatus::ok();
        app.transcript.push_user("hi");
        app.transcript.push_assistant("hello");
        app.model = Model::Mistral;
        let screen = draw(&mut app);
        assert!(screen.contains("AI:"));
        assert!(!screen.contains("mistral:"));
    }

    #[test]
    fn test_user_code_fences_are_boxed() {
        let mut app = App::new(None, Model::Llama2);
        app.transcript.push_user("fix this:\n```py\nprint(1)\n```");
        let screen = draw(&mut app);
        assert!(screen.contains("┌─ py"));
        assert!(screen.contains("│ print(1)"));
        assert!(!screen.contains("```"));
    }

    #[test]
    fn test_end_of_long_reply_reachable() {
        let mut app = App::new(None, Model::Llama2);
        app.status = ConnectionStatus::ok();
        let mut reply = String::new();
        for _ in 0..30 {
            reply.push_str(&"abcdefghi ".repeat(15));
            reply.push('\n');
        }
        reply.push_str("THE_END");
        app.transcript.push_assistant(reply);

        draw(&mut app);
        app.scroll_chat_to_bottom();
        let screen = draw(&mut app);
        assert!(screen.contains("THE_END"));

        // Scrolling further stays clamped with the last line in view
        for _ in 0..50 {
            app.scroll_down(1);
        }
        let screen = draw(&mut app);
        assert!(screen.contains("THE_END"));

        app.chat_scroll = 0;
        let screen = draw(&mut app);
        assert!(!screen.contains("THE_END"));
    }

    #[test]
    fn test_render_model_picker() {
        let mut app = App::new(None, Model::Llama2);
        app.open_model_picker();
        let screen = draw(&mut app);
        assert!(screen.contains("Select Model"));
        assert!(screen.contains("codellama"));
    }
}
