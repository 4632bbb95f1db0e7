use catchat_core::{tokenize, ChatMessage, ChatRole, Conversation, TextToken};
use chrono::Local;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, FocusPane, InputMode, SUGGESTIONS};

/// Ensure the selected item in a list is visible by adjusting the ListState offset.
fn ensure_selected_visible(state: &mut ListState, visible_height: usize) {
    let visible_height = visible_height.max(1);

    if let Some(selected) = state.selected() {
        let min_offset = selected.saturating_sub(visible_height - 1);
        let max_offset = selected;

        let new_offset = state.offset().clamp(min_offset, max_offset);
        if new_offset != state.offset() {
            *state.offset_mut() = new_offset;
        }
    }
}

/// Style links found by the tokenizer; everything else stays plain
fn linkify_line(text: &str) -> Line<'static> {
    let spans: Vec<Span<'static>> = tokenize(text)
        .into_iter()
        .map(|token| match token {
            TextToken::Text(t) => Span::raw(t.to_string()),
            TextToken::Link(url) => Span::styled(
                url.to_string(),
                Style::default()
                    .fg(Color::Blue)
                    .add_modifier(Modifier::UNDERLINED),
            ),
        })
        .collect();

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let [sidebar_area, chat_area] =
        Layout::horizontal([Constraint::Length(28), Constraint::Min(0)]).areas(body_area);

    render_sidebar(app, frame, sidebar_area);
    render_chat(app, frame, chat_area);
    render_footer(app, frame, footer_area);

    // Render popups (in order of priority)
    if app.confirm_delete.is_some() {
        render_delete_confirm(app, frame, area);
    } else if app.rename.is_some() {
        render_rename_input(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" CatGPT ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("[{}]", app.mode.display_name()),
            Style::default().fg(Color::Black),
        ),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Black),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match (app.input_mode, app.focus) {
        (InputMode::Editing, _) => " INSERT ",
        (InputMode::Normal, FocusPane::Sidebar) => " CHATS ",
        (InputMode::Normal, FocusPane::Transcript) => " TRANSCRIPT ",
        (InputMode::Normal, FocusPane::Input) => " NORMAL ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hint = |key: &'static str, label: &'static str| {
        [
            Span::styled(format!(" {} ", key), key_style),
            Span::styled(format!(" {} ", label), label_style),
        ]
    };

    let hints: Vec<[Span; 2]> = if app.confirm_delete.is_some() {
        vec![hint("y", "delete"), hint("n", "keep")]
    } else if app.rename.is_some() {
        vec![hint("Enter", "save"), hint("Esc", "cancel")]
    } else {
        match (app.input_mode, app.focus) {
            (InputMode::Editing, _) => {
                vec![hint("Enter", "send"), hint("Esc", "normal"), hint("Tab", "chats")]
            }
            (InputMode::Normal, FocusPane::Sidebar) => vec![
                hint("j/k", "nav"),
                hint("Enter", "open"),
                hint("r", "rename"),
                hint("d", "delete"),
                hint("n", "new"),
                hint("q", "quit"),
            ],
            (InputMode::Normal, FocusPane::Transcript) => vec![
                hint("j/k", "select"),
                hint("c", "copy"),
                hint("C", "copy last"),
                hint("R", "regenerate"),
                hint("1-4", "ask"),
                hint("q", "quit"),
            ],
            (InputMode::Normal, FocusPane::Input) => vec![
                hint("i", "type"),
                hint("Tab", "focus"),
                hint("n", "new"),
                hint("R", "regenerate"),
                hint("1-4", "ask"),
                hint("q", "quit"),
            ],
        }
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    spans.extend(hints.into_iter().flatten());

    if let Some(status) = &app.status {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            status.clone(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_sidebar(app: &mut App, frame: &mut Frame, area: Rect) {
    app.sidebar_area = Some(area);

    let snapshot = app.snapshot();
    if app
        .sidebar_state
        .selected()
        .map_or(true, |i| i >= snapshot.conversations.len())
    {
        app.sync_sidebar_to_active();
    }

    let focused = app.focus == FocusPane::Sidebar;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" Chats ({}) ", snapshot.conversations.len()));

    let items: Vec<ListItem> = snapshot
        .conversations
        .iter()
        .map(|conversation| {
            let is_active = conversation.id == snapshot.active;
            let title_style = if is_active {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            let mut first_line = vec![Span::styled(conversation.title.clone(), title_style)];
            if conversation.streaming {
                first_line.push(Span::styled(" …", Style::default().fg(Color::Yellow)));
            }

            let updated = conversation
                .updated_at
                .with_timezone(&Local)
                .format("%b %-d %H:%M")
                .to_string();

            ListItem::new(vec![
                Line::from(first_line),
                Line::from(Span::styled(updated, Style::default().fg(Color::DarkGray))),
            ])
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

    // Two lines per conversation
    let visible_height = (area.height.saturating_sub(2) / 2) as usize;
    ensure_selected_visible(&mut app.sidebar_state, visible_height);

    frame.render_stateful_widget(list, area, &mut app.sidebar_state);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [transcript_area, suggestions_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(3),
    ])
    .areas(area);

    render_transcript(app, frame, transcript_area);
    render_suggestions(app, frame, suggestions_area);
    render_input(app, frame, input_area);
}

fn role_header(message: &ChatMessage, selected: bool) -> Line<'static> {
    let (label, color) = match message.role {
        ChatRole::User => ("You", Color::Cyan),
        ChatRole::Assistant => ("CatGPT", Color::Yellow),
    };

    let mut label_style = Style::default().fg(color).add_modifier(Modifier::BOLD);
    if selected {
        label_style = label_style.add_modifier(Modifier::REVERSED);
    }

    Line::from(vec![
        Span::styled(label, label_style),
        Span::styled(
            format!("  {}", message.time.with_timezone(&Local).format("%H:%M")),
            Style::default().fg(Color::DarkGray),
        ),
    ])
}

fn transcript_text(conversation: &Conversation, selected: Option<usize>, frame_idx: u8) -> Text<'static> {
    let mut lines: Vec<Line> = Vec::new();
    let last_idx = conversation.messages.len().saturating_sub(1);

    for (idx, message) in conversation.messages.iter().enumerate() {
        lines.push(role_header(message, selected == Some(idx)));

        let in_progress = conversation.streaming && idx == last_idx;
        if message.content.is_empty() {
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((frame_idx as usize) + 1);
            let placeholder = if in_progress { format!("Thinking{}", dots) } else { String::new() };
            lines.push(Line::from(Span::styled(
                placeholder,
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        let content_lines: Vec<&str> = message.content.lines().collect();
        for (line_idx, line) in content_lines.iter().enumerate() {
            let mut rendered = linkify_line(line);
            if in_progress && line_idx + 1 == content_lines.len() {
                rendered.push_span(Span::styled("▍", Style::default().fg(Color::Yellow)));
            }
            lines.push(rendered);
        }

        lines.push(Line::default());
    }

    Text::from(lines)
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    app.transcript_area = Some(area);

    // Store inner dimensions for scroll calculations (minus borders)
    app.transcript_height = area.height.saturating_sub(2);
    app.transcript_width = area.width.saturating_sub(2);

    if app.follow_tail {
        app.scroll_to_bottom();
    }

    let snapshot = app.snapshot();
    let conversation = snapshot.active();

    let focused = app.focus == FocusPane::Transcript;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let mut title = format!(" {} ", conversation.title);
    if conversation.streaming {
        title.push_str("(replying) ");
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let transcript = Paragraph::new(transcript_text(
        conversation,
        app.selected_message,
        app.animation_frame,
    ))
    .block(block)
    .wrap(Wrap { trim: false })
    .scroll((app.transcript_scroll, 0));

    frame.render_widget(transcript, area);
}

fn render_suggestions(app: &App, frame: &mut Frame, area: Rect) {
    let disabled = app.active_streaming();
    let chip_style = if disabled {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Magenta)
    };

    let mut spans = Vec::with_capacity(SUGGESTIONS.len() * 2);
    for (i, suggestion) in SUGGESTIONS.iter().enumerate() {
        spans.push(Span::styled(
            format!(" {} ", i + 1),
            Style::default().bg(Color::DarkGray).fg(Color::White),
        ));
        spans.push(Span::styled(format!(" {}  ", suggestion), chip_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let streaming = app.active_streaming();
    let editing = app.input_mode == InputMode::Editing;

    let border_color = if streaming {
        Color::DarkGray
    } else if editing || app.focus == FocusPane::Input {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let title = if streaming {
        " Waiting for reply... "
    } else {
        " Message (Enter to send) "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_col) = app.input.visible_window(inner_width);

    let placeholder = app.input.text.is_empty() && !editing;
    let input = if placeholder {
        Paragraph::new("Ask about classes, clubs, scholarships...")
            .style(Style::default().fg(Color::DarkGray))
    } else {
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan))
    }
    .block(block);

    frame.render_widget(input, area);

    // Show cursor when editing
    if editing && app.rename.is_none() && app.confirm_delete.is_none() {
        frame.set_cursor_position((area.x + cursor_col as u16 + 1, area.y + 1));
    }
}

fn centered_popup(area: Rect, width: u16, height: u16) -> Rect {
    let popup_width = width.min(area.width.saturating_sub(4));
    let popup_height = height.min(area.height.saturating_sub(2));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    Rect::new(popup_x, popup_y, popup_width, popup_height)
}

fn render_rename_input(app: &App, frame: &mut Frame, area: Rect) {
    let Some(rename) = &app.rename else {
        return;
    };

    let popup_area = centered_popup(area, 50, 5);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Rename chat ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let instructions = Paragraph::new("Enter to save, Esc to cancel")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    let (visible_text, cursor_col) = rename.input.visible_window(input_area.width as usize);
    frame.render_widget(
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan)),
        input_area,
    );
    frame.set_cursor_position((input_area.x + cursor_col as u16, input_area.y));
}

fn render_delete_confirm(app: &App, frame: &mut Frame, area: Rect) {
    let Some(id) = app.confirm_delete else {
        return;
    };
    let title = app
        .store()
        .conversation(id)
        .map(|c| c.title.clone())
        .unwrap_or_default();

    let popup_area = centered_popup(area, 44, 5);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Delete chat? ");

    let text = Text::from(vec![
        Line::from(Span::styled(title, Style::default().bold())),
        Line::default(),
        Line::from(vec![
            Span::styled(" y ", Style::default().bg(Color::Red).fg(Color::White)),
            Span::raw(" delete   "),
            Span::styled(" n ", Style::default().bg(Color::DarkGray).fg(Color::White)),
            Span::raw(" keep"),
        ]),
    ]);

    frame.render_widget(Paragraph::new(text).block(block), popup_area);
}
