use catchat_core::{Delivery, Rejected};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, FocusPane, InputMode, SUGGESTIONS};
use crate::clipboard::copy_to_clipboard;
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick(),
        AppEvent::Delivered(conversation, completion) => app.on_delivered(conversation, completion),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Popups take all input while open
    if app.confirm_delete.is_some() {
        handle_delete_confirm(app, key);
        return;
    }
    if app.rename.is_some() {
        handle_rename_input(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        // Quit
        KeyCode::Char('q') => app.should_quit = true,

        // Tab cycles focus: Sidebar -> Transcript -> Input
        KeyCode::Tab => match app.focus {
            FocusPane::Sidebar => app.focus = FocusPane::Transcript,
            FocusPane::Transcript | FocusPane::Input => focus_input(app),
        },
        KeyCode::Char('i') => focus_input(app),

        // Conversation actions
        KeyCode::Char('n') => app.new_conversation(),
        KeyCode::Char('R') => {
            let prepared = guard_streaming(app).and_then(|_| app.pipeline.regenerate());
            start_delivery(app, prepared);
        }
        KeyCode::Char('C') => {
            let text = app.last_message_content();
            copy_text(app, text);
        }
        KeyCode::Char(c @ '1'..='4') => {
            let idx = c as usize - '1' as usize;
            send_suggestion(app, idx);
        }

        _ => match app.focus {
            FocusPane::Sidebar => handle_sidebar_key(app, key),
            FocusPane::Transcript => handle_transcript_key(app, key),
            FocusPane::Input => {
                if key.code == KeyCode::Enter {
                    focus_input(app);
                }
            }
        },
    }
}

fn handle_sidebar_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.sidebar_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.sidebar_nav_up(),
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => {
            app.select_highlighted();
            app.focus = FocusPane::Transcript;
        }
        KeyCode::Char('r') => app.begin_rename(),
        KeyCode::Char('d') => app.begin_delete(),
        KeyCode::Esc => app.sync_sidebar_to_active(),
        _ => {}
    }
}

fn handle_transcript_key(app: &mut App, key: KeyEvent) {
    match key.code {
        // Half-page scroll
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_down();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_up();
        }

        KeyCode::Char('j') | KeyCode::Down => app.select_next_message(),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev_message(),
        KeyCode::Char('g') => {
            app.follow_tail = false;
            app.transcript_scroll = 0;
        }
        KeyCode::Char('G') => {
            app.selected_message = None;
            app.follow_tail = true;
            app.scroll_to_bottom();
        }
        KeyCode::Char('c') => {
            let text = app.selected_message_content();
            copy_text(app, text);
        }
        KeyCode::Char('h') | KeyCode::Left | KeyCode::Esc => {
            app.selected_message = None;
            app.focus = FocusPane::Sidebar;
        }
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Tab => {
            app.input_mode = InputMode::Normal;
            app.focus = FocusPane::Sidebar;
        }
        KeyCode::Enter => send_input(app),
        KeyCode::Backspace => app.input.backspace(),
        KeyCode::Delete => app.input.delete(),
        KeyCode::Left => app.input.left(),
        KeyCode::Right => app.input.right(),
        KeyCode::Home => app.input.home(),
        KeyCode::End => app.input.end(),
        KeyCode::Char(c) => app.input.insert(c),
        _ => {}
    }
}

fn handle_rename_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.rename = None;
            return;
        }
        KeyCode::Enter => {
            app.commit_rename();
            return;
        }
        _ => {}
    }

    let Some(rename) = app.rename.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Backspace => rename.input.backspace(),
        KeyCode::Delete => rename.input.delete(),
        KeyCode::Left => rename.input.left(),
        KeyCode::Right => rename.input.right(),
        KeyCode::Home => rename.input.home(),
        KeyCode::End => rename.input.end(),
        KeyCode::Char(c) => rename.input.insert(c),
        _ => {}
    }
}

fn handle_delete_confirm(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Enter => app.confirm_delete_conversation(),
        KeyCode::Char('n') | KeyCode::Esc => app.confirm_delete = None,
        _ => {}
    }
}

fn focus_input(app: &mut App) {
    app.focus = FocusPane::Input;
    app.input_mode = InputMode::Editing;
}

/// Sending is disabled while the active conversation is receiving a reply
fn guard_streaming(app: &App) -> Result<(), Rejected> {
    if app.active_streaming() {
        Err(Rejected::Busy)
    } else {
        Ok(())
    }
}

fn send_input(app: &mut App) {
    let prepared = match guard_streaming(app) {
        Ok(()) => app.pipeline.prepare(&mut app.input.text),
        Err(rejected) => Err(rejected),
    };
    app.input.clamp_cursor();
    start_delivery(app, prepared);
}

fn send_suggestion(app: &mut App, idx: usize) {
    let Some(suggestion) = SUGGESTIONS.get(idx) else {
        return;
    };
    let mut text = suggestion.to_string();
    let prepared = guard_streaming(app).and_then(|_| app.pipeline.prepare(&mut text));
    if prepared.is_ok() {
        app.input.text.clear();
        app.input.clamp_cursor();
    }
    start_delivery(app, prepared);
}

/// Run a prepared delivery in the background and report back through the
/// event loop when it finishes
fn start_delivery(app: &mut App, prepared: Result<Delivery, Rejected>) {
    match prepared {
        Ok(delivery) => {
            app.selected_message = None;
            app.follow_tail = true;

            let events = app.events.clone();
            let conversation = delivery.conversation_id();
            tokio::spawn(async move {
                let completion = delivery.run().await;
                let _ = events.send(AppEvent::Delivered(conversation, completion));
            });
        }
        Err(Rejected::Empty) => {}
        Err(Rejected::Blocked) => {
            app.follow_tail = true;
            app.set_status("Message blocked");
        }
        Err(Rejected::Busy) => app.set_status("Wait for the current reply to finish"),
        Err(Rejected::Unavailable) => app.set_status("That chat no longer exists"),
    }
}

fn copy_text(app: &mut App, text: Option<String>) {
    let Some(text) = text else {
        app.set_status("Select a message to copy (j/k in the transcript)");
        return;
    };
    match copy_to_clipboard(&text) {
        Ok(_) => app.set_status("Copied to clipboard"),
        Err(err) => {
            tracing::warn!(error = %err, "clipboard unavailable");
            app.set_status(format!("Copy failed: {}", err));
        }
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    // Determine which area the mouse is in (position-based scrolling)
    let in_sidebar = app.sidebar_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_transcript = app.transcript_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_sidebar {
                app.sidebar_nav_down();
            } else if in_transcript {
                for _ in 0..3 {
                    app.scroll_down();
                }
            }
        }
        MouseEventKind::ScrollUp => {
            if in_sidebar {
                app.sidebar_nav_up();
            } else if in_transcript {
                for _ in 0..3 {
                    app.scroll_up();
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use catchat_core::{
        ContentGate, ConversationStore, DeliveryMode, DeliveryPipeline, SimulatedResponder,
    };
    use tokio::sync::mpsc;

    fn test_app() -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let pipeline = DeliveryPipeline::new(
            Arc::new(ConversationStore::new()),
            ContentGate::default(),
            Arc::new(SimulatedResponder::new("Sure.", Duration::ZERO)),
        );
        let (tx, rx) = mpsc::unbounded_channel();
        (App::new(pipeline, DeliveryMode::Simulated, tx), rx)
    }

    fn press(app: &mut App, code: KeyCode) {
        handle_event(app, AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[tokio::test]
    async fn given_typed_message_when_enter_then_reply_is_delivered() {
        let (mut app, mut rx) = test_app();
        type_text(&mut app, "Internship tips");

        press(&mut app, KeyCode::Enter);

        assert!(app.input.text.is_empty());
        assert_eq!(app.input.cursor, 0);
        match rx.recv().await {
            Some(AppEvent::Delivered(id, completion)) => {
                assert_eq!(id, app.store().active_id());
                assert!(matches!(completion, catchat_core::Completion::Complete));
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(app.last_message_content().as_deref(), Some("Sure."));
    }

    #[tokio::test]
    async fn given_streaming_reply_when_enter_then_input_is_kept() {
        let (mut app, _rx) = test_app();
        let id = app.store().active_id();
        assert!(app.store().try_begin_streaming(id).unwrap());
        type_text(&mut app, "second");

        press(&mut app, KeyCode::Enter);

        assert_eq!(app.input.text, "second");
        assert_eq!(app.status.as_deref(), Some("Wait for the current reply to finish"));
        assert_eq!(app.snapshot().active().messages.len(), 1);
    }

    #[tokio::test]
    async fn given_blocked_message_when_enter_then_status_reports_block() {
        let (mut app, _rx) = test_app();
        type_text(&mut app, "what the crap");

        press(&mut app, KeyCode::Enter);

        assert_eq!(app.status.as_deref(), Some("Message blocked"));
        assert_eq!(app.input.text, "what the crap");
        assert_eq!(app.snapshot().active().messages.len(), 2);
    }

    #[tokio::test]
    async fn given_normal_mode_when_suggestion_key_then_suggestion_is_sent() {
        let (mut app, mut rx) = test_app();
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.input_mode, InputMode::Normal);

        press(&mut app, KeyCode::Char('2'));

        assert!(matches!(rx.recv().await, Some(AppEvent::Delivered(..))));
        let snapshot = app.snapshot();
        assert_eq!(snapshot.active().messages[1].content, SUGGESTIONS[1]);
    }

    #[tokio::test]
    async fn given_draft_in_input_when_suggestion_sent_then_draft_is_cleared() {
        let (mut app, mut rx) = test_app();
        type_text(&mut app, "half-typed question");
        press(&mut app, KeyCode::Esc);

        press(&mut app, KeyCode::Char('4'));

        assert!(app.input.text.is_empty());
        assert_eq!(app.input.cursor, 0);
        assert!(matches!(rx.recv().await, Some(AppEvent::Delivered(..))));
        assert_eq!(app.snapshot().active().messages[1].content, SUGGESTIONS[3]);
    }

    #[tokio::test]
    async fn given_sidebar_focus_when_delete_confirmed_then_chat_is_removed() {
        let (mut app, _rx) = test_app();
        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('n'));
        press(&mut app, KeyCode::Esc);
        app.focus = FocusPane::Sidebar;
        let doomed = app.store().active_id();

        press(&mut app, KeyCode::Char('d'));
        assert_eq!(app.confirm_delete, Some(doomed));
        press(&mut app, KeyCode::Char('y'));

        assert!(app.store().conversation(doomed).is_none());
        assert_eq!(app.snapshot().conversations.len(), 1);
    }

    #[tokio::test]
    async fn given_rename_popup_when_typing_then_title_changes() {
        let (mut app, _rx) = test_app();
        press(&mut app, KeyCode::Esc);
        app.focus = FocusPane::Sidebar;

        press(&mut app, KeyCode::Char('r'));
        for _ in 0.."Welcome".len() {
            press(&mut app, KeyCode::Backspace);
        }
        type_text(&mut app, "Clubs");
        press(&mut app, KeyCode::Enter);

        assert!(app.rename.is_none());
        assert_eq!(app.snapshot().active().title, "Clubs");
    }

    #[test]
    fn ctrl_c_quits_from_any_mode() {
        let pipeline = DeliveryPipeline::new(
            Arc::new(ConversationStore::new()),
            ContentGate::default(),
            Arc::new(SimulatedResponder::default()),
        );
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(pipeline, DeliveryMode::Simulated, tx);

        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        );

        assert!(app.should_quit);
    }
}
