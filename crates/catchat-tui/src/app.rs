use std::sync::Arc;

use catchat_core::{
    Completion, Conversation, ConversationId, ConversationStore, DeliveryMode, DeliveryPipeline,
    StoreSnapshot,
};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::sync::mpsc;

use crate::tui::AppEvent;

/// Quick prompts shown under the transcript, bound to keys 1-4
pub const SUGGESTIONS: [&str; 4] = [
    "What scholarships are open now?",
    "Show SE clubs.",
    "How to meet an advisor?",
    "Internship tips",
];

/// Ticks a status message stays visible (50ms per tick)
const STATUS_TICKS: u16 = 80;

/// Ticks per animation frame of the streaming indicator
const TICKS_PER_FRAME: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Sidebar,
    Transcript,
    Input,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Single-line text field with a character cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    pub text: String,
    pub cursor: usize,
}

impl TextInput {
    pub fn with_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let cursor = text.chars().count();
        Self { text, cursor }
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.char_count() {
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.char_count();
    }

    /// Keep the cursor inside the text after it was changed from outside
    pub fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.char_count());
    }

    /// The slice that fits in `width` columns with the cursor visible, and
    /// the cursor column inside it
    pub fn visible_window(&self, width: usize) -> (String, usize) {
        let scroll_offset = if width == 0 || self.cursor < width {
            0
        } else {
            self.cursor - width + 1
        };
        let visible = self.text.chars().skip(scroll_offset).take(width).collect();
        (visible, self.cursor - scroll_offset)
    }
}

/// Title being edited in the rename popup
#[derive(Debug, Clone)]
pub struct RenameState {
    pub target: ConversationId,
    pub input: TextInput,
}

/// Where each message starts in the wrapped transcript, plus the total height
pub fn transcript_layout(conversation: &Conversation, width: u16) -> (Vec<u16>, u16) {
    // Fall back to a sane width before the first render has measured the pane
    let wrap_width = if width > 0 { width as usize } else { 50 };

    let mut starts = Vec::with_capacity(conversation.messages.len());
    let mut total_lines: u16 = 0;

    for msg in &conversation.messages {
        starts.push(total_lines);
        total_lines = total_lines.saturating_add(1); // Role line
        if msg.content.is_empty() {
            total_lines = total_lines.saturating_add(1); // Typing indicator
        }
        for line in msg.content.lines() {
            let char_count = line.chars().count();
            let wrapped = if char_count == 0 {
                1
            } else {
                char_count.div_ceil(wrap_width)
            };
            total_lines = total_lines.saturating_add(wrapped as u16);
        }
        total_lines = total_lines.saturating_add(1); // Blank line after message
    }

    (starts, total_lines)
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,
    pub mode: DeliveryMode,
    pub pipeline: DeliveryPipeline,
    pub events: mpsc::UnboundedSender<AppEvent>,

    // Sidebar
    pub sidebar_state: ListState,

    // Transcript
    pub selected_message: Option<usize>,
    pub transcript_scroll: u16,
    pub transcript_height: u16,
    pub transcript_width: u16,
    pub follow_tail: bool,

    // Composer
    pub input: TextInput,

    // Popups
    pub rename: Option<RenameState>,
    pub confirm_delete: Option<ConversationId>,

    // Footer status line
    pub status: Option<String>,
    status_ttl: u16,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
    tick_count: u32,

    // Panel areas for mouse hit-testing (updated during render)
    pub sidebar_area: Option<Rect>,
    pub transcript_area: Option<Rect>,
}

impl App {
    pub fn new(
        pipeline: DeliveryPipeline,
        mode: DeliveryMode,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        let mut sidebar_state = ListState::default();
        sidebar_state.select(Some(0));

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Input,
            mode,
            pipeline,
            events,
            sidebar_state,
            selected_message: None,
            transcript_scroll: 0,
            transcript_height: 0,
            transcript_width: 0,
            follow_tail: true,
            input: TextInput::default(),
            rename: None,
            confirm_delete: None,
            status: None,
            status_ttl: 0,
            animation_frame: 0,
            tick_count: 0,
            sidebar_area: None,
            transcript_area: None,
        }
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        self.pipeline.store()
    }

    pub fn snapshot(&self) -> Arc<StoreSnapshot> {
        self.store().snapshot()
    }

    pub fn active_streaming(&self) -> bool {
        self.snapshot().active().streaming
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
        self.status_ttl = STATUS_TICKS;
    }

    /// Tick animation frame and expire the status line (called by Tick event)
    pub fn tick(&mut self) {
        self.tick_count = self.tick_count.wrapping_add(1);
        if self.tick_count % TICKS_PER_FRAME == 0 {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }

        if self.status_ttl > 0 {
            self.status_ttl -= 1;
            if self.status_ttl == 0 {
                self.status = None;
            }
        }
    }

    /// A background delivery finished
    pub fn on_delivered(&mut self, conversation: ConversationId, completion: Completion) {
        match completion {
            Completion::Complete => {}
            Completion::Failed(err) => {
                tracing::debug!(%conversation, error = %err, "delivery failed");
                self.set_status(format!("Reply failed: {}", err));
            }
            Completion::Abandoned => {
                tracing::debug!(%conversation, "delivery abandoned");
            }
        }
    }

    // Sidebar

    /// The conversation under the sidebar cursor
    pub fn highlighted_conversation(&self) -> Option<ConversationId> {
        let snapshot = self.snapshot();
        self.sidebar_state
            .selected()
            .and_then(|i| snapshot.conversations.get(i))
            .map(|c| c.id)
    }

    pub fn sync_sidebar_to_active(&mut self) {
        let snapshot = self.snapshot();
        self.sidebar_state
            .select(snapshot.position(snapshot.active).or(Some(0)));
    }

    pub fn sidebar_nav_down(&mut self) {
        let len = self.snapshot().conversations.len();
        if len > 0 {
            let i = self.sidebar_state.selected().unwrap_or(0);
            self.sidebar_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn sidebar_nav_up(&mut self) {
        let i = self.sidebar_state.selected().unwrap_or(0);
        self.sidebar_state.select(Some(i.saturating_sub(1)));
    }

    pub fn select_highlighted(&mut self) {
        if let Some(id) = self.highlighted_conversation() {
            match self.store().select_conversation(id) {
                Ok(()) => self.reset_transcript_view(),
                Err(err) => self.set_status(err.to_string()),
            }
        }
    }

    pub fn new_conversation(&mut self) {
        self.store().create_conversation();
        self.sync_sidebar_to_active();
        self.reset_transcript_view();
        self.focus = FocusPane::Input;
        self.input_mode = InputMode::Editing;
    }

    pub fn begin_rename(&mut self) {
        let Some(target) = self.highlighted_conversation() else {
            return;
        };
        let title = self
            .store()
            .conversation(target)
            .map(|c| c.title.clone())
            .unwrap_or_default();
        self.rename = Some(RenameState {
            target,
            input: TextInput::with_text(title),
        });
    }

    pub fn commit_rename(&mut self) {
        if let Some(rename) = self.rename.take() {
            if let Err(err) = self
                .store()
                .rename_conversation(rename.target, &rename.input.text)
            {
                self.set_status(err.to_string());
            }
        }
    }

    pub fn begin_delete(&mut self) {
        self.confirm_delete = self.highlighted_conversation();
    }

    pub fn confirm_delete_conversation(&mut self) {
        if let Some(id) = self.confirm_delete.take() {
            match self.store().delete_conversation(id) {
                Ok(()) => {
                    self.sync_sidebar_to_active();
                    self.reset_transcript_view();
                    self.set_status("Chat deleted");
                }
                Err(err) => self.set_status(err.to_string()),
            }
        }
    }

    // Transcript

    pub fn reset_transcript_view(&mut self) {
        self.selected_message = None;
        self.transcript_scroll = 0;
        self.follow_tail = true;
    }

    pub fn select_next_message(&mut self) {
        let len = self.snapshot().active().messages.len();
        if len == 0 {
            return;
        }
        let next = match self.selected_message {
            Some(i) => (i + 1).min(len - 1),
            None => len - 1,
        };
        self.selected_message = Some(next);
        self.scroll_to_selected_message();
    }

    pub fn select_prev_message(&mut self) {
        let len = self.snapshot().active().messages.len();
        if len == 0 {
            return;
        }
        let prev = match self.selected_message {
            Some(i) => i.saturating_sub(1),
            None => len - 1,
        };
        self.selected_message = Some(prev);
        self.scroll_to_selected_message();
    }

    /// Content of the highlighted transcript message, read through the store
    pub fn selected_message_content(&self) -> Option<String> {
        let snapshot = self.snapshot();
        let conversation = snapshot.active();
        let message = conversation.messages.get(self.selected_message?)?;
        self.store().message_content(conversation.id, message.id)
    }

    pub fn last_message_content(&self) -> Option<String> {
        self.store().last_message_content(self.store().active_id())
    }

    pub fn scroll_down(&mut self) {
        self.transcript_scroll = self.transcript_scroll.saturating_add(1);
        self.clamp_scroll();
    }

    pub fn scroll_up(&mut self) {
        self.follow_tail = false;
        self.transcript_scroll = self.transcript_scroll.saturating_sub(1);
    }

    pub fn scroll_half_page_down(&mut self) {
        let half = (self.transcript_height / 2).max(1);
        self.transcript_scroll = self.transcript_scroll.saturating_add(half);
        self.clamp_scroll();
    }

    pub fn scroll_half_page_up(&mut self) {
        self.follow_tail = false;
        let half = (self.transcript_height / 2).max(1);
        self.transcript_scroll = self.transcript_scroll.saturating_sub(half);
    }

    /// Scroll transcript to bottom so the newest reply is visible
    pub fn scroll_to_bottom(&mut self) {
        self.transcript_scroll = self.max_scroll();
    }

    fn max_scroll(&self) -> u16 {
        let snapshot = self.snapshot();
        let (_, total_lines) = transcript_layout(snapshot.active(), self.transcript_width);
        let visible_height = if self.transcript_height > 0 {
            self.transcript_height
        } else {
            20
        };
        total_lines.saturating_sub(visible_height)
    }

    fn clamp_scroll(&mut self) {
        let max = self.max_scroll();
        if self.transcript_scroll >= max {
            self.transcript_scroll = max;
            self.follow_tail = true;
        }
    }

    fn scroll_to_selected_message(&mut self) {
        let Some(idx) = self.selected_message else {
            return;
        };
        let snapshot = self.snapshot();
        let (starts, total_lines) = transcript_layout(snapshot.active(), self.transcript_width);
        let start = starts.get(idx).copied().unwrap_or(0);
        let end = starts.get(idx + 1).copied().unwrap_or(total_lines);

        self.follow_tail = false;
        if start < self.transcript_scroll {
            self.transcript_scroll = start;
        } else if end > self.transcript_scroll + self.transcript_height {
            self.transcript_scroll = end.saturating_sub(self.transcript_height);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catchat_core::{ChatMessage, ContentGate, SimulatedResponder};
    use std::time::Duration;

    fn test_app() -> App {
        let pipeline = DeliveryPipeline::new(
            Arc::new(ConversationStore::new()),
            ContentGate::default(),
            Arc::new(SimulatedResponder::with_delay(Duration::ZERO)),
        );
        let (tx, _rx) = mpsc::unbounded_channel();
        App::new(pipeline, DeliveryMode::Simulated, tx)
    }

    #[test]
    fn text_input_edits_multibyte_text_by_character() {
        let mut input = TextInput::default();
        for c in "héllo".chars() {
            input.insert(c);
        }
        input.left();
        input.left();
        input.backspace();
        assert_eq!(input.text, "hélo");
        assert_eq!(input.cursor, 2);

        input.home();
        input.delete();
        assert_eq!(input.text, "élo");

        input.end();
        input.right();
        assert_eq!(input.cursor, 3);
    }

    #[test]
    fn visible_window_keeps_cursor_in_view() {
        let input = TextInput::with_text("abcdefghij");
        let (visible, column) = input.visible_window(4);
        assert_eq!(visible, "hij");
        assert_eq!(column, 3);

        let short = TextInput::with_text("ab");
        assert_eq!(short.visible_window(4), ("ab".to_string(), 2));
    }

    #[test]
    fn new_conversation_moves_sidebar_to_top() {
        let mut app = test_app();
        app.sidebar_nav_down();

        app.new_conversation();

        assert_eq!(app.snapshot().conversations.len(), 2);
        assert_eq!(app.sidebar_state.selected(), Some(0));
        assert_eq!(app.highlighted_conversation(), Some(app.store().active_id()));
    }

    #[test]
    fn select_highlighted_switches_active_conversation() {
        let mut app = test_app();
        let welcome = app.store().active_id();
        app.new_conversation();

        app.sidebar_nav_down();
        app.select_highlighted();

        assert_eq!(app.store().active_id(), welcome);
    }

    #[test]
    fn rename_popup_renames_target() {
        let mut app = test_app();
        app.begin_rename();
        let rename = app.rename.as_mut().unwrap();
        assert_eq!(rename.input.text, "Welcome");

        rename.input.text = "  Advising  ".to_string();
        app.commit_rename();

        assert!(app.rename.is_none());
        assert_eq!(app.snapshot().active().title, "Advising");
    }

    #[test]
    fn confirmed_delete_of_last_chat_leaves_a_fresh_one() {
        let mut app = test_app();
        let only = app.store().active_id();

        app.begin_delete();
        assert_eq!(app.confirm_delete, Some(only));
        app.confirm_delete_conversation();

        let snapshot = app.snapshot();
        assert_eq!(snapshot.conversations.len(), 1);
        assert_ne!(snapshot.active, only);
        assert_eq!(app.sidebar_state.selected(), Some(0));
    }

    #[test]
    fn copy_targets_selected_and_last_message() {
        let mut app = test_app();
        let id = app.store().active_id();
        app.store()
            .append_message(id, ChatMessage::user("Internship tips"))
            .unwrap();

        assert_eq!(app.selected_message_content(), None);
        app.select_prev_message();
        app.select_prev_message();
        assert_eq!(app.selected_message, Some(0));
        assert!(app.selected_message_content().unwrap().contains("CatGPT"));
        assert_eq!(app.last_message_content().as_deref(), Some("Internship tips"));
    }

    #[test]
    fn status_expires_after_ticks() {
        let mut app = test_app();
        app.set_status("Copied");
        for _ in 0..STATUS_TICKS {
            assert!(app.status.is_some());
            app.tick();
        }
        assert!(app.status.is_none());
    }

    #[test]
    fn transcript_layout_counts_wrapped_lines() {
        let mut conversation = Conversation::new("t", "0123456789");
        conversation.messages.push(ChatMessage::assistant(""));

        let (starts, total) = transcript_layout(&conversation, 4);

        // 1 role + 3 wrapped + 1 blank, then 1 role + 1 indicator + 1 blank
        assert_eq!(starts, vec![0, 5]);
        assert_eq!(total, 8);
    }
}
