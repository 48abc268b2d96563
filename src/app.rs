use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;
use crate::chat::{ChatClient, ChatMessage, ChatRole, StudyContext};
use crate::config::Config;
use crate::prefs::LearningStyle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Chat,
    Input,
    Content,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Preferences (resolved; always satisfy the membership invariant)
    pub learning_style: LearningStyle,
    pub enhancement_type: String,

    // Page content: the snapshot fetched at open never changes, the edited
    // copy is the user's to mangle and reset
    pub page_content: String,
    pub edited_content: String,
    pub show_content_controls: bool,
    pub content_cursor: usize, // char index into edited_content
    pub content_scroll: u16,
    pub content_height: u16,

    // Conversation
    pub conversation: Vec<ChatMessage>,
    pub pending_replies: Vec<JoinHandle<String>>,
    pub chat_scroll: u16,
    pub chat_height: u16, // chat area inner size for scroll calculations
    pub chat_width: u16,
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Message input
    pub input: String,
    pub input_cursor: usize, // cursor position in input, in chars

    // Picker popups (the two select-equivalents)
    pub show_style_picker: bool,
    pub style_picker_state: ListState,
    pub show_enhancement_picker: bool,
    pub enhancement_picker_state: ListState,

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub content_area: Option<Rect>,

    // Chat service
    pub chat: ChatClient,
    pub api_key_missing: bool,
}

impl App {
    pub fn new(
        learning_style: LearningStyle,
        enhancement_type: String,
        page_content: String,
        chat: ChatClient,
    ) -> Self {
        Self {
            should_quit: false,
            // The panel opens ready to type a question
            input_mode: InputMode::Editing,
            focus: FocusPane::Input,

            learning_style,
            enhancement_type,

            edited_content: page_content.clone(),
            page_content,
            show_content_controls: false,
            content_cursor: 0,
            content_scroll: 0,
            content_height: 0,

            conversation: Vec::new(),
            pending_replies: Vec::new(),
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,

            input: String::new(),
            input_cursor: 0,

            show_style_picker: false,
            style_picker_state: ListState::default(),
            show_enhancement_picker: false,
            enhancement_picker_state: ListState::default(),

            chat_area: None,
            content_area: None,

            chat,
            api_key_missing: false,
        }
    }

    pub fn reply_pending(&self) -> bool {
        !self.pending_replies.is_empty()
    }

    // --- Preference transitions ---

    /// Change the learning style. The enhancement type always resets to the
    /// new style's first option, and both keys are persisted.
    pub fn set_learning_style(&mut self, style: LearningStyle) {
        self.apply_learning_style(style);
        let _ = Config::save_preferences(self.learning_style.as_str(), &self.enhancement_type);
    }

    fn apply_learning_style(&mut self, style: LearningStyle) {
        self.learning_style = style;
        self.enhancement_type = style.default_enhancement().to_string();
    }

    pub fn set_enhancement_type(&mut self, enhancement: String) {
        self.enhancement_type = enhancement;
        let _ = Config::save_preferences(self.learning_style.as_str(), &self.enhancement_type);
    }

    // --- Content transitions ---

    /// Purely a rendering toggle; the content itself is untouched.
    pub fn toggle_content_controls(&mut self) {
        self.show_content_controls = !self.show_content_controls;
        if !self.show_content_controls && self.focus == FocusPane::Content {
            self.focus = FocusPane::Chat;
        }
    }

    /// Restore the editable copy to the snapshot fetched at open.
    pub fn reset_content(&mut self) {
        self.edited_content = self.page_content.clone();
        self.content_cursor = 0;
        self.content_scroll = 0;
    }

    // --- Conversation transitions ---

    /// Validate and stage the pending input. Returns the captured message
    /// together with the history as it stood *before* this turn's append
    /// (that history is what the chat call must see), or None when the
    /// input is empty or whitespace.
    pub fn submit_message(&mut self) -> Option<(String, Vec<ChatMessage>)> {
        if self.input.trim().is_empty() {
            return None;
        }

        let message = std::mem::take(&mut self.input);
        self.input_cursor = 0;

        let history = self.conversation.clone();

        // Rapid double-submission of the same text would otherwise render
        // the turn twice
        let already_sent = self
            .conversation
            .iter()
            .any(|turn| turn.role == ChatRole::User && turn.content == message);
        if !already_sent {
            self.conversation.push(ChatMessage {
                role: ChatRole::User,
                content: message.clone(),
            });
        }

        self.scroll_chat_to_bottom();
        Some((message, history))
    }

    pub fn push_assistant_reply(&mut self, reply: String) {
        self.conversation.push(ChatMessage {
            role: ChatRole::Assistant,
            content: reply,
        });
        self.scroll_chat_to_bottom();
    }

    /// Collect finished chat calls. Replies land in whatever order they
    /// complete; sends are deliberately not serialized behind each other,
    /// and a reply is appended even if the panel state moved on meanwhile.
    pub async fn harvest_replies(&mut self) {
        let mut i = 0;
        while i < self.pending_replies.len() {
            if self.pending_replies[i].is_finished() {
                let handle = self.pending_replies.swap_remove(i);
                match handle.await {
                    Ok(reply) => self.push_assistant_reply(reply),
                    Err(e) => log::error!("chat task failed: {}", e),
                }
            } else {
                i += 1;
            }
        }
    }

    /// Snapshot of the preferences and page material for an outgoing call.
    /// Only a session's first turn bakes this into the message list.
    pub fn study_context(&self) -> StudyContext {
        StudyContext {
            learning_style: self.learning_style,
            enhancement_type: self.enhancement_type.clone(),
            material: self.page_content.clone(),
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.reply_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // --- Chat scrolling ---

    pub fn chat_scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn chat_scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    /// Scroll the transcript so the latest turn (and the "Thinking..."
    /// indicator) is visible.
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for turn in &self.conversation {
            total_lines += 1; // Sender line ("You:" or "AI:")
            for line in turn.content.lines() {
                // Character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after the turn
        }

        // Room for the "Thinking..." indicator
        total_lines += 2;

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        }
    }

    // --- Content cursor and scrolling ---

    pub fn content_line_count(&self) -> usize {
        self.edited_content.split('\n').count()
    }

    /// (line, column) of the content cursor, both in chars.
    pub fn content_cursor_line_col(&self) -> (usize, usize) {
        let mut line = 0;
        let mut col = 0;
        for c in self.edited_content.chars().take(self.content_cursor) {
            if c == '\n' {
                line += 1;
                col = 0;
            } else {
                col += 1;
            }
        }
        (line, col)
    }

    pub fn content_cursor_up(&mut self) {
        let (line, col) = self.content_cursor_line_col();
        if line > 0 {
            self.set_content_cursor(line - 1, col);
        }
    }

    pub fn content_cursor_down(&mut self) {
        let (line, col) = self.content_cursor_line_col();
        self.set_content_cursor(line + 1, col);
    }

    fn set_content_cursor(&mut self, line: usize, col: usize) {
        let lines: Vec<&str> = self.edited_content.split('\n').collect();
        if line >= lines.len() {
            return;
        }

        let col = col.min(lines[line].chars().count());
        let mut index = 0;
        for l in &lines[..line] {
            index += l.chars().count() + 1; // +1 for the newline
        }
        self.content_cursor = index + col;
        self.ensure_content_cursor_visible();
    }

    pub fn ensure_content_cursor_visible(&mut self) {
        let (line, _) = self.content_cursor_line_col();
        let line = line as u16;

        if line < self.content_scroll {
            self.content_scroll = line;
        } else if self.content_height > 0 && line >= self.content_scroll + self.content_height {
            self.content_scroll = line - self.content_height + 1;
        }
    }

    pub fn content_scroll_up(&mut self) {
        self.content_scroll = self.content_scroll.saturating_sub(1);
    }

    pub fn content_scroll_down(&mut self) {
        let max_scroll = (self.content_line_count() as u16).saturating_sub(self.content_height);
        if self.content_scroll < max_scroll {
            self.content_scroll += 1;
        }
    }

    pub fn content_half_page_down(&mut self) {
        let half_page = self.content_height / 2;
        let max_scroll = (self.content_line_count() as u16).saturating_sub(self.content_height);
        self.content_scroll = (self.content_scroll + half_page).min(max_scroll);
    }

    pub fn content_half_page_up(&mut self) {
        let half_page = self.content_height / 2;
        self.content_scroll = self.content_scroll.saturating_sub(half_page);
    }

    // --- Picker popups ---

    pub fn open_style_picker(&mut self) {
        let current = LearningStyle::all()
            .iter()
            .position(|s| *s == self.learning_style)
            .unwrap_or(0);
        self.style_picker_state.select(Some(current));
        self.show_style_picker = true;
    }

    pub fn style_picker_nav_down(&mut self) {
        let len = LearningStyle::all().len();
        if len > 0 {
            let i = self.style_picker_state.selected().unwrap_or(0);
            self.style_picker_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn style_picker_nav_up(&mut self) {
        let i = self.style_picker_state.selected().unwrap_or(0);
        self.style_picker_state.select(Some(i.saturating_sub(1)));
    }

    pub fn choose_style(&mut self) {
        if let Some(i) = self.style_picker_state.selected() {
            if let Some(&style) = LearningStyle::all().get(i) {
                self.set_learning_style(style);
            }
        }
        self.show_style_picker = false;
    }

    pub fn open_enhancement_picker(&mut self) {
        let current = self
            .learning_style
            .enhancements()
            .iter()
            .position(|e| *e == self.enhancement_type)
            .unwrap_or(0);
        self.enhancement_picker_state.select(Some(current));
        self.show_enhancement_picker = true;
    }

    pub fn enhancement_picker_nav_down(&mut self) {
        let len = self.learning_style.enhancements().len();
        if len > 0 {
            let i = self.enhancement_picker_state.selected().unwrap_or(0);
            self.enhancement_picker_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn enhancement_picker_nav_up(&mut self) {
        let i = self.enhancement_picker_state.selected().unwrap_or(0);
        self.enhancement_picker_state.select(Some(i.saturating_sub(1)));
    }

    pub fn choose_enhancement(&mut self) {
        if let Some(i) = self.enhancement_picker_state.selected() {
            if let Some(enhancement) = self.learning_style.enhancements().get(i) {
                self.set_enhancement_type(enhancement.to_string());
            }
        }
        self.show_enhancement_picker = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::DEFAULT_MODEL;

    fn test_app(page_content: &str) -> App {
        App::new(
            LearningStyle::Spatial,
            "Spatial Representations".to_string(),
            page_content.to_string(),
            ChatClient::new("http://localhost:0", "", DEFAULT_MODEL),
        )
    }

    #[test]
    fn test_style_change_resets_enhancement() {
        let mut app = test_app("");
        app.enhancement_type = "Interactive Quizzes".to_string();

        app.apply_learning_style(LearningStyle::Linguistic);
        assert_eq!(app.learning_style, LearningStyle::Linguistic);
        assert_eq!(app.enhancement_type, "Personalized Summaries");

        app.apply_learning_style(LearningStyle::Spatial);
        assert_eq!(app.enhancement_type, "Spatial Representations");
    }

    #[test]
    fn test_empty_or_whitespace_input_is_ignored() {
        let mut app = test_app("");

        app.input = String::new();
        assert!(app.submit_message().is_none());

        app.input = "   \t ".to_string();
        assert!(app.submit_message().is_none());

        assert!(app.conversation.is_empty());
    }

    #[test]
    fn test_submit_captures_message_and_clears_input() {
        let mut app = test_app("");
        app.input = "What is this page about?".to_string();
        app.input_cursor = app.input.chars().count();

        let (message, history) = app.submit_message().unwrap();
        assert_eq!(message, "What is this page about?");
        assert!(history.is_empty());
        assert!(app.input.is_empty());
        assert_eq!(app.input_cursor, 0);
        assert_eq!(app.conversation.len(), 1);
        assert_eq!(app.conversation[0].role, ChatRole::User);
        assert_eq!(app.conversation[0].content, "What is this page about?");
    }

    #[test]
    fn test_submit_hands_out_pre_append_history() {
        let mut app = test_app("");
        app.conversation.push(ChatMessage {
            role: ChatRole::User,
            content: "First".to_string(),
        });
        app.conversation.push(ChatMessage {
            role: ChatRole::Assistant,
            content: "Answer".to_string(),
        });

        app.input = "Second".to_string();
        let (_, history) = app.submit_message().unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(app.conversation.len(), 3);
    }

    #[test]
    fn test_duplicate_user_message_is_not_appended_twice() {
        let mut app = test_app("");

        app.input = "Same question".to_string();
        app.submit_message().unwrap();

        app.input = "Same question".to_string();
        let (message, history) = app.submit_message().unwrap();

        // The call still goes out with the pre-append history, but the
        // transcript shows the turn once
        assert_eq!(message, "Same question");
        assert_eq!(history.len(), 1);
        let user_turns = app
            .conversation
            .iter()
            .filter(|t| t.role == ChatRole::User && t.content == "Same question")
            .count();
        assert_eq!(user_turns, 1);
    }

    #[test]
    fn test_reset_restores_snapshot_exactly() {
        let mut app = test_app("Photosynthesis converts light into chemical energy.");
        app.edited_content.push_str("\nscribbles");
        app.edited_content = app.edited_content.replace("light", "dark");

        app.reset_content();
        assert_eq!(app.edited_content, "Photosynthesis converts light into chemical energy.");
        assert_eq!(app.edited_content, app.page_content);
    }

    #[test]
    fn test_toggle_content_controls_is_render_only() {
        let mut app = test_app("snapshot");
        app.edited_content = "edited".to_string();

        app.toggle_content_controls();
        assert!(app.show_content_controls);
        app.toggle_content_controls();
        assert!(!app.show_content_controls);

        assert_eq!(app.page_content, "snapshot");
        assert_eq!(app.edited_content, "edited");
    }

    #[test]
    fn test_content_cursor_vertical_movement_clamps_column() {
        let mut app = test_app("long first line\nab\nthird line");
        // End of the first line
        app.content_cursor = "long first line".chars().count();

        app.content_cursor_down();
        let (line, col) = app.content_cursor_line_col();
        assert_eq!((line, col), (1, 2)); // clamped to "ab"

        app.content_cursor_down();
        let (line, col) = app.content_cursor_line_col();
        assert_eq!((line, col), (2, 2));

        app.content_cursor_up();
        app.content_cursor_up();
        let (line, _) = app.content_cursor_line_col();
        assert_eq!(line, 0);
    }

    #[test]
    fn test_study_context_uses_snapshot_not_edits() {
        let mut app = test_app("original material");
        app.edited_content = "user edits".to_string();

        let context = app.study_context();
        assert_eq!(context.material, "original material");
    }
}
