use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key)?,
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    // Popups swallow input while open
    if app.show_style_picker {
        handle_style_picker(app, key);
        return Ok(());
    }
    if app.show_enhancement_picker {
        handle_enhancement_picker(app, key);
        return Ok(());
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }

    Ok(())
}

fn handle_style_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.show_style_picker = false,
        KeyCode::Char('j') | KeyCode::Down => app.style_picker_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.style_picker_nav_up(),
        KeyCode::Enter => app.choose_style(),
        _ => {}
    }
}

fn handle_enhancement_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.show_enhancement_picker = false,
        KeyCode::Char('j') | KeyCode::Down => app.enhancement_picker_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.enhancement_picker_nav_up(),
        KeyCode::Enter => app.choose_enhancement(),
        _ => {}
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        // Quit
        KeyCode::Char('q') => app.should_quit = true,

        // Tab cycles focus: Chat -> Input -> Content (when shown) -> Chat
        KeyCode::Tab => {
            app.focus = match app.focus {
                FocusPane::Chat => FocusPane::Input,
                FocusPane::Input => {
                    if app.show_content_controls {
                        FocusPane::Content
                    } else {
                        FocusPane::Chat
                    }
                }
                FocusPane::Content => FocusPane::Chat,
            };
        }

        // Enter editing on the focused pane
        KeyCode::Char('i') | KeyCode::Enter => {
            if app.focus != FocusPane::Content {
                app.focus = FocusPane::Input;
                app.input_cursor = app.input.chars().count();
            }
            app.input_mode = InputMode::Editing;
        }

        // Preference pickers
        KeyCode::Char('s') => app.open_style_picker(),
        KeyCode::Char('e') => app.open_enhancement_picker(),

        // Show/hide the editable content pane
        KeyCode::Char('c') => app.toggle_content_controls(),

        // Reset the edited copy to the snapshot
        KeyCode::Char('r') => {
            if app.focus == FocusPane::Content {
                app.reset_content();
            }
        }

        // Scrolling
        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            FocusPane::Content => app.content_scroll_down(),
            _ => app.chat_scroll_down(),
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            FocusPane::Content => app.content_scroll_up(),
            _ => app.chat_scroll_up(),
        },
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            if app.focus == FocusPane::Content {
                app.content_half_page_down();
            }
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            if app.focus == FocusPane::Content {
                app.content_half_page_up();
            }
        }
        KeyCode::Char('g') => match app.focus {
            FocusPane::Content => app.content_scroll = 0,
            _ => app.chat_scroll = 0,
        },
        KeyCode::Char('G') => match app.focus {
            FocusPane::Content => {
                let max = (app.content_line_count() as u16).saturating_sub(app.content_height);
                app.content_scroll = max;
            }
            _ => app.scroll_chat_to_bottom(),
        },

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match app.focus {
        FocusPane::Input => handle_input_editing(app, key),
        FocusPane::Content => handle_content_editing(app, key),
        FocusPane::Chat => app.input_mode = InputMode::Normal,
    }
}

fn handle_input_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            // Stage the turn, then fire the call in the background. The
            // input stays focused: nothing stops a second send while the
            // first is still in flight.
            if let Some((message, history)) = app.submit_message() {
                let client = app.chat.clone();
                let context = app.study_context();
                app.pending_replies.push(tokio::spawn(async move {
                    client.send(&message, &history, &context).await
                }));
            }
        }
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.input_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
            app.input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

fn handle_content_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            let byte_pos = char_to_byte_index(&app.edited_content, app.content_cursor);
            app.edited_content.insert(byte_pos, '\n');
            app.content_cursor += 1;
            app.ensure_content_cursor_visible();
        }
        KeyCode::Backspace => {
            if app.content_cursor > 0 {
                app.content_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.edited_content, app.content_cursor);
                app.edited_content.remove(byte_pos);
                app.ensure_content_cursor_visible();
            }
        }
        KeyCode::Delete => {
            let char_count = app.edited_content.chars().count();
            if app.content_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.edited_content, app.content_cursor);
                app.edited_content.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.content_cursor = app.content_cursor.saturating_sub(1);
            app.ensure_content_cursor_visible();
        }
        KeyCode::Right => {
            let char_count = app.edited_content.chars().count();
            app.content_cursor = (app.content_cursor + 1).min(char_count);
            app.ensure_content_cursor_visible();
        }
        KeyCode::Up => {
            app.content_cursor_up();
        }
        KeyCode::Down => {
            app.content_cursor_down();
        }
        KeyCode::Home => {
            let (line, _) = app.content_cursor_line_col();
            let mut index = 0;
            for l in app.edited_content.split('\n').take(line) {
                index += l.chars().count() + 1;
            }
            app.content_cursor = index;
        }
        KeyCode::End => {
            let (line, _) = app.content_cursor_line_col();
            let mut index = 0;
            for (i, l) in app.edited_content.split('\n').enumerate() {
                if i == line {
                    index += l.chars().count();
                    break;
                }
                index += l.chars().count() + 1;
            }
            app.content_cursor = index;
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.edited_content, app.content_cursor);
            app.edited_content.insert(byte_pos, c);
            app.content_cursor += 1;
            app.ensure_content_cursor_visible();
        }
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    let in_chat = app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_content = app.content_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_content {
                app.content_scroll_down();
                app.content_scroll_down();
                app.content_scroll_down();
            } else if in_chat {
                app.chat_scroll_down();
                app.chat_scroll_down();
                app.chat_scroll_down();
            }
        }
        MouseEventKind::ScrollUp => {
            if in_content {
                app.content_scroll_up();
                app.content_scroll_up();
                app.content_scroll_up();
            } else if in_chat {
                app.chat_scroll_up();
                app.chat_scroll_up();
                app.chat_scroll_up();
            }
        }
        _ => {}
    }
}
