use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use crate::app::{App, FocusPane, InputMode};
use crate::chat::ChatRole;
use crate::prefs::LearningStyle;

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        match rest[start + 2..].find("**") {
            Some(len) => {
                if start > 0 {
                    spans.push(Span::raw(rest[..start].to_string()));
                }
                let bold = &rest[start + 2..start + 2 + len];
                if !bold.is_empty() {
                    spans.push(Span::styled(
                        bold.to_string(),
                        Style::default().add_modifier(Modifier::BOLD),
                    ));
                }
                rest = &rest[start + 2 + len + 2..];
            }
            // No closing marker: the rest is literal
            None => break,
        }
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
    render_body(app, frame, body_area);
    render_footer(app, frame, footer_area);

    // Popups (style picker wins if both are somehow up)
    if app.show_style_picker {
        render_style_picker(app, frame, area);
    } else if app.show_enhancement_picker {
        render_enhancement_picker(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let page_indicator = if app.page_content.is_empty() {
        " [no page content]"
    } else {
        ""
    };

    let title = Line::from(vec![
        Span::styled(" lectern ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(page_indicator, Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_body(app: &mut App, frame: &mut Frame, area: Rect) {
    if app.show_content_controls {
        let [settings_area, content_area, chat_area, input_area] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Percentage(40),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .areas(area);

        render_settings(app, frame, settings_area);
        render_content_editor(app, frame, content_area);
        render_chat(app, frame, chat_area);
        render_input(app, frame, input_area);
    } else {
        let [settings_area, chat_area, input_area] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .areas(area);

        app.content_area = None;
        render_settings(app, frame, settings_area);
        render_chat(app, frame, chat_area);
        render_input(app, frame, input_area);
    }
}

fn render_settings(app: &App, frame: &mut Frame, area: Rect) {
    let [style_area, enhancement_area] = Layout::horizontal([
        Constraint::Percentage(50),
        Constraint::Percentage(50),
    ])
    .areas(area);

    let style_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Learning style [s] ");
    let style_value = Paragraph::new(Span::styled(
        format!(" {} ", app.learning_style.display_name()),
        Style::default().fg(Color::Cyan),
    ))
    .block(style_block);
    frame.render_widget(style_value, style_area);

    let enhancement_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Enhancement [e] ");
    let enhancement_value = Paragraph::new(Span::styled(
        format!(" {} ", app.enhancement_type),
        Style::default().fg(Color::Cyan),
    ))
    .block(enhancement_block);
    frame.render_widget(enhancement_value, enhancement_area);
}

fn render_content_editor(app: &mut App, frame: &mut Frame, area: Rect) {
    let content_focused = app.focus == FocusPane::Content;
    let border_color = if content_focused { Color::Cyan } else { Color::DarkGray };
    let editing = content_focused && app.input_mode == InputMode::Editing;

    let title = if editing {
        " Page Content (editing) "
    } else {
        " Page Content (editable copy) "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2);

    app.content_area = Some(area);
    app.content_height = inner_height;

    // Horizontal offset keeps the cursor column on screen; the whole pane
    // shifts together, which is fine for occasional long lines
    let (cursor_line, cursor_col) = app.content_cursor_line_col();
    let h_offset = if editing && inner_width > 0 && cursor_col >= inner_width {
        (cursor_col - inner_width + 1) as u16
    } else {
        0
    };

    let text = if app.edited_content.is_empty() {
        Text::from(Span::styled(
            "No page content. Type here to add your own notes.",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Text::from(
            app.edited_content
                .split('\n')
                .map(|line| Line::from(line.to_string()))
                .collect::<Vec<_>>(),
        )
    };

    let paragraph = Paragraph::new(text)
        .block(block)
        .scroll((app.content_scroll, h_offset));
    frame.render_widget(paragraph, area);

    if editing {
        let row = cursor_line as u16;
        if row >= app.content_scroll && row < app.content_scroll + inner_height {
            let x = area.x + 1 + (cursor_col as u16).saturating_sub(h_offset);
            let y = area.y + 1 + row - app.content_scroll;
            frame.set_cursor_position((x.min(area.x + area.width.saturating_sub(2)), y));
        }
    }
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let chat_focused = app.focus == FocusPane::Chat;
    let border_color = if chat_focused { Color::Cyan } else { Color::DarkGray };

    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let key_hint = if app.api_key_missing { " (no API key)" } else { "" };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" Tutor: {}{} ", app.chat.model(), key_hint));

    let chat_text = if app.conversation.is_empty() && !app.reply_pending() {
        Text::from(Span::styled(
            "Ask me anything about this page...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for turn in &app.conversation {
            match turn.role {
                ChatRole::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                    lines.push(Line::from(turn.content.clone()));
                    lines.push(Line::default());
                }
                ChatRole::Assistant => {
                    lines.push(Line::from(Span::styled(
                        "AI:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )));
                    for line in turn.content.lines() {
                        lines.push(parse_markdown_line(line));
                    }
                    lines.push(Line::default());
                }
            }
        }

        if app.reply_pending() {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
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

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let input_focused = app.focus == FocusPane::Input;
    let editing = input_focused && app.input_mode == InputMode::Editing;
    let border_color = if editing {
        Color::Yellow
    } else if input_focused {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Ask ");

    // Horizontal scrolling keeps the cursor visible in a single-line input
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;

    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app.input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = if app.input.is_empty() && !editing {
        Paragraph::new(Span::styled(
            "Ask me anything...",
            Style::default().fg(Color::DarkGray),
        ))
        .block(block)
    } else {
        Paragraph::new(visible_text)
            .style(Style::default().fg(Color::Cyan))
            .block(block)
    };

    frame.render_widget(input, area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " EDIT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match (app.input_mode, app.focus) {
        (InputMode::Editing, FocusPane::Input) => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
        (InputMode::Editing, FocusPane::Content) => vec![
            Span::styled(" arrows ", key_style),
            Span::styled(" move ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop editing ", label_style),
        ],
        (_, FocusPane::Content) => vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" i ", key_style),
            Span::styled(" edit ", label_style),
            Span::styled(" r ", key_style),
            Span::styled(" reset ", label_style),
            Span::styled(" c ", key_style),
            Span::styled(" hide ", label_style),
            Span::styled(" Tab ", key_style),
            Span::styled(" focus ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
        _ => vec![
            Span::styled(" i ", key_style),
            Span::styled(" ask ", label_style),
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" s ", key_style),
            Span::styled(" style ", label_style),
            Span::styled(" e ", key_style),
            Span::styled(" enhancement ", label_style),
            Span::styled(" c ", key_style),
            Span::styled(
                if app.show_content_controls { " hide content " } else { " edit content " },
                label_style,
            ),
            Span::styled(" Tab ", key_style),
            Span::styled(" focus ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_style_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let styles = LearningStyle::all();

    let popup_width = 40.min(area.width.saturating_sub(4));
    let popup_height = (styles.len() as u16 + 2).min(area.height.saturating_sub(4));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Learning style (Enter to select, Esc to cancel) ");

    let items: Vec<ListItem> = styles
        .iter()
        .map(|style| {
            let is_current = *style == app.learning_style;
            let prefix = if is_current { "* " } else { "  " };
            let item_style = if is_current {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!("{}{}", prefix, style.display_name())).style(item_style)
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

    frame.render_stateful_widget(list, popup_area, &mut app.style_picker_state);
}

fn render_enhancement_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let enhancements = app.learning_style.enhancements();

    let popup_width = 45.min(area.width.saturating_sub(4));
    let popup_height = (enhancements.len() as u16 + 2).min(area.height.saturating_sub(4));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" {} enhancements ", app.learning_style.display_name()));

    let items: Vec<ListItem> = enhancements
        .iter()
        .map(|enhancement| {
            let is_current = *enhancement == app.enhancement_type;
            let prefix = if is_current { "* " } else { "  " };
            let item_style = if is_current {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!("{}{}", prefix, enhancement)).style(item_style)
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

    frame.render_stateful_widget(list, popup_area, &mut app.enhancement_picker_state);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_markdown_bold() {
        let line = parse_markdown_line("plain **bold** tail");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[0].content, "plain ");
        assert_eq!(line.spans[1].content, "bold");
        assert_eq!(line.spans[2].content, " tail");
    }

    #[test]
    fn test_parse_markdown_unclosed_is_literal() {
        let line = parse_markdown_line("no **closing marker");
        assert_eq!(line.spans.len(), 1);
        assert_eq!(line.spans[0].content, "no **closing marker");
    }

    #[test]
    fn test_parse_markdown_empty_line() {
        let line = parse_markdown_line("");
        assert!(line.spans.is_empty());
    }
}
