use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph, Wrap},
    Frame,
};
use trj_chat_core::{
    parse_inline, ChatRole, InlineStyle, Notice, NoticeLevel, PageView, RenderedMessage,
    SidebarView, SliderSpec, SliderView, TEMPERATURE, TOP_P,
};

use crate::app::{App, Focus};

const SIDEBAR_WIDTH: u16 = 34;

/// Styles one line's `**bold**` and `` `code` `` spans.
pub fn styled_line(text: &str) -> Line<'static> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let code = Style::default().fg(Color::Green);

    let spans: Vec<Span<'static>> = parse_inline(text)
        .into_iter()
        .map(|span| match span.style {
            InlineStyle::Plain => Span::raw(span.text),
            InlineStyle::Bold => Span::styled(span.text, bold),
            InlineStyle::Code => Span::styled(span.text, code),
        })
        .collect();
    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_header(app, frame, header_area);

    match app.session.render() {
        PageView::Loading => {
            app.chat_area = None;
            let loading = Paragraph::new("Loading models...")
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(loading, centered_line(body_area));
        }
        PageView::Halted { notice } => {
            app.chat_area = None;
            render_halted(&notice, frame, body_area);
        }
        PageView::Ready {
            sidebar,
            transcript,
            pending,
            notice,
        } => {
            let [sidebar_area, main_area] =
                Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
                    .areas(body_area);
            render_sidebar(app, &sidebar, frame, sidebar_area);
            render_chat(app, &transcript, pending.as_deref(), notice.as_ref(), frame, main_area);
        }
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let model = app
        .session
        .state()
        .config
        .selected_model
        .clone()
        .unwrap_or_else(|| "no model".to_string());

    let title = Line::from(vec![
        Span::styled(" TRJ Chatbot ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!("[{}]", model), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(title).style(Style::default().bg(Color::DarkGray)), area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode, hints) = match app.focus {
        Focus::Models => (" MODELS ", "↑↓ select  Del clear  r refresh  Tab next  q quit"),
        Focus::Temperature | Focus::TopP => {
            (" SLIDER ", "←→ ±0.01  ↑↓ ±0.10  r refresh  Tab next  q quit")
        }
        Focus::Input => (" CHAT ", "Enter send  PgUp/PgDn scroll  Esc sidebar  Ctrl-C quit"),
    };

    let mode_style = if app.focus == Focus::Input {
        Style::default().bg(Color::Yellow).fg(Color::Black)
    } else {
        Style::default().bg(Color::Blue).fg(Color::White)
    };

    let footer = Line::from(vec![
        Span::styled(mode, mode_style),
        Span::raw(" "),
        Span::styled(hints, Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(footer), area);
}

fn render_halted(notice: &Notice, frame: &mut Frame, area: Rect) {
    let [_, notice_area, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(6),
        Constraint::Fill(1),
    ])
    .areas(area);

    let text = Text::from(vec![
        Line::from(Span::styled(notice.text.clone(), notice_style(notice.level))),
        Line::default(),
        Line::from(Span::styled(
            "Press r to retry or q to quit.",
            Style::default().fg(Color::DarkGray),
        )),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(notice_style(notice.level))
        .title(" TRJ Chatbot ");
    let paragraph = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, notice_area);
}

fn render_sidebar(app: &mut App, sidebar: &SidebarView, frame: &mut Frame, area: Rect) {
    let outer = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Model Configuration ");
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    let [models_area, heading_area, temperature_area, top_p_area, help_area] = Layout::vertical([
        Constraint::Min(3),
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(4),
    ])
    .areas(inner);

    let models_title = if sidebar.selected_model.is_some() {
        " Choose your model "
    } else {
        " Choose your model (none) "
    };
    let items: Vec<ListItem> = sidebar
        .models
        .iter()
        .map(|model| {
            let style = if Some(model) == sidebar.selected_model.as_ref() {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} ", model)).style(style)
        })
        .collect();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(focus_border(app.focus == Focus::Models))
                .title(models_title),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, models_area, &mut app.model_state);

    frame.render_widget(
        Paragraph::new(Span::styled("Randomness Control", Style::default().bold())),
        heading_area,
    );

    render_slider(&TEMPERATURE, &sidebar.temperature, app.focus == Focus::Temperature, frame, temperature_area);
    render_slider(&TOP_P, &sidebar.top_p, app.focus == Focus::TopP, frame, top_p_area);

    if let Some(slider) = app.focused_slider() {
        let help = Paragraph::new(slider.help)
            .style(Style::default().fg(Color::DarkGray))
            .wrap(Wrap { trim: true });
        frame.render_widget(help, help_area);
    }
}

fn render_slider(
    spec: &SliderSpec,
    slider: &SliderView,
    focused: bool,
    frame: &mut Frame,
    area: Rect,
) {
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(focus_border(focused))
                .title(format!(" {} ", slider.label)),
        )
        .gauge_style(Style::default().fg(Color::Magenta).bg(Color::Black))
        .ratio(spec.ratio(slider.value))
        .label(format!("{:.2}", slider.value));
    frame.render_widget(gauge, area);
}

fn render_chat(
    app: &mut App,
    transcript: &[RenderedMessage],
    pending: Option<&str>,
    notice: Option<&Notice>,
    frame: &mut Frame,
    area: Rect,
) {
    let [chat_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(area);

    app.chat_area = Some(chat_area);
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_text = if transcript.is_empty() && pending.is_none() && notice.is_none() {
        Text::from(Span::styled(
            "Ask a question to start chatting.",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for message in transcript {
            lines.push(role_line(message.role));
            if message.role == ChatRole::Assistant {
                lines.extend(message.content.split('\n').map(styled_line));
            } else {
                lines.extend(message.content.split('\n').map(|l| Line::from(l.to_string())));
            }
            lines.push(Line::default());
        }

        if let Some(partial) = pending {
            lines.push(role_line(ChatRole::Assistant));
            if partial.is_empty() {
                let dots = ".".repeat(app.animation_frame as usize + 1);
                lines.push(Line::from(Span::styled(
                    format!("Thinking{}", dots),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )));
            } else {
                lines.extend(partial.split('\n').map(styled_line));
            }
        }

        if let Some(notice) = notice {
            lines.push(Line::from(Span::styled(
                notice.text.clone(),
                notice_style(notice.level),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(" Chat "),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    render_input(app, pending.is_some(), frame, input_area);
}

fn render_input(app: &App, streaming: bool, frame: &mut Frame, area: Rect) {
    let focused = app.focus == Focus::Input;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        })
        .title(if streaming { " Waiting for reply... " } else { " Message " });

    // Scroll horizontally so the cursor stays visible
    let inner_width = area.width.saturating_sub(2) as usize;
    let offset = if inner_width > 0 && app.cursor >= inner_width {
        app.cursor - inner_width + 1
    } else {
        0
    };

    let paragraph = if app.input.is_empty() && !focused {
        Paragraph::new(Span::styled(
            "Ask a question...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let visible: String = app.input.chars().skip(offset).take(inner_width).collect();
        Paragraph::new(visible).style(Style::default().fg(Color::Cyan))
    };
    frame.render_widget(paragraph.block(block), area);

    if focused {
        frame.set_cursor_position((area.x + 1 + (app.cursor - offset) as u16, area.y + 1));
    }
}

fn role_line(role: ChatRole) -> Line<'static> {
    let color = match role {
        ChatRole::User => Color::Cyan,
        ChatRole::Assistant => Color::Yellow,
    };
    Line::from(Span::styled(
        format!("{}:", role.display_name()),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

fn notice_style(level: NoticeLevel) -> Style {
    match level {
        NoticeLevel::Warning => Style::default().fg(Color::Yellow),
        NoticeLevel::Error => Style::default().fg(Color::Red),
    }
}

fn focus_border(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn centered_line(area: Rect) -> Rect {
    let [_, line, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(1),
        Constraint::Fill(1),
    ])
    .areas(area);
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{app_with, ScriptedService};
    use ratatui::{backend::TestBackend, Terminal};

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_bold_spans() {
        let line = styled_line("a **b** c");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "b");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(plain(&line), "a b c");
    }

    #[test]
    fn test_code_before_bold() {
        let line = styled_line("`x` and **y**");
        assert_eq!(line.spans[0].content, "x");
        assert_eq!(line.spans[0].style.fg, Some(Color::Green));
        assert_eq!(plain(&line), "x and y");
    }

    #[tokio::test]
    async fn test_ready_screen_shows_sidebar_and_chat() {
        let (mut app, _rx) = app_with(ScriptedService::new(&["llama3"], vec![])).await;
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| render(&mut app, f)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("TRJ Chatbot"));
        assert!(text.contains("Model Configuration"));
        assert!(text.contains("Randomness Control"));
        assert!(text.contains("llama3"));
        assert!(app.chat_area.is_some());
    }

    #[tokio::test]
    async fn test_halted_screen_shows_only_notice() {
        let (mut app, _rx) = app_with(ScriptedService::new(&[], vec![])).await;
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| render(&mut app, f)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("Error connecting to Ollama"));
        assert!(!text.contains("Randomness Control"));
        assert!(app.chat_area.is_none());
    }
}
