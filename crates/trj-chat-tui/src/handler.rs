use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, Focus};
use crate::tui::AppEvent;

/// Byte offset of the `char_idx`-th char, for UTF-8 safe edits.
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key).await,
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => app.scroll_chat_to_bottom(),
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Stream(update) => app.apply_stream_update(update),
    }
    Ok(())
}

async fn handle_key(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match key.code {
        KeyCode::Tab => {
            app.focus = app.focus.next();
            return;
        }
        KeyCode::BackTab => {
            app.focus = app.focus.prev();
            return;
        }
        KeyCode::PageUp => {
            app.scroll_chat_up(app.chat_height.max(2) / 2);
            return;
        }
        KeyCode::PageDown => {
            app.scroll_chat_down(app.chat_height.max(2) / 2);
            return;
        }
        KeyCode::Esc => {
            app.session.dismiss_notice();
            if app.focus == Focus::Input {
                app.focus = Focus::Models;
            }
            return;
        }
        _ => {}
    }

    if app.focus == Focus::Input {
        handle_input_key(app, key).await;
    } else {
        handle_sidebar_key(app, key).await;
    }
}

async fn handle_sidebar_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('r') => {
            if let Err(e) = app.refresh().await {
                tracing::warn!("catalog refresh failed: {}", e);
            }
        }
        KeyCode::Enter | KeyCode::Char('i') => app.focus = Focus::Input,
        _ => {}
    }

    // Edits below re-query the catalog first, like every browser interaction does
    match (app.focus, key.code) {
        (Focus::Models, KeyCode::Down | KeyCode::Char('j')) => {
            if app.refresh().await.is_ok() {
                app.select_model_offset(1);
            }
        }
        (Focus::Models, KeyCode::Up | KeyCode::Char('k')) => {
            if app.refresh().await.is_ok() {
                app.select_model_offset(-1);
            }
        }
        (Focus::Models, KeyCode::Delete | KeyCode::Backspace) => {
            if app.refresh().await.is_ok() {
                app.clear_model();
            }
        }
        (Focus::Temperature | Focus::TopP, code) => {
            let steps = match code {
                KeyCode::Right | KeyCode::Char('l') => 1,
                KeyCode::Left | KeyCode::Char('h') => -1,
                KeyCode::Up | KeyCode::Char('k') => 10,
                KeyCode::Down | KeyCode::Char('j') => -10,
                _ => return,
            };
            if app.refresh().await.is_ok() {
                app.nudge_slider(steps);
            }
        }
        _ => {}
    }
}

async fn handle_input_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => {
            if app.input.trim().is_empty() {
                return;
            }
            if let Err(e) = app.refresh().await {
                tracing::warn!("catalog refresh failed: {}", e);
                return;
            }
            app.submit_input();
        }
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if app.cursor < app.input.chars().count() {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => app.cursor = app.cursor.saturating_sub(1),
        KeyCode::Right => app.cursor = (app.cursor + 1).min(app.input.chars().count()),
        KeyCode::Home => app.cursor = 0,
        KeyCode::End => app.cursor = app.input.chars().count(),
        KeyCode::Up => app.scroll_chat_up(1),
        KeyCode::Down => app.scroll_chat_down(1),
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }
        _ => {}
    }
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_chat_down(3),
        MouseEventKind::ScrollUp => app.scroll_chat_up(3),
        _ => {}
    }
}
