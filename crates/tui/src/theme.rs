//! Minimal style palette for the two panes.

use ratatui::style::{Color, Modifier, Style};

pub const ACCENT: Color = Color::Cyan;
pub const WARN: Color = Color::Yellow;

pub fn text_style() -> Style {
    Style::default().fg(Color::Gray)
}

pub fn text_muted() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn title_style() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

pub fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(ACCENT)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

pub fn list_highlight_style() -> Style {
    Style::default().bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD)
}
