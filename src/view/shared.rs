use std::io::{self, Write};
use crossterm::{queue, style::{Attribute, Color, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor}};

/// Truncate a string to at most `max_len` characters (not bytes), appending "..."
/// if truncated. Safe for multi-byte UTF-8.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_len {
        s.to_string()
    } else {
        let keep = max_len.saturating_sub(3);
        let truncated: String = s.chars().take(keep).collect();
        format!("{}...", truncated)
    }
}

/// Truncate then left-align `s` in a column of `width` characters.
pub fn cell(s: &str, width: usize) -> String {
    let text = truncate_str(s, width);
    let pad = width.saturating_sub(text.chars().count());
    format!("{}{}", text, " ".repeat(pad))
}

pub fn writeln(out: &mut impl Write, text: &str) -> io::Result<()> {
    write!(out, "{}\r\n", text)
}

pub fn write_section_header(out: &mut impl Write, text: &str, focused: bool) -> io::Result<()> {
    if focused {
        queue!(out, SetBackgroundColor(Color::DarkBlue), SetForegroundColor(Color::White))?;
    } else {
        queue!(out, SetAttribute(Attribute::Bold))?;
    }
    write!(out, "{}\r\n", text)?;
    queue!(out, ResetColor, SetAttribute(Attribute::Reset))?;
    Ok(())
}

pub fn write_selectable(out: &mut impl Write, text: &str, selected: bool) -> io::Result<()> {
    if selected {
        queue!(out, SetBackgroundColor(Color::DarkGrey), SetForegroundColor(Color::White))?;
    }
    write!(out, "{}\r\n", text)?;
    if selected {
        queue!(out, ResetColor)?;
    }
    Ok(())
}

pub fn write_dim(out: &mut impl Write, text: &str) -> io::Result<()> {
    queue!(out, SetForegroundColor(Color::DarkGrey))?;
    write!(out, "{}\r\n", text)?;
    queue!(out, ResetColor)?;
    Ok(())
}

pub fn progress_bar(percent: f64, width: usize) -> String {
    let filled = ((percent / 100.0) * width as f64).round() as usize;
    let empty = width.saturating_sub(filled);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

/// Bar colour for a usage percentage.
pub fn usage_color(percent: u8) -> Color {
    match percent {
        0..=59 => Color::Green,
        60..=84 => Color::Yellow,
        _ => Color::Red,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_str_short_string() {
        assert_eq!(truncate_str("hello", 10), "hello");
    }

    #[test]
    fn truncate_str_long_string() {
        assert_eq!(truncate_str("hello world", 8), "hello...");
    }

    #[test]
    fn truncate_str_utf8() {
        assert_eq!(truncate_str("café", 4), "café");
        assert_eq!(truncate_str("hello世界", 6), "hel...");
    }

    #[test]
    fn cell_pads_and_truncates() {
        assert_eq!(cell("abc", 5), "abc  ");
        assert_eq!(cell("lsl-ubuntu-123", 8), "lsl-u...");
    }

    #[test]
    fn progress_bar_bounds() {
        assert_eq!(progress_bar(0.0, 4), "[░░░░]");
        assert_eq!(progress_bar(100.0, 5), "[█████]");
        assert_eq!(progress_bar(50.0, 4), "[██░░]");
    }

    #[test]
    fn usage_color_thresholds() {
        assert_eq!(usage_color(10), Color::Green);
        assert_eq!(usage_color(60), Color::Yellow);
        assert_eq!(usage_color(95), Color::Red);
    }

    #[test]
    fn selectable_line_ends_with_crlf() {
        let mut buf = Vec::new();
        write_selectable(&mut buf, "row", false).unwrap();
        assert_eq!(buf, b"row\r\n");
    }
}
