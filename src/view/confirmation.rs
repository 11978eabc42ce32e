use std::io::{self, Write};
use crossterm::{cursor::MoveTo, queue, style::{Attribute, Color, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor}};

pub fn render_confirmation(out: &mut impl Write, prompt: &str, (cols, rows): (u16, u16)) -> io::Result<()> {
    let y = rows.saturating_sub(3);
    let width = cols as usize;

    queue!(out, MoveTo(0, y))?;
    queue!(out, SetBackgroundColor(Color::DarkRed), SetForegroundColor(Color::White), SetAttribute(Attribute::Bold))?;
    let line = format!("  {} (y to confirm, any other key to cancel)  ", prompt);
    write!(out, "{:<width$}", line, width = width)?;
    queue!(out, ResetColor, SetAttribute(Attribute::Reset))?;
    Ok(())
}
