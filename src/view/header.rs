use std::io::{self, Write};
use crossterm::{
    cursor, queue,
    style::{Color, ResetColor, SetBackgroundColor, SetForegroundColor},
};

use crate::model::TableId;

/// One tab per table, with the focused one highlighted, and the clock on the
/// right.
pub fn render_header(
    out: &mut impl Write,
    focus: TableId,
    counts: [usize; 2],
    time: &str,
    cols: u16,
) -> io::Result<()> {
    write!(out, "  ")?;

    for (table, count) in TableId::ALL.iter().zip(counts) {
        if *table == focus {
            queue!(out, SetBackgroundColor(Color::DarkBlue), SetForegroundColor(Color::White))?;
        } else {
            queue!(out, SetForegroundColor(Color::DarkGrey))?;
        }
        write!(out, " {} ({}) ", tab_label(*table), count)?;
        queue!(out, ResetColor)?;
        write!(out, "  ")?;
    }

    let time_str = format!("fleetdash - {} ", time);
    let col = (cols as usize).saturating_sub(time_str.chars().count());
    queue!(out, cursor::MoveTo(col as u16, 0), SetForegroundColor(Color::DarkGrey))?;
    write!(out, "{}", time_str)?;
    queue!(out, ResetColor)?;
    write!(out, "\r\n")?;

    queue!(out, SetForegroundColor(Color::DarkGrey))?;
    write!(out, "{}\r\n", "─".repeat(cols as usize))?;
    queue!(out, ResetColor)?;
    Ok(())
}

fn tab_label(table: TableId) -> &'static str {
    match table {
        TableId::Clients => "Clients",
        TableId::Containers => "Containers",
    }
}
