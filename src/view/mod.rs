mod shared;
mod header;
mod stats;
mod table;
mod confirmation;
mod form;

use std::io::{self, Write};
use crossterm::{cursor, execute, queue, style::{Color, ResetColor, SetForegroundColor}, terminal};

use crate::dispatch::{StatusLevel, StatusMessage};
use crate::forms::FormState;
use crate::model::{ActionKind, ServerStat, TableId};
use crate::reconcile::ViewReconciler;

pub use shared::truncate_str;
pub use table::hotkey;

pub struct Presenter;

/// Minimum terminal dimensions for usable rendering.
pub const MIN_COLS: u16 = 80;
pub const MIN_ROWS: u16 = 10;

impl Presenter {
    /// Check if the terminal is large enough. If not, render a "too small"
    /// message and return `true` (meaning "skip normal rendering").
    pub fn render_size_guard() -> io::Result<bool> {
        let (cols, rows) = terminal::size()?;
        if cols < MIN_COLS || rows < MIN_ROWS {
            let mut out = std::io::stdout();
            execute!(out, terminal::Clear(terminal::ClearType::All), cursor::MoveTo(0, 0))?;
            let msg = format!(
                "Terminal too small ({}x{}). Resize to at least {}x{}.",
                cols, rows, MIN_COLS, MIN_ROWS
            );
            let y = rows / 2;
            let x = cols.saturating_sub(msg.len() as u16) / 2;
            queue!(out, cursor::MoveTo(x, y), SetForegroundColor(Color::Yellow))?;
            write!(out, "{}", msg)?;
            queue!(out, ResetColor)?;
            out.flush()?;
            return Ok(true);
        }
        Ok(false)
    }

    pub fn render_header(out: &mut impl Write, focus: TableId, counts: [usize; 2], time: &str, cols: u16) -> io::Result<()> {
        header::render_header(out, focus, counts, time, cols)
    }

    pub fn render_stats(out: &mut impl Write, stats: Option<ServerStat>) -> io::Result<()> {
        stats::render_stats(out, stats)
    }

    pub fn render_table(
        out: &mut impl Write,
        reconciler: &ViewReconciler,
        selected: Option<usize>,
        busy: impl Fn(&str) -> bool,
        max_rows: usize,
    ) -> io::Result<()> {
        table::render_table(out, reconciler, selected, busy, max_rows)
    }

    pub fn render_status(out: &mut impl Write, status: Option<&StatusMessage>) -> io::Result<()> {
        let Some(status) = status else { return Ok(()) };
        let color = match status.level {
            StatusLevel::Info => Color::Green,
            StatusLevel::Error => Color::Red,
        };
        queue!(out, SetForegroundColor(color))?;
        shared::writeln(out, &format!("  {}", status.text))?;
        queue!(out, ResetColor)?;
        Ok(())
    }

    pub fn render_footer(out: &mut impl Write, focus: TableId, (cols, rows): (u16, u16)) -> io::Result<()> {
        let actions = match focus {
            TableId::Clients => format!("{}: Delete | {}: Reset token", hotkey(ActionKind::Delete), hotkey(ActionKind::ResetToken)),
            TableId::Containers => format!("{}: Stop | {}: Delete", hotkey(ActionKind::Stop), hotkey(ActionKind::Delete)),
        };
        let help = format!(
            "q/Esc: Quit | Tab: Switch table | ↑/↓: Navigate | {} | u/c: Add user/container | e: Edit | F5: Refresh",
            actions
        );
        queue!(
            out,
            cursor::MoveTo(1, rows.saturating_sub(1)),
            SetForegroundColor(Color::DarkGrey),
            crossterm::style::Print(truncate_str(&help, cols.saturating_sub(1) as usize)),
            ResetColor
        )?;
        Ok(())
    }

    pub fn render_confirmation(out: &mut impl Write, prompt: &str, size: (u16, u16)) -> io::Result<()> {
        confirmation::render_confirmation(out, prompt, size)
    }

    pub fn render_form(out: &mut impl Write, form: &FormState, size: (u16, u16)) -> io::Result<()> {
        form::render_form(out, form, size)
    }
}
