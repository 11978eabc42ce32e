use std::io::{self, Write};

use crossterm::{execute, cursor::MoveTo, terminal::{self, Clear, ClearType}};

use crate::dispatch::RowActionState;
use crate::model::TableId;
use crate::view::Presenter;

use super::App;

/// Rows taken by the header, stats block, table headers and footer.
const CHROME_ROWS: u16 = 16;

pub fn render(app: &mut App) -> io::Result<()> {
    let size = terminal::size()?;
    let mut out = io::stdout();
    execute!(out, Clear(ClearType::All), MoveTo(0, 0))?;

    let view = app.monitor.view();
    let counts = TableId::ALL.map(|t| view.table(t).body().entity_count());
    let time = chrono::Local::now().format("%H:%M:%S").to_string();
    Presenter::render_header(&mut out, app.selection.focus, counts, &time, size.0)?;
    Presenter::render_stats(&mut out, view.stats())?;

    let max_rows = (size.1.saturating_sub(CHROME_ROWS) / 2).max(1) as usize;
    let dispatcher = app.monitor.dispatcher();
    for table in TableId::ALL {
        let selected = (table == app.selection.focus).then(|| app.selection.index(table));
        let reconciler = view.table(table);
        Presenter::render_table(
            &mut out,
            &reconciler,
            selected,
            |id| dispatcher.row_state(table, id) != RowActionState::Idle,
            max_rows,
        )?;
    }

    Presenter::render_status(&mut out, app.rendered_status.as_ref())?;
    Presenter::render_footer(&mut out, app.selection.focus, size)?;

    if let Some(form) = app.monitor.forms().form() {
        Presenter::render_form(&mut out, form, size)?;
    }
    if let Some(ref prompt) = app.pending_prompt {
        Presenter::render_confirmation(&mut out, &prompt.description, size)?;
    }

    out.flush()
}
