use std::io::{self, Write};

use crate::model::{ActionKind, TableId};
use crate::reconcile::{Row, ViewReconciler};
use super::shared::{cell, write_dim, write_section_header, write_selectable, writeln};

/// Column headers and widths; the last column is the action column.
fn columns(table: TableId) -> &'static [(&'static str, usize)] {
    match table {
        TableId::Clients => &[
            ("UUID", 18),
            ("USERNAME", 14),
            ("LAST PING", 16),
            ("STATUS", 8),
            ("CONTAINERS", 10),
            ("ACTIONS", 0),
        ],
        TableId::Containers => &[
            ("ID", 14),
            ("NAME", 20),
            ("IMAGE", 18),
            ("OWNER", 12),
            ("STATUS", 10),
            ("ACTIONS", 0),
        ],
    }
}

fn title(table: TableId) -> &'static str {
    match table {
        TableId::Clients => " CLIENTS",
        TableId::Containers => " RUNNING CONTAINERS",
    }
}

/// Key that triggers an action from the table.
pub fn hotkey(action: ActionKind) -> char {
    match action {
        ActionKind::Stop => 's',
        ActionKind::Delete => 'd',
        ActionKind::ResetToken => 'r',
    }
}

fn actions_cell(controls: &[ActionKind]) -> String {
    controls
        .iter()
        .map(|a| format!("[{}] {}", hotkey(*a), a.label()))
        .collect::<Vec<_>>()
        .join("  ")
}

fn join_cells<'a>(widths: &[(&str, usize)], cells: impl Iterator<Item = &'a str>) -> String {
    let mut line = String::from("  ");
    for ((_, width), text) in widths.iter().zip(cells) {
        if *width == 0 {
            line.push_str(text);
        } else {
            line.push_str(&cell(text, *width));
            line.push(' ');
        }
    }
    line
}

/// Render one table. `selected` is the index of the highlighted entity row,
/// present only while the table has focus. Rows for which `busy` is true show
/// the action in progress instead of their controls.
pub fn render_table(
    out: &mut impl Write,
    reconciler: &ViewReconciler,
    selected: Option<usize>,
    busy: impl Fn(&str) -> bool,
    max_rows: usize,
) -> io::Result<()> {
    let table = reconciler.table();
    write_section_header(out, title(table), selected.is_some())?;

    let widths = columns(table);
    write_dim(out, &join_cells(widths, widths.iter().map(|(name, _)| *name)))?;

    if reconciler.is_loading() {
        write_dim(out, "  Loading...")?;
        return writeln(out, "");
    }

    let mut entity_index = 0;
    for row in reconciler.body().rows().iter().take(max_rows) {
        match row {
            Row::Placeholder { message, .. } => write_dim(out, &format!("  {}", message))?,
            Row::Entity(rendered) => {
                let actions = if busy(&rendered.identity) {
                    "working...".to_string()
                } else {
                    actions_cell(&rendered.content.controls)
                };
                let cells = rendered
                    .content
                    .cells
                    .iter()
                    .map(String::as_str)
                    .chain(std::iter::once(actions.as_str()));
                let line = join_cells(widths, cells);
                write_selectable(out, &line, selected == Some(entity_index))?;
                entity_index += 1;
            }
        }
    }

    let hidden = reconciler.body().len().saturating_sub(max_rows);
    if hidden > 0 {
        write_dim(out, &format!("  ... {} more", hidden))?;
    }
    writeln(out, "")
}
