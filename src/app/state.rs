use crate::model::TableId;

/// Which table has focus and the highlighted row in each.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub focus: TableId,
    index: [usize; 2],
}

impl Default for Selection {
    fn default() -> Self {
        Self { focus: TableId::Clients, index: [0; 2] }
    }
}

fn slot(table: TableId) -> usize {
    match table {
        TableId::Clients => 0,
        TableId::Containers => 1,
    }
}

impl Selection {
    pub fn index(&self, table: TableId) -> usize {
        self.index[slot(table)]
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            TableId::Clients => TableId::Containers,
            TableId::Containers => TableId::Clients,
        };
    }

    /// Move up in the focused table. Returns whether the selection changed.
    pub fn up(&mut self) -> bool {
        let idx = &mut self.index[slot(self.focus)];
        if *idx > 0 {
            *idx -= 1;
            true
        } else {
            false
        }
    }

    /// Move down in the focused table, which has `rows` entity rows.
    pub fn down(&mut self, rows: usize) -> bool {
        let idx = &mut self.index[slot(self.focus)];
        if *idx + 1 < rows {
            *idx += 1;
            true
        } else {
            false
        }
    }

    /// Keep the index of `table` inside its current row count after a
    /// refresh shrank it.
    pub fn clamp(&mut self, table: TableId, rows: usize) {
        let idx = &mut self.index[slot(table)];
        *idx = (*idx).min(rows.saturating_sub(1));
    }
}
