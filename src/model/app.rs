use std::fmt;

/// An interactive table of the monitoring view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TableId {
    Clients,
    Containers,
}

impl TableId {
    pub const ALL: [TableId; 2] = [TableId::Clients, TableId::Containers];

    /// Text of the single row shown when the table has no entities.
    pub fn placeholder(&self) -> &'static str {
        match self {
            TableId::Clients => "No clients connected",
            TableId::Containers => "No containers running",
        }
    }

    /// Number of columns the placeholder row spans, including the action column.
    pub fn colspan(&self) -> usize {
        match self {
            TableId::Clients => 6,
            TableId::Containers => 6,
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableId::Clients => write!(f, "clients"),
            TableId::Containers => write!(f, "containers"),
        }
    }
}

/// A region of the monitoring view refreshed by its own poll task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewRegion {
    Stats,
    Table(TableId),
}

impl From<TableId> for ViewRegion {
    fn from(table: TableId) -> Self {
        ViewRegion::Table(table)
    }
}

impl fmt::Display for ViewRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewRegion::Stats => write!(f, "stats"),
            ViewRegion::Table(t) => t.fmt(f),
        }
    }
}

/// Inline row action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Stop,
    Delete,
    ResetToken,
}

impl ActionKind {
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Stop => "Stop",
            ActionKind::Delete => "Delete",
            ActionKind::ResetToken => "Reset token",
        }
    }
}
