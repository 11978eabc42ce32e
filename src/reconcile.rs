//! Table reconciliation: rebuild a table body from a snapshot and keep exactly
//! one action binding per rendered identity.
//!
//! Every cycle replaces the whole body. Rows and their handlers are freshly
//! allocated and the previous ones are dropped, so handlers never accumulate.
//! Switching to partial updates would need an explicit unbind step before
//! rebinding a reused row.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::DuplicateIdentityError;
use crate::model::{ActionKind, ClientStatus, ContainerInfo, Keyed, ResourceSnapshot, TableId};

/// Callback invoked when one of a row's controls is activated.
pub trait RowHandler: Send + Sync {
    fn invoke(&self, action: ActionKind);
}

impl<F> RowHandler for F
where
    F: Fn(ActionKind) + Send + Sync,
{
    fn invoke(&self, action: ActionKind) {
        self(action)
    }
}

/// The single handler bound to a rendered row.
#[derive(Clone)]
pub struct Binding {
    handler: Arc<dyn RowHandler>,
}

impl Binding {
    pub fn new(handler: impl RowHandler + 'static) -> Self {
        Self { handler: Arc::new(handler) }
    }

    pub fn invoke(&self, action: ActionKind) {
        self.handler.invoke(action);
    }

    /// Whether both bindings share the same handler allocation.
    pub fn same_as(&self, other: &Binding) -> bool {
        Arc::ptr_eq(&self.handler, &other.handler)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding").finish_non_exhaustive()
    }
}

/// What a row renderer produces for one entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowContent {
    pub cells: Vec<String>,
    pub controls: Vec<ActionKind>,
    /// Name the record is saved and deleted under. For containers this
    /// differs from the row identity.
    pub name: String,
}

/// A rendered entity row and the binding its controls dispatch through.
#[derive(Clone, Debug)]
pub struct RenderedRow {
    pub identity: String,
    pub content: RowContent,
    binding: Option<Binding>,
}

impl RenderedRow {
    pub fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }

    /// Activate one of this row's controls. Returns false when the row has no
    /// such control.
    pub fn activate(&self, action: ActionKind) -> bool {
        match &self.binding {
            Some(binding) if self.content.controls.contains(&action) => {
                binding.invoke(action);
                true
            }
            _ => false,
        }
    }
}

#[derive(Clone, Debug)]
pub enum Row {
    Entity(RenderedRow),
    Placeholder { message: &'static str, colspan: usize },
}

impl Row {
    /// Visible content of the row, without its binding.
    pub fn view(&self) -> RowView<'_> {
        match self {
            Row::Entity(r) => RowView::Entity { identity: &r.identity, content: &r.content },
            Row::Placeholder { message, colspan } => RowView::Placeholder { message: *message, colspan: *colspan },
        }
    }
}

/// Binding-free projection of a row, for comparing rendered output.
#[derive(Debug, PartialEq, Eq)]
pub enum RowView<'a> {
    Entity { identity: &'a str, content: &'a RowContent },
    Placeholder { message: &'a str, colspan: usize },
}

#[derive(Clone, Debug, Default)]
pub struct TableBody {
    rows: Vec<Row>,
}

impl TableBody {
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn entity(&self, index: usize) -> Option<&RenderedRow> {
        match self.rows.get(index)? {
            Row::Entity(r) => Some(r),
            Row::Placeholder { .. } => None,
        }
    }

    /// Number of selectable entity rows.
    pub fn entity_count(&self) -> usize {
        self.rows.iter().filter(|r| matches!(r, Row::Entity(_))).count()
    }

    pub fn views(&self) -> Vec<RowView<'_>> {
        self.rows.iter().map(Row::view).collect()
    }
}

/// Counts from one reconciliation, for logging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub rendered: usize,
    pub released: usize,
}

/// Owns one table's rendered body and its identity → binding map. Nothing
/// else mutates either.
pub struct ViewReconciler {
    table: TableId,
    body: TableBody,
    bindings: HashMap<String, Binding>,
    applied: u64,
}

impl ViewReconciler {
    pub fn new(table: TableId) -> Self {
        Self {
            table,
            body: TableBody::default(),
            bindings: HashMap::new(),
            applied: 0,
        }
    }

    pub fn table(&self) -> TableId {
        self.table
    }

    pub fn body(&self) -> &TableBody {
        &self.body
    }

    pub fn binding(&self, identity: &str) -> Option<&Binding> {
        self.bindings.get(identity)
    }

    pub fn bound_count(&self) -> usize {
        self.bindings.len()
    }

    /// True until the first snapshot has been applied.
    pub fn is_loading(&self) -> bool {
        self.applied == 0
    }

    /// Number of snapshots applied so far.
    pub fn applied(&self) -> u64 {
        self.applied
    }

    /// Replace the table body with `snapshot`.
    ///
    /// On a duplicate identity nothing is touched and the previous render is
    /// kept.
    pub fn reconcile<T, R, B>(
        &mut self,
        snapshot: &ResourceSnapshot<T>,
        render: R,
        mut bind: B,
    ) -> Result<ReconcileReport, DuplicateIdentityError>
    where
        T: Keyed,
        R: Fn(&T) -> RowContent,
        B: FnMut(&str, &RowContent) -> Binding,
    {
        if let Some(identity) = snapshot.first_duplicate() {
            return Err(DuplicateIdentityError {
                table: self.table,
                identity: identity.to_string(),
            });
        }

        self.applied += 1;

        if snapshot.is_empty() {
            let released = self.bindings.len();
            self.bindings = HashMap::new();
            self.body = TableBody {
                rows: vec![Row::Placeholder {
                    message: self.table.placeholder(),
                    colspan: self.table.colspan(),
                }],
            };
            debug!(table = %self.table, released, "rendered empty placeholder");
            return Ok(ReconcileReport { rendered: 0, released });
        }

        let mut rows = Vec::with_capacity(snapshot.len());
        let mut bindings = HashMap::with_capacity(snapshot.len());

        for entity in snapshot {
            let identity = entity.identity().to_string();
            let content = render(entity);
            let binding = if content.controls.is_empty() {
                None
            } else {
                let binding = bind(&identity, &content);
                bindings.insert(identity.clone(), binding.clone());
                Some(binding)
            };
            rows.push(Row::Entity(RenderedRow { identity, content, binding }));
        }

        let released = self
            .bindings
            .keys()
            .filter(|id| !bindings.contains_key(id.as_str()))
            .count();

        // Dropping the previous body and map releases every old handler.
        self.body = TableBody { rows };
        self.bindings = bindings;

        let report = ReconcileReport { rendered: snapshot.len(), released };
        debug!(table = %self.table, rendered = report.rendered, released, "table reconciled");
        Ok(report)
    }

    /// Drop every row and binding (used on teardown).
    pub fn release_all(&mut self) -> usize {
        let released = self.bindings.len();
        self.bindings = HashMap::new();
        self.body = TableBody::default();
        released
    }
}

/// Row renderer for the client roster table.
pub fn client_row(client: &ClientStatus) -> RowContent {
    RowContent {
        cells: vec![
            client.uuid.clone(),
            client.username.clone(),
            client.last_ping.clone(),
            client.status.to_string(),
            client.running_containers.to_string(),
        ],
        controls: vec![ActionKind::Delete, ActionKind::ResetToken],
        name: client.uuid.clone(),
    }
}

/// Row renderer for the running containers table.
pub fn container_row(container: &ContainerInfo) -> RowContent {
    RowContent {
        cells: vec![
            container.id.clone(),
            container.name.clone(),
            container.image.clone(),
            container.owner.clone(),
            container.status.to_string(),
        ],
        controls: vec![ActionKind::Stop, ActionKind::Delete],
        name: container.name.clone(),
    }
}
