//! Row actions: confirm, forward to the mutation backend, then request a
//! refresh of the owning view. Nothing here touches table state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{error, info};

use crate::error::MutationError;
use crate::model::{ActionKind, TableId, ViewRegion};
use crate::reconcile::{Binding, RowContent};
use crate::scheduler::RefreshHandle;
use crate::source::MutationBackend;

/// Yes/no gate shown before a destructive action.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

/// User-visible feedback line for action results.
#[derive(Clone, Default)]
pub struct StatusLine {
    inner: Arc<Mutex<Option<StatusMessage>>>,
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<StatusMessage>> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn info(&self, text: impl Into<String>) {
        *self.lock() = Some(StatusMessage { level: StatusLevel::Info, text: text.into() });
    }

    pub fn error(&self, text: impl Into<String>) {
        *self.lock() = Some(StatusMessage { level: StatusLevel::Error, text: text.into() });
    }

    pub fn current(&self) -> Option<StatusMessage> {
        self.lock().clone()
    }

}

/// Per-row action state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowActionState {
    Idle,
    ConfirmPending,
    Dispatching,
}

#[derive(Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The gate was declined; nothing happened.
    Declined,
    /// The mutation succeeded and a refresh of `refresh` was queued.
    Completed { refresh: ViewRegion },
    /// The mutation failed; the error is on the status line.
    Failed(MutationError),
    /// Another action on this row is still pending.
    Busy,
}

struct Route {
    prompt: String,
    done: String,
}

fn route(table: TableId, kind: ActionKind, identity: &str) -> Option<Route> {
    let (prompt, done) = match (table, kind) {
        (TableId::Containers, ActionKind::Stop) => (
            format!("Are you sure you want to stop container {}?", identity),
            format!("Stopped container {}", identity),
        ),
        (TableId::Containers, ActionKind::Delete) => (
            format!("Are you sure you want to delete container {}?", identity),
            format!("Deleted container {}", identity),
        ),
        (TableId::Clients, ActionKind::Delete) => (
            format!("Are you sure you want to delete user {}?", identity),
            format!("Deleted user {}", identity),
        ),
        (TableId::Clients, ActionKind::ResetToken) => (
            format!("Are you sure you want to reset the token of user {}?", identity),
            format!("Reset token of user {}", identity),
        ),
        _ => return None,
    };
    Some(Route { prompt, done })
}

/// Container definitions are deleted by name, everything else by row identity.
fn addressed_by_name(table: TableId, kind: ActionKind) -> bool {
    matches!((table, kind), (TableId::Containers, ActionKind::Delete))
}

type RowKey = (TableId, String);

/// Resets a row back to `Idle` when the dispatch ends, however it ends.
struct RowGuard<'a> {
    rows: &'a Mutex<HashMap<RowKey, RowActionState>>,
    key: RowKey,
}

impl RowGuard<'_> {
    fn set(&self, state: RowActionState) {
        lock_rows(self.rows).insert(self.key.clone(), state);
    }
}

impl Drop for RowGuard<'_> {
    fn drop(&mut self) {
        lock_rows(self.rows).remove(&self.key);
    }
}

fn lock_rows(rows: &Mutex<HashMap<RowKey, RowActionState>>) -> MutexGuard<'_, HashMap<RowKey, RowActionState>> {
    rows.lock().unwrap_or_else(|p| p.into_inner())
}

pub struct ActionDispatcher {
    backend: Arc<dyn MutationBackend>,
    gate: Arc<dyn ConfirmationGate>,
    refresh: RefreshHandle,
    status: StatusLine,
    rows: Mutex<HashMap<RowKey, RowActionState>>,
}

impl ActionDispatcher {
    pub fn new(
        backend: Arc<dyn MutationBackend>,
        gate: Arc<dyn ConfirmationGate>,
        refresh: RefreshHandle,
        status: StatusLine,
    ) -> Self {
        Self {
            backend,
            gate,
            refresh,
            status,
            rows: Mutex::new(HashMap::new()),
        }
    }

    pub fn row_state(&self, table: TableId, identity: &str) -> RowActionState {
        lock_rows(&self.rows)
            .get(&(table, identity.to_string()))
            .copied()
            .unwrap_or(RowActionState::Idle)
    }

    /// Run `kind` against the row `identity` of `table`.
    pub async fn dispatch(&self, table: TableId, kind: ActionKind, identity: &str) -> DispatchOutcome {
        self.dispatch_to(table, kind, identity, identity).await
    }

    /// Run `kind` on the row `identity`, addressing the mutation to `target`.
    /// Container deletes are addressed by definition name while the row is
    /// tracked by container id.
    pub async fn dispatch_to(&self, table: TableId, kind: ActionKind, identity: &str, target: &str) -> DispatchOutcome {
        let Some(route) = route(table, kind, target) else {
            let err = MutationError::Unsupported(format!("{} on {}", kind.label(), table));
            self.status.error(err.to_string());
            return DispatchOutcome::Failed(err);
        };

        let guard = {
            let mut rows = lock_rows(&self.rows);
            let key = (table, identity.to_string());
            if rows.contains_key(&key) {
                return DispatchOutcome::Busy;
            }
            rows.insert(key.clone(), RowActionState::ConfirmPending);
            RowGuard { rows: &self.rows, key }
        };

        if !self.gate.confirm(&route.prompt).await {
            return DispatchOutcome::Declined;
        }

        guard.set(RowActionState::Dispatching);
        let result = match (table, kind) {
            (TableId::Containers, ActionKind::Stop) => self.backend.stop_container(target).await,
            (TableId::Containers, ActionKind::Delete) => self.backend.delete_container(target).await,
            (TableId::Clients, ActionKind::Delete) => self.backend.delete_user(target).await,
            (TableId::Clients, ActionKind::ResetToken) => self.backend.reset_user_token(target).await,
            _ => Err(MutationError::Unsupported(format!("{} on {}", kind.label(), table))),
        };
        drop(guard);

        match result {
            Ok(()) => {
                let refresh = ViewRegion::Table(table);
                self.refresh.request(refresh);
                self.status.info(route.done);
                info!(%table, action = kind.label(), target, "action completed");
                DispatchOutcome::Completed { refresh }
            }
            Err(err) => {
                error!(%table, action = kind.label(), target, error = %err, "action failed");
                self.status.error(format!("{} failed: {}", kind.label(), err));
                DispatchOutcome::Failed(err)
            }
        }
    }

    /// Binder for `table`: each call yields a fresh handler that dispatches
    /// the activated action for that row on `runtime`.
    pub fn binder(
        self: &Arc<Self>,
        table: TableId,
        runtime: tokio::runtime::Handle,
    ) -> impl Fn(&str, &RowContent) -> Binding + Send + Sync + 'static {
        let dispatcher = Arc::clone(self);
        move |identity: &str, content: &RowContent| {
            let dispatcher = Arc::clone(&dispatcher);
            let runtime = runtime.clone();
            let identity = identity.to_string();
            let name = content.name.clone();
            Binding::new(move |kind: ActionKind| {
                let dispatcher = Arc::clone(&dispatcher);
                let identity = identity.clone();
                let target = if addressed_by_name(table, kind) { name.clone() } else { identity.clone() };
                runtime.spawn(async move {
                    dispatcher.dispatch_to(table, kind, &identity, &target).await;
                });
            })
        }
    }
}
