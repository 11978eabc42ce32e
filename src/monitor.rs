//! The mounted dashboard: scheduler, reconcilers, dispatcher and forms wired
//! to one set of collaborators.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::DashboardConfig;
use crate::dispatch::{ActionDispatcher, ConfirmationGate, StatusLine};
use crate::forms::ModalFormController;
use crate::model::{ClientStatus, ContainerInfo, Keyed, ServerStat, TableId, ViewRegion};
use crate::reconcile::{Binding, RowContent, ViewReconciler, client_row, container_row};
use crate::scheduler::{PollScheduler, PollTask, RefreshHandle};
use crate::source::{DataSource, MutationBackend, SnapshotSource};

/// The three collections the dashboard polls.
pub struct Sources {
    pub stats: Arc<dyn DataSource<Output = ServerStat>>,
    pub clients: SnapshotSource<ClientStatus>,
    pub containers: SnapshotSource<ContainerInfo>,
}

/// Rendered state shared between the refresh tasks and the presenter.
pub struct DashboardView {
    stats: Mutex<Option<ServerStat>>,
    clients: Mutex<ViewReconciler>,
    containers: Mutex<ViewReconciler>,
    version: AtomicU64,
}

impl DashboardView {
    fn new() -> Self {
        Self {
            stats: Mutex::new(None),
            clients: Mutex::new(ViewReconciler::new(TableId::Clients)),
            containers: Mutex::new(ViewReconciler::new(TableId::Containers)),
            version: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> Option<ServerStat> {
        *self.stats.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn table(&self, table: TableId) -> MutexGuard<'_, ViewReconciler> {
        let reconciler = match table {
            TableId::Clients => &self.clients,
            TableId::Containers => &self.containers,
        };
        reconciler.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Bumped after every applied update; the presenter redraws on change.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    fn set_stats(&self, stat: ServerStat) {
        *self.stats.lock().unwrap_or_else(|p| p.into_inner()) = Some(stat);
        self.touch();
    }

    fn touch(&self) {
        self.version.fetch_add(1, Ordering::AcqRel);
    }
}

pub struct Monitor {
    scheduler: PollScheduler,
    view: Arc<DashboardView>,
    dispatcher: Arc<ActionDispatcher>,
    forms: ModalFormController,
    status: StatusLine,
}

impl Monitor {
    /// Build every collaborator and start polling. Must be called from within
    /// a tokio runtime.
    pub fn mount(
        config: &DashboardConfig,
        sources: Sources,
        backend: Arc<dyn MutationBackend>,
        gate: Arc<dyn ConfirmationGate>,
    ) -> Self {
        let refresh = RefreshHandle::for_regions([
            ViewRegion::Stats,
            ViewRegion::Table(TableId::Clients),
            ViewRegion::Table(TableId::Containers),
        ]);
        let status = StatusLine::new();
        let view = Arc::new(DashboardView::new());
        let dispatcher = Arc::new(ActionDispatcher::new(
            Arc::clone(&backend),
            gate,
            refresh.clone(),
            status.clone(),
        ));
        let forms = ModalFormController::new(backend, refresh.clone());

        // Handed to the scheduler, which cancels it on stop.
        let teardown = CancellationToken::new();
        let discard_after = config.strict_teardown.then(|| teardown.child_token());

        let runtime = tokio::runtime::Handle::current();
        let tasks = vec![
            stats_task(sources.stats, Arc::clone(&view), discard_after.clone()),
            table_task(
                TableId::Clients,
                sources.clients,
                Arc::clone(&view),
                client_row,
                Arc::new(dispatcher.binder(TableId::Clients, runtime.clone())),
                discard_after.clone(),
            ),
            table_task(
                TableId::Containers,
                sources.containers,
                Arc::clone(&view),
                container_row,
                Arc::new(dispatcher.binder(TableId::Containers, runtime)),
                discard_after,
            ),
        ];

        let scheduler = PollScheduler::start_with(config.interval, tasks, refresh, teardown);

        info!(
            interval_ms = config.interval.as_millis() as u64,
            strict_teardown = config.strict_teardown,
            "dashboard mounted"
        );

        Self { scheduler, view, dispatcher, forms, status }
    }

    pub fn view(&self) -> &Arc<DashboardView> {
        &self.view
    }

    pub fn dispatcher(&self) -> &Arc<ActionDispatcher> {
        &self.dispatcher
    }

    pub fn forms(&self) -> &ModalFormController {
        &self.forms
    }

    pub fn forms_mut(&mut self) -> &mut ModalFormController {
        &mut self.forms
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    pub fn refresh_handle(&self) -> RefreshHandle {
        self.scheduler.refresh_handle()
    }

    pub fn is_mounted(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Stop polling and release every row binding. Fetches already in flight
    /// are not aborted.
    pub fn dispose(&mut self) {
        if !self.scheduler.is_running() {
            return;
        }
        self.scheduler.stop();
        let released: usize = TableId::ALL
            .iter()
            .map(|&table| self.view.table(table).release_all())
            .sum();
        self.view.touch();
        info!(released, "dashboard disposed");
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn discarded(teardown: &Option<CancellationToken>) -> bool {
    teardown.as_ref().is_some_and(CancellationToken::is_cancelled)
}

fn stats_task(
    source: Arc<dyn DataSource<Output = ServerStat>>,
    view: Arc<DashboardView>,
    teardown: Option<CancellationToken>,
) -> PollTask {
    PollTask::new(ViewRegion::Stats, move || {
        let source = Arc::clone(&source);
        let view = Arc::clone(&view);
        let teardown = teardown.clone();
        async move {
            match source.fetch().await {
                Ok(_) if discarded(&teardown) => debug!("stats resolved after teardown; discarded"),
                Ok(stat) => view.set_stats(stat),
                Err(err) => warn!(error = %err, "stats fetch failed; keeping last values"),
            }
        }
    })
}

fn table_task<T, B>(
    table: TableId,
    source: SnapshotSource<T>,
    view: Arc<DashboardView>,
    render: fn(&T) -> RowContent,
    bind: Arc<B>,
    teardown: Option<CancellationToken>,
) -> PollTask
where
    T: Keyed + Send + Sync + 'static,
    B: Fn(&str, &RowContent) -> Binding + Send + Sync + 'static,
{
    PollTask::new(table, move || {
        let source = Arc::clone(&source);
        let view = Arc::clone(&view);
        let bind = Arc::clone(&bind);
        let teardown = teardown.clone();
        async move {
            let snapshot = match source.fetch().await {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    warn!(%table, error = %err, "fetch failed; keeping last render");
                    return;
                }
            };
            // Checked under the table lock so dispose() cannot release the
            // bindings between the check and the rebuild.
            let mut reconciler = view.table(table);
            if discarded(&teardown) {
                debug!(%table, "snapshot resolved after teardown; discarded");
                return;
            }
            let result = reconciler.reconcile(&snapshot, render, |id: &str, content: &RowContent| (*bind)(id, content));
            drop(reconciler);
            match result {
                Ok(_) => view.touch(),
                Err(err) => error!(%table, error = %err, "snapshot rejected; keeping last render"),
            }
        }
    })
}
