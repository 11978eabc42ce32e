//! Integration tests for the mounted dashboard.
//! Runs the scheduler, reconcilers and dispatcher together against the
//! simulated collaborators, on paused tokio time.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::time::{Instant, sleep, sleep_until};

use fleetdash::config::DashboardConfig;
use fleetdash::dispatch::{ConfirmationGate, DispatchOutcome};
use fleetdash::error::FetchError;
use fleetdash::forms::FormKind;
use fleetdash::model::{ActionKind, ClientStatus, ContainerInfo, ContainerState, ResourceSnapshot, TableId, ViewRegion};
use fleetdash::monitor::{Monitor, Sources};
use fleetdash::reconcile::Row;
use fleetdash::scheduler::{PollScheduler, PollTask};
use fleetdash::source::{
    ContainerCatalog, ContainerRuntime, DataSource, FleetBackend, MutationBackend, Roster, RosterSource,
    RunningContainers, SimulatedRuntime, SimulatedStats, demo_users,
};

struct FixedGate(bool);

#[async_trait]
impl ConfirmationGate for FixedGate {
    async fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

/// Wraps a source and counts its fetches.
struct Counted<S> {
    inner: S,
    fetches: Arc<AtomicUsize>,
}

#[async_trait]
impl<S: DataSource> DataSource for Counted<S> {
    type Output = S::Output;

    async fn fetch(&self) -> Result<Self::Output, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch().await
    }
}

/// Container source that waits before answering and fails after `ok_for`
/// successful fetches.
struct Scripted {
    delay: Duration,
    ok_for: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl DataSource for Scripted {
    type Output = ResourceSnapshot<ContainerInfo>;

    async fn fetch(&self) -> Result<Self::Output, FetchError> {
        sleep(self.delay).await;
        if self.calls.fetch_add(1, Ordering::SeqCst) >= self.ok_for {
            return Err(FetchError::Unavailable("engine went away".into()));
        }
        Ok(ResourceSnapshot::new(vec![ContainerInfo {
            id: "abc123".into(),
            name: "lsl-ubuntu-123".into(),
            image: "ubuntu:latest".into(),
            owner: "user1".into(),
            status: ContainerState::Running,
        }]))
    }
}

struct Unreachable;

#[async_trait]
impl DataSource for Unreachable {
    type Output = ResourceSnapshot<ClientStatus>;

    async fn fetch(&self) -> Result<Self::Output, FetchError> {
        Err(FetchError::Backend("roster offline".into()))
    }
}

struct Fleet {
    roster: Arc<Roster>,
    runtime: Arc<SimulatedRuntime>,
    backend: Arc<dyn MutationBackend>,
    roster_fetches: Arc<AtomicUsize>,
}

fn fleet() -> Fleet {
    let roster = Arc::new(Roster::with_users(demo_users(Utc::now())));
    let runtime = Arc::new(SimulatedRuntime::with_fixture());
    let backend: Arc<dyn MutationBackend> = Arc::new(FleetBackend::new(
        Arc::clone(&roster),
        Arc::new(ContainerCatalog::new()),
        runtime.clone(),
    ));
    Fleet { roster, runtime, backend, roster_fetches: Arc::new(AtomicUsize::new(0)) }
}

impl Fleet {
    fn sources(&self) -> Sources {
        let runtime: Arc<dyn ContainerRuntime> = self.runtime.clone();
        Sources {
            stats: Arc::new(SimulatedStats::new()),
            clients: Arc::new(Counted {
                inner: RosterSource::new(Arc::clone(&self.roster), Arc::clone(&runtime), chrono::Duration::seconds(600)),
                fetches: Arc::clone(&self.roster_fetches),
            }),
            containers: Arc::new(RunningContainers::new(runtime)),
        }
    }
}

fn config(strict_teardown: bool) -> DashboardConfig {
    DashboardConfig { strict_teardown, ..Default::default() }
}

#[tokio::test(start_paused = true)]
async fn three_tasks_run_on_a_fixed_cadence() {
    let t0 = Instant::now();
    let log: Arc<Mutex<Vec<(ViewRegion, u128)>>> = Arc::new(Mutex::new(Vec::new()));
    let regions = [ViewRegion::Stats, TableId::Clients.into(), TableId::Containers.into()];
    let tasks = regions
        .iter()
        .map(|&region| {
            let log = Arc::clone(&log);
            PollTask::new(region, move || {
                let log = Arc::clone(&log);
                async move {
                    log.lock().unwrap().push((region, t0.elapsed().as_millis()));
                }
            })
        })
        .collect();

    let _scheduler = PollScheduler::start(Duration::from_millis(5000), tasks);
    sleep_until(t0 + Duration::from_millis(12_000)).await;

    let log = log.lock().unwrap();
    for region in regions {
        let times: Vec<u128> = log.iter().filter(|(r, _)| *r == region).map(|(_, t)| *t).collect();
        assert_eq!(times, vec![0, 5000, 10_000], "{region}");
    }
}

#[tokio::test(start_paused = true)]
async fn slow_fetch_never_overlaps_itself() {
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let runs = Arc::new(AtomicUsize::new(0));
    let (a, p, r) = (Arc::clone(&active), Arc::clone(&peak), Arc::clone(&runs));

    let _scheduler = PollScheduler::start(
        Duration::from_millis(5000),
        vec![PollTask::new(TableId::Clients, move || {
            let (a, p, r) = (Arc::clone(&a), Arc::clone(&p), Arc::clone(&r));
            async move {
                let now = a.fetch_add(1, Ordering::SeqCst) + 1;
                p.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_millis(7000)).await;
                a.fetch_sub(1, Ordering::SeqCst);
                r.fetch_add(1, Ordering::SeqCst);
            }
        })],
    );
    sleep(Duration::from_millis(30_000)).await;

    assert_eq!(peak.load(Ordering::SeqCst), 1);
    assert!(runs.load(Ordering::SeqCst) >= 3);
}

#[tokio::test(start_paused = true)]
async fn no_invocations_after_stop() {
    let runs = Arc::new(AtomicUsize::new(0));
    let r = Arc::clone(&runs);
    let scheduler = PollScheduler::start(
        Duration::from_millis(5000),
        vec![PollTask::new(ViewRegion::Stats, move || {
            let r = Arc::clone(&r);
            async move {
                r.fetch_add(1, Ordering::SeqCst);
            }
        })],
    );
    sleep(Duration::from_millis(5100)).await;
    scheduler.stop();
    let refresh = scheduler.refresh_handle();
    refresh.request(ViewRegion::Stats);
    sleep(Duration::from_millis(20_000)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn confirmed_delete_user_refetches_roster_before_next_tick() {
    let fleet = fleet();
    let monitor = Monitor::mount(&config(false), fleet.sources(), Arc::clone(&fleet.backend), Arc::new(FixedGate(true)));
    sleep(Duration::from_millis(10)).await;
    assert_eq!(fleet.roster_fetches.load(Ordering::SeqCst), 1);
    assert_eq!(monitor.view().table(TableId::Clients).bound_count(), 3);

    let outcome = monitor
        .dispatcher()
        .dispatch(TableId::Clients, ActionKind::Delete, "client-123-abc")
        .await;
    assert_eq!(outcome, DispatchOutcome::Completed { refresh: ViewRegion::Table(TableId::Clients) });

    sleep(Duration::from_millis(10)).await;
    assert_eq!(fleet.roster_fetches.load(Ordering::SeqCst), 2);
    let clients = monitor.view().table(TableId::Clients);
    assert!(clients.binding("client-123-abc").is_none());
    assert!(clients.binding("client-456-def").is_some());
}

#[tokio::test(start_paused = true)]
async fn declined_stop_changes_nothing() {
    let fleet = fleet();
    let monitor = Monitor::mount(&config(false), fleet.sources(), Arc::clone(&fleet.backend), Arc::new(FixedGate(false)));
    sleep(Duration::from_millis(10)).await;

    let outcome = monitor.dispatcher().dispatch(TableId::Containers, ActionKind::Stop, "abc123").await;
    assert_eq!(outcome, DispatchOutcome::Declined);

    sleep(Duration::from_millis(10)).await;
    assert!(fleet.runtime.all().iter().all(|c| c.status == ContainerState::Running));
    let containers = monitor.view().table(TableId::Containers);
    assert_eq!(containers.applied(), 1);
    assert_eq!(containers.bound_count(), 3);
    assert!(monitor.status().current().is_none());
}

#[tokio::test(start_paused = true)]
async fn row_control_stops_container_and_refreshes() {
    let fleet = fleet();
    let monitor = Monitor::mount(&config(false), fleet.sources(), Arc::clone(&fleet.backend), Arc::new(FixedGate(true)));
    sleep(Duration::from_millis(10)).await;

    let fired = monitor
        .view()
        .table(TableId::Containers)
        .binding("def456")
        .map(|binding| binding.invoke(ActionKind::Stop))
        .is_some();
    assert!(fired);
    sleep(Duration::from_millis(10)).await;

    let containers = monitor.view().table(TableId::Containers);
    assert!(containers.binding("def456").is_none());
    assert_eq!(containers.bound_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn row_control_deletes_container_by_name() {
    let fleet = fleet();
    let monitor = Monitor::mount(&config(false), fleet.sources(), Arc::clone(&fleet.backend), Arc::new(FixedGate(true)));
    sleep(Duration::from_millis(10)).await;

    let fired = monitor
        .view()
        .table(TableId::Containers)
        .body()
        .rows()
        .iter()
        .find_map(|row| match row {
            Row::Entity(r) if r.identity == "ghi789" => Some(r.activate(ActionKind::Delete)),
            _ => None,
        });
    assert_eq!(fired, Some(true));
    sleep(Duration::from_millis(10)).await;

    assert!(fleet.runtime.all().iter().all(|c| c.name != "lsl-python-789"));
    assert_eq!(
        monitor.status().current().map(|m| m.text),
        Some("Deleted container lsl-python-789".to_string())
    );
    let containers = monitor.view().table(TableId::Containers);
    assert!(containers.binding("ghi789").is_none());
    assert_eq!(containers.applied(), 2);
}

#[tokio::test(start_paused = true)]
async fn user_saved_from_form_shows_up_in_clients() {
    let fleet = fleet();
    let mut monitor = Monitor::mount(&config(false), fleet.sources(), Arc::clone(&fleet.backend), Arc::new(FixedGate(true)));
    sleep(Duration::from_millis(10)).await;

    let forms = monitor.forms_mut();
    forms.open_add(FormKind::User);
    for c in "alice".chars() {
        forms.input_char(c);
    }
    forms.submit().await.unwrap();
    sleep(Duration::from_millis(10)).await;

    assert_eq!(fleet.roster_fetches.load(Ordering::SeqCst), 2);
    let clients = monitor.view().table(TableId::Clients);
    assert_eq!(clients.bound_count(), 4);
    let alice = (0..clients.body().len())
        .filter_map(|i| clients.body().entity(i))
        .find(|row| row.content.cells[1] == "alice")
        .map(|row| row.content.cells[2].clone());
    assert_eq!(alice.as_deref(), Some("never"));
}

#[tokio::test(start_paused = true)]
async fn strict_teardown_discards_late_results() {
    let fleet = fleet();
    let mut sources = fleet.sources();
    sources.containers = Arc::new(Scripted { delay: Duration::from_millis(2000), ok_for: 10, calls: AtomicUsize::new(0) });

    let mut monitor = Monitor::mount(&config(true), sources, Arc::clone(&fleet.backend), Arc::new(FixedGate(true)));
    sleep(Duration::from_millis(10)).await;
    monitor.dispose();
    sleep(Duration::from_millis(3000)).await;

    let containers = monitor.view().table(TableId::Containers);
    assert!(containers.is_loading());
    assert_eq!(containers.bound_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn lenient_teardown_applies_late_results() {
    let fleet = fleet();
    let mut sources = fleet.sources();
    sources.containers = Arc::new(Scripted { delay: Duration::from_millis(2000), ok_for: 10, calls: AtomicUsize::new(0) });

    let mut monitor = Monitor::mount(&config(false), sources, Arc::clone(&fleet.backend), Arc::new(FixedGate(true)));
    sleep(Duration::from_millis(10)).await;
    monitor.dispose();
    sleep(Duration::from_millis(3000)).await;

    assert_eq!(monitor.view().table(TableId::Containers).applied(), 1);
}

#[tokio::test(start_paused = true)]
async fn fetch_error_keeps_last_render() {
    let fleet = fleet();
    let mut sources = fleet.sources();
    sources.containers = Arc::new(Scripted { delay: Duration::ZERO, ok_for: 1, calls: AtomicUsize::new(0) });

    let monitor = Monitor::mount(&config(false), sources, Arc::clone(&fleet.backend), Arc::new(FixedGate(true)));
    sleep(Duration::from_millis(10_100)).await;

    let containers = monitor.view().table(TableId::Containers);
    assert_eq!(containers.applied(), 1);
    assert!(containers.binding("abc123").is_some());
    assert_eq!(containers.body().entity_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn failing_table_does_not_block_others() {
    let fleet = fleet();
    let mut sources = fleet.sources();
    sources.clients = Arc::new(Unreachable);

    let monitor = Monitor::mount(&config(false), sources, Arc::clone(&fleet.backend), Arc::new(FixedGate(true)));
    sleep(Duration::from_millis(5100)).await;

    assert!(monitor.view().table(TableId::Clients).is_loading());
    assert_eq!(monitor.view().table(TableId::Containers).applied(), 2);
    assert!(monitor.view().stats().is_some());
}
