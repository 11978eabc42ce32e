mod state;
mod event_loop;
mod render;
mod input;
mod prompt;

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, Clear, ClearType},
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::DashboardConfig;
use crate::dispatch::StatusMessage;
use crate::error::MutationError;
use crate::forms::FormKind;
use crate::monitor::{Monitor, Sources};
use crate::source::{
    ContainerCatalog, ContainerRuntime, DataSource, DockerRuntime, FleetBackend, HostStats, MutationBackend, Roster,
    RosterSource, RunningContainers, SimulatedRuntime, SimulatedStats, demo_users,
};
use crate::model::ServerStat;
use crate::view::Presenter;

pub use prompt::{PendingPrompt, PromptGate};
pub use state::Selection;

/// Restore the terminal to normal mode. Safe to call multiple times.
pub fn restore_terminal() {
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
    let _ = disable_raw_mode();
}

/// Main application state and event loop.
pub struct App {
    pub rt: Arc<tokio::runtime::Runtime>,
    pub monitor: Monitor,
    pub selection: Selection,
    pub prompts: mpsc::UnboundedReceiver<PendingPrompt>,
    pub pending_prompt: Option<PendingPrompt>,
    pub pending_save: Option<(FormKind, JoinHandle<Result<(), MutationError>>)>,
    pub rendered_version: u64,
    pub rendered_status: Option<StatusMessage>,
}

impl App {
    pub fn new(rt: Arc<tokio::runtime::Runtime>, config: &DashboardConfig) -> Self {
        let (gate, prompts) = PromptGate::new(config.confirm_timeout);
        let (sources, backend) = rt.block_on(collaborators(config));
        let monitor = {
            let _guard = rt.enter();
            Monitor::mount(config, sources, backend, Arc::new(gate))
        };

        Self {
            rt,
            monitor,
            selection: Selection::default(),
            prompts,
            pending_prompt: None,
            pending_save: None,
            rendered_version: u64::MAX,
            rendered_status: None,
        }
    }
}

/// Pick real or simulated collaborators. Without a reachable Docker daemon
/// the container engine falls back to the simulated one.
async fn collaborators(config: &DashboardConfig) -> (Sources, Arc<dyn MutationBackend>) {
    let runtime: Arc<dyn ContainerRuntime>;
    let stats: Arc<dyn DataSource<Output = ServerStat>>;
    let roster;
    if config.demo {
        info!("demo mode: simulated stats, containers and clients");
        runtime = Arc::new(SimulatedRuntime::with_fixture());
        stats = Arc::new(SimulatedStats::new());
        roster = Roster::with_users(demo_users(chrono::Utc::now()));
    } else {
        runtime = match DockerRuntime::connect().await {
            Some(docker) => Arc::new(docker),
            None => {
                warn!("docker daemon unavailable; using simulated containers");
                Arc::new(SimulatedRuntime::new(Vec::new()))
            }
        };
        stats = Arc::new(HostStats::new());
        roster = Roster::new();
    }

    let roster = Arc::new(roster);
    let offline_after = chrono::Duration::from_std(config.offline_after).unwrap_or(chrono::Duration::MAX);
    let sources = Sources {
        stats,
        clients: Arc::new(RosterSource::new(Arc::clone(&roster), Arc::clone(&runtime), offline_after)),
        containers: Arc::new(RunningContainers::new(Arc::clone(&runtime))),
    };
    let backend: Arc<dyn MutationBackend> = Arc::new(FleetBackend::new(roster, Arc::new(ContainerCatalog::new()), runtime));
    (sources, backend)
}

/// Run the application. Sets up terminal, runs the main loop, restores terminal on exit.
pub fn run(config: DashboardConfig, should_quit: Arc<AtomicBool>) -> io::Result<()> {
    let rt = Arc::new(
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .worker_threads(2)
            .build()?,
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, Clear(ClearType::All))?;

    let mut app = App::new(Arc::clone(&rt), &config);
    let mut needs_render = true;

    loop {
        if should_quit.load(Ordering::Relaxed) {
            break;
        }

        if app.poll_prompts() {
            needs_render = true;
        }
        if app.poll_save() {
            needs_render = true;
        }
        if app.poll_view() {
            needs_render = true;
        }

        if needs_render {
            if Presenter::render_size_guard()? {
                needs_render = false;
                if crossterm::event::poll(Duration::from_millis(100))? {
                    let _ = crossterm::event::read()?;
                }
                continue;
            }

            render::render(&mut app)?;
            needs_render = false;
        }

        if crossterm::event::poll(Duration::from_millis(100))? {
            if let crossterm::event::Event::Key(key_event) = crossterm::event::read()? {
                match input::handle_key(&mut app, key_event) {
                    Some(input::InputResult::Quit) => break,
                    Some(input::InputResult::Consumed) => needs_render = true,
                    None => {}
                }
            }
        }
    }

    if let Some(prompt) = app.pending_prompt.take() {
        prompt.answer(false);
    }
    app.monitor.dispose();
    restore_terminal();
    Ok(())
}
