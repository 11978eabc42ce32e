//! Fixed-cadence polling of independent view regions.
//!
//! Every task gets its own loop: a region's invocations never overlap, while
//! different regions refresh concurrently and independently. Out-of-band
//! refresh requests go through the same loop, so they are serialized with the
//! scheduled ticks of that region.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::model::ViewRegion;

type TaskFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// A zero-argument async refresh task for one view region.
///
/// The task owns its error handling: a failed fetch is expected to be logged
/// inside the task, not returned.
pub struct PollTask {
    region: ViewRegion,
    run: TaskFn,
}

impl PollTask {
    pub fn new<F, Fut>(region: impl Into<ViewRegion>, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            region: region.into(),
            run: Arc::new(move || f().boxed()),
        }
    }

    pub fn region(&self) -> ViewRegion {
        self.region
    }
}

/// Requests immediate, out-of-band refreshes of a region.
#[derive(Clone, Default)]
pub struct RefreshHandle {
    kicks: Arc<HashMap<ViewRegion, Arc<Notify>>>,
}

impl RefreshHandle {
    pub fn for_regions(regions: impl IntoIterator<Item = ViewRegion>) -> Self {
        let kicks = regions
            .into_iter()
            .map(|r| (r, Arc::new(Notify::new())))
            .collect();
        Self { kicks: Arc::new(kicks) }
    }

    /// Wake the region's task now. A request made while the task is running
    /// queues exactly one follow-up run. Returns false for unknown regions.
    pub fn request(&self, region: impl Into<ViewRegion>) -> bool {
        let region = region.into();
        match self.kicks.get(&region) {
            Some(kick) => {
                debug!(%region, "out-of-band refresh requested");
                kick.notify_one();
                true
            }
            None => false,
        }
    }

    fn kick(&self, region: ViewRegion) -> Arc<Notify> {
        match self.kicks.get(&region) {
            Some(kick) => Arc::clone(kick),
            None => Arc::new(Notify::new()),
        }
    }
}

struct Shared {
    stopped: Mutex<bool>,
    cancel: CancellationToken,
}

impl Shared {
    /// Start one invocation unless the scheduler has been stopped. Holding the
    /// lock while the future is created means no invocation can begin once
    /// `stop` has returned.
    fn begin(&self, run: &TaskFn) -> Option<BoxFuture<'static, ()>> {
        let stopped = self.stopped.lock().unwrap_or_else(|p| p.into_inner());
        if *stopped {
            None
        } else {
            Some(run())
        }
    }
}

/// Runs a set of refresh tasks once immediately and then every `interval`.
pub struct PollScheduler {
    shared: Arc<Shared>,
    refresh: RefreshHandle,
    loops: Vec<JoinHandle<()>>,
}

impl PollScheduler {
    /// Start polling. Must be called from within a tokio runtime.
    pub fn start(interval: Duration, tasks: Vec<PollTask>) -> Self {
        let refresh = RefreshHandle::for_regions(tasks.iter().map(PollTask::region));
        Self::start_with(interval, tasks, refresh, CancellationToken::new())
    }

    /// Start polling with a refresh handle and teardown token created ahead of
    /// the tasks, for collaborators that must exist before the tasks are
    /// built. `stop()` cancels `teardown`.
    pub fn start_with(
        interval: Duration,
        tasks: Vec<PollTask>,
        refresh: RefreshHandle,
        teardown: CancellationToken,
    ) -> Self {
        let shared = Arc::new(Shared {
            stopped: Mutex::new(false),
            cancel: teardown,
        });

        info!(interval_ms = interval.as_millis() as u64, tasks = tasks.len(), "poll scheduler started");

        let loops = tasks
            .into_iter()
            .map(|task| {
                let kick = refresh.kick(task.region);
                tokio::spawn(run_loop(task, interval, kick, Arc::clone(&shared)))
            })
            .collect();

        Self { shared, refresh, loops }
    }

    pub fn refresh_handle(&self) -> RefreshHandle {
        self.refresh.clone()
    }

    /// Token cancelled when the scheduler stops. Tasks use it to discard
    /// results that resolve after teardown.
    pub fn teardown_token(&self) -> CancellationToken {
        self.shared.cancel.child_token()
    }

    pub fn is_running(&self) -> bool {
        !self.shared.cancel.is_cancelled()
    }

    /// Cancel the timer. No invocation starts after this returns; invocations
    /// already in flight run to completion.
    pub fn stop(&self) {
        {
            let mut stopped = self.shared.stopped.lock().unwrap_or_else(|p| p.into_inner());
            if *stopped {
                return;
            }
            *stopped = true;
        }
        self.shared.cancel.cancel();
        info!("poll scheduler stopped");
    }

    /// Stop and wait until every in-flight invocation has settled.
    pub async fn shutdown(&mut self) {
        self.stop();
        for handle in self.loops.drain(..) {
            let _ = handle.await;
        }
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_loop(task: PollTask, interval: Duration, kick: Arc<Notify>, shared: Arc<Shared>) {
    let region = task.region;
    let mut ticker = tokio::time::interval(interval);
    // Keep the cadence fixed regardless of how long a refresh takes.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => break,
            _ = ticker.tick() => {}
            _ = kick.notified() => {}
        }

        let Some(invocation) = shared.begin(&task.run) else { break };
        if AssertUnwindSafe(invocation).catch_unwind().await.is_err() {
            error!(%region, "refresh task panicked; will retry next tick");
        }
    }

    debug!(%region, "poll loop exited");
}
