use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sysinfo::{Disks, System};

use crate::error::FetchError;
use crate::model::{ServerStat, ratio_percent};

use super::DataSource;

struct HostProbe {
    sys: System,
    disks: Disks,
}

/// Server resource usage of the local host.
///
/// CPU usage is measured between consecutive refreshes, so the first fetch
/// after construction may report 0%.
pub struct HostStats {
    probe: Arc<Mutex<HostProbe>>,
}

impl HostStats {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        sys.refresh_memory();
        let disks = Disks::new_with_refreshed_list();

        Self {
            probe: Arc::new(Mutex::new(HostProbe { sys, disks })),
        }
    }
}

impl Default for HostStats {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataSource for HostStats {
    type Output = ServerStat;

    async fn fetch(&self) -> Result<ServerStat, FetchError> {
        let probe = Arc::clone(&self.probe);
        tokio::task::spawn_blocking(move || {
            let mut probe = probe
                .lock()
                .map_err(|_| FetchError::Backend("host probe lock poisoned".to_string()))?;
            probe.sys.refresh_cpu_usage();
            probe.sys.refresh_memory();
            probe.disks.refresh(true);

            let cpu = probe.sys.global_cpu_usage() as f64;
            let memory = ratio_percent(probe.sys.used_memory(), probe.sys.total_memory());
            let (used, total) = disk_usage(
                probe.disks.iter().map(|d| (d.mount_point(), d.total_space(), d.available_space())),
            );

            Ok(ServerStat::from_percentages(cpu, memory, ratio_percent(used, total)))
        })
        .await
        .map_err(|_| FetchError::Aborted)?
    }
}

/// Used and total bytes of the root filesystem, or of all disks together
/// when no disk is mounted at `/`.
fn disk_usage<'a>(disks: impl Iterator<Item = (&'a Path, u64, u64)>) -> (u64, u64) {
    let mut all = (0u64, 0u64);
    for (mount, total, available) in disks {
        let used = total.saturating_sub(available);
        if mount == Path::new("/") {
            return (used, total);
        }
        all.0 += used;
        all.1 += total;
    }
    all
}
