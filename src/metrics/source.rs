/// Snapshot sources
///
/// The sampler only sees the `SnapshotSource` trait. `SystemSnapshotSource`
/// reads the local host through `sysinfo`; tests plug in scripted sources.
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use sysinfo::{Disks, System};

use super::snapshot::{
    percent, CpuStats, DiskMount, DiskStats, HostInfo, LoadAverage, MemoryStats, MetricsSnapshot,
};
use crate::errors::SourceError;

/// Produces one metrics snapshot per call
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Human-readable name for logs
    fn name(&self) -> &'static str;

    async fn snapshot(&self) -> Result<MetricsSnapshot, SourceError>;
}

struct Sensors {
    system: System,
    disks: Disks,
}

/// Local host metrics via `sysinfo`
///
/// Keeps one `System` across calls: CPU usage is computed from the delta
/// between two refreshes, so the first snapshot after construction reports
/// the usage since the priming refresh.
pub struct SystemSnapshotSource {
    sensors: Arc<Mutex<Sensors>>,
    include_disks: bool,
}

impl SystemSnapshotSource {
    pub fn new(include_disks: bool) -> Self {
        let mut system = System::new();
        system.refresh_cpu();
        system.refresh_memory();

        let disks = if include_disks {
            Disks::new_with_refreshed_list()
        } else {
            Disks::new()
        };

        Self {
            sensors: Arc::new(Mutex::new(Sensors { system, disks })),
            include_disks,
        }
    }
}

#[async_trait]
impl SnapshotSource for SystemSnapshotSource {
    fn name(&self) -> &'static str {
        "sysinfo"
    }

    async fn snapshot(&self) -> Result<MetricsSnapshot, SourceError> {
        let sensors = Arc::clone(&self.sensors);
        let include_disks = self.include_disks;

        // sysinfo reads /proc and friends synchronously
        tokio::task::spawn_blocking(move || collect(&mut sensors.lock(), include_disks))
            .await
            .map_err(|e| SourceError::Worker(e.to_string()))?
    }
}

fn collect(sensors: &mut Sensors, include_disks: bool) -> Result<MetricsSnapshot, SourceError> {
    let system = &mut sensors.system;
    system.refresh_cpu();
    system.refresh_memory();

    let cores = system.cpus().len();
    if cores == 0 {
        return Err(SourceError::Collection(
            "no CPUs reported by the operating system".to_string(),
        ));
    }

    let load = System::load_average();
    let cpu = CpuStats {
        usage_percent: system.global_cpu_info().cpu_usage(),
        cores,
        load_average: LoadAverage {
            one: load.one,
            five: load.five,
            fifteen: load.fifteen,
        },
    };

    let total_memory = system.total_memory();
    let used_memory = system.used_memory();
    let memory = MemoryStats {
        total_bytes: total_memory,
        used_bytes: used_memory,
        usage_percent: percent(used_memory, total_memory),
        swap_total_bytes: system.total_swap(),
        swap_used_bytes: system.used_swap(),
    };

    let disk = if include_disks {
        sensors.disks.refresh_list();
        DiskStats::from_mounts(
            sensors
                .disks
                .list()
                .iter()
                .map(|d| DiskMount {
                    mount_point: d.mount_point().display().to_string(),
                    file_system: d.file_system().to_string_lossy().into_owned(),
                    total_bytes: d.total_space(),
                    available_bytes: d.available_space(),
                })
                .collect(),
        )
    } else {
        DiskStats::default()
    };

    let host = HostInfo {
        hostname: System::host_name(),
        os: System::long_os_version(),
        kernel: System::kernel_version(),
        uptime_secs: System::uptime(),
    };

    Ok(MetricsSnapshot {
        cpu,
        memory,
        disk,
        host,
        timestamp: chrono::Utc::now().timestamp_millis(),
    })
}
