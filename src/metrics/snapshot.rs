/// Host metrics snapshot - the `systemStats` payload
///
/// Field names are camelCase on the wire. Every field defaults when absent
/// so observers tolerate producers that add or drop sections.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub cpu: CpuStats,
    pub memory: MemoryStats,
    pub disk: DiskStats,
    pub host: HostInfo,
    /// Server timestamp (unix milliseconds)
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CpuStats {
    /// Global CPU usage across all cores (0-100)
    pub usage_percent: f32,
    pub cores: usize,
    pub load_average: LoadAverage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MemoryStats {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub usage_percent: f64,
    pub swap_total_bytes: u64,
    pub swap_used_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiskStats {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub usage_percent: f64,
    pub mounts: Vec<DiskMount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiskMount {
    pub mount_point: String,
    pub file_system: String,
    pub total_bytes: u64,
    pub available_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HostInfo {
    pub hostname: Option<String>,
    pub os: Option<String>,
    pub kernel: Option<String>,
    pub uptime_secs: u64,
}

/// Percentage helper that never divides by zero
pub fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 / total as f64 * 100.0
    }
}

impl DiskStats {
    /// Aggregate mount list into totals
    pub fn from_mounts(mounts: Vec<DiskMount>) -> Self {
        let total_bytes: u64 = mounts.iter().map(|m| m.total_bytes).sum();
        let available: u64 = mounts.iter().map(|m| m.available_bytes).sum();
        let used_bytes = total_bytes.saturating_sub(available);

        Self {
            total_bytes,
            used_bytes,
            usage_percent: percent(used_bytes, total_bytes),
            mounts,
        }
    }
}
