use serde::{Deserialize, Serialize};

/// Server resource usage, each value a percentage in [0, 100].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStat {
    pub cpu: u8,
    pub memory: u8,
    pub disk: u8,
}

impl ServerStat {
    /// Build from raw percentages, rounding and clamping into [0, 100].
    pub fn from_percentages(cpu: f64, memory: f64, disk: f64) -> Self {
        Self {
            cpu: clamp_percent(cpu),
            memory: clamp_percent(memory),
            disk: clamp_percent(disk),
        }
    }
}

fn clamp_percent(value: f64) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}

/// Share of `used` over `total` as a percentage; 0 when `total` is 0.
pub(crate) fn ratio_percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 / total as f64 * 100.0
    }
}
