use async_trait::async_trait;
use overseer_core::OverseerResult;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use sysinfo::{CpuRefreshKind, LoadAvg, MemoryRefreshKind, RefreshKind, System};

/// One reading from a [`TelemetrySource`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub health_score: f64,
    pub system_load: f64,
    #[serde(default)]
    pub resource_usage: HashMap<String, f64>,
    #[serde(default)]
    pub performance_metrics: HashMap<String, f64>,
}

/// Source of health and load measurements for the monitoring loop.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn sample(&self) -> OverseerResult<TelemetrySample>;
}

/// Host load and memory figures, as read from the operating system.
#[derive(Debug, Clone, Copy, PartialEq)]
struct HostReading {
    load1: f64,
    load5: f64,
    load15: f64,
    cpus: usize,
    total_bytes: u64,
    available_bytes: u64,
}

impl HostReading {
    /// `system_load` is the one-minute load average divided by the CPU
    /// count, capped at 1. Health drops by half of the worse of load and
    /// memory pressure.
    fn into_sample(self) -> TelemetrySample {
        let system_load = (self.load1 / self.cpus.max(1) as f64).clamp(0.0, 1.0);
        let memory = if self.total_bytes == 0 {
            0.0
        } else {
            (1.0 - self.available_bytes as f64 / self.total_bytes as f64).clamp(0.0, 1.0)
        };
        let health_score = (1.0 - 0.5 * system_load.max(memory)).clamp(0.0, 1.0);

        TelemetrySample {
            health_score,
            system_load,
            resource_usage: HashMap::from([
                ("cpu".to_string(), system_load),
                ("memory".to_string(), memory),
            ]),
            performance_metrics: HashMap::from([
                ("load_1m".to_string(), self.load1),
                ("load_5m".to_string(), self.load5),
                ("load_15m".to_string(), self.load15),
                ("memory_total_bytes".to_string(), self.total_bytes as f64),
                ("memory_available_bytes".to_string(), self.available_bytes as f64),
            ]),
        }
    }
}

/// Samples the local host through `sysinfo`.
///
/// Platforms without a load average report zero load, so health then
/// follows memory pressure alone.
pub struct SysinfoTelemetry {
    system: Mutex<System>,
    cpus: usize,
}

impl SysinfoTelemetry {
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::new()
                .with_cpu(CpuRefreshKind::new())
                .with_memory(MemoryRefreshKind::new().with_ram()),
        );
        let cpus = system.cpus().len().max(1);
        Self {
            system: Mutex::new(system),
            cpus,
        }
    }

    fn read(&self) -> HostReading {
        let LoadAvg {
            one,
            five,
            fifteen,
        } = System::load_average();
        let mut system = self.system.lock();
        system.refresh_memory_specifics(MemoryRefreshKind::new().with_ram());
        HostReading {
            load1: one,
            load5: five,
            load15: fifteen,
            cpus: self.cpus,
            total_bytes: system.total_memory(),
            available_bytes: system.available_memory(),
        }
    }
}

impl Default for SysinfoTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TelemetrySource for SysinfoTelemetry {
    async fn sample(&self) -> OverseerResult<TelemetrySample> {
        Ok(self.read().into_sample())
    }
}
