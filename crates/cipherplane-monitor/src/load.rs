// SPDX-FileCopyrightText: 2026 Cipherplane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Host load sampling.
//!
//! The snapshot aggregator treats load figures as pass-through inputs: it
//! asks a [`LoadSampler`] and embeds whatever comes back. `SysinfoSampler`
//! is the production implementation; `FixedSampler` serves tests and
//! environments without host metrics.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

/// Point-in-time host resource figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemLoad {
    /// Whole-host CPU utilization, 0.0 to 100.0.
    pub cpu_percent: f64,
    /// Used physical memory as a share of total, 0.0 to 100.0.
    pub memory_percent: f64,
    /// Open database connections.
    pub db_connections: i64,
}

/// Source of [`SystemLoad`] figures for the snapshot aggregator.
pub trait LoadSampler: Send + Sync {
    fn sample(&self) -> SystemLoad;
}

/// Samples CPU and memory from the host via `sysinfo`.
///
/// CPU utilization is computed from the delta between consecutive refreshes,
/// so the first sample after construction reads 0.0. Periodic polling (the
/// monitor endpoint) converges within one poll interval.
pub struct SysinfoSampler {
    system: Mutex<System>,
}

impl SysinfoSampler {
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::nothing()
                .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
                .with_memory(MemoryRefreshKind::nothing().with_ram()),
        );
        Self {
            system: Mutex::new(system),
        }
    }
}

impl Default for SysinfoSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadSampler for SysinfoSampler {
    fn sample(&self) -> SystemLoad {
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        system.refresh_cpu_usage();
        system.refresh_memory();

        let total = system.total_memory();
        let memory_percent = if total == 0 {
            0.0
        } else {
            system.used_memory() as f64 / total as f64 * 100.0
        };

        SystemLoad {
            cpu_percent: f64::from(system.global_cpu_usage()),
            memory_percent,
            // tokio-rusqlite serializes all access through one connection.
            db_connections: 1,
        }
    }
}

/// Returns the same figures on every sample.
#[derive(Debug, Clone)]
pub struct FixedSampler(pub SystemLoad);

impl LoadSampler for FixedSampler {
    fn sample(&self) -> SystemLoad {
        self.0.clone()
    }
}
