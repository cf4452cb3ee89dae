// SPDX-FileCopyrightText: 2026 Cipherplane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operational snapshot aggregation for the Cipherplane control plane.
//!
//! This crate provides:
//! - **Snapshot aggregator**: Read-only composition of uptime, throughput
//!   counters, key-rotation health, and recent ledger errors
//! - **Load sampling**: Host CPU and memory figures via `sysinfo`, behind a
//!   trait so tests can inject fixed values

pub mod load;
pub mod snapshot;

pub use load::{FixedSampler, LoadSampler, SysinfoSampler, SystemLoad};
pub use snapshot::{KeyStatus, MonitorAggregator, MonitorSnapshot, RecentError, ServiceStatus};
