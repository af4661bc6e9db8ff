//! Progress tracking: bounded event log and aggregate run metrics.
//!
//! The tracker owns the append-only event log (ring buffer) and the
//! aggregate counters observers read: completion fraction, average node
//! duration, estimated time remaining, and a best-effort peak-memory sample.
//! It receives every orchestration event as an [`EventSink`]; terminal node
//! transitions arrive through [`ProgressTracker::node_finished`] so metrics
//! do not depend on parsing event payloads.

use std::collections::VecDeque;
use std::sync::Mutex;

use event_wire::EventSink;
use serde::Serialize;
use serde_json::Value;

/// Aggregate metrics at one point in time.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressMetrics {
    pub total_nodes: usize,
    pub total_steps: usize,
    pub level_count: usize,
    pub completed: usize,
    pub failed: usize,
    pub average_node_duration_ms: f64,
    pub estimated_time_remaining_ms: u64,
    pub progress_fraction: f64,
    pub peak_memory_kb: Option<u64>,
}

struct Inner {
    log: VecDeque<Value>,
    total_nodes: usize,
    total_steps: usize,
    level_count: usize,
    completed: usize,
    failed: usize,
    duration_sum_ms: u64,
    duration_count: u64,
    peak_memory_kb: Option<u64>,
}

/// Event log plus aggregate metrics for one workflow run.
pub struct ProgressTracker {
    cap: usize,
    inner: Mutex<Inner>,
}

impl ProgressTracker {
    /// Ring-buffer capacity for the event log.
    pub const DEFAULT_LOG_CAP: usize = 1024;

    pub fn new() -> Self {
        Self::with_log_cap(Self::DEFAULT_LOG_CAP)
    }

    pub fn with_log_cap(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            inner: Mutex::new(Inner {
                log: VecDeque::new(),
                total_nodes: 0,
                total_steps: 0,
                level_count: 0,
                completed: 0,
                failed: 0,
                duration_sum_ms: 0,
                duration_count: 0,
                peak_memory_kb: None,
            }),
        }
    }

    /// Fixes the run totals before the first level starts.
    pub fn begin(&self, total_nodes: usize, total_steps: usize, level_count: usize) {
        let mut inner = self.inner.lock().expect("progress lock");
        inner.total_nodes = total_nodes;
        inner.total_steps = total_steps;
        inner.level_count = level_count;
        inner.peak_memory_kb = sample_peak_rss_kb();
    }

    /// Records one terminal node transition and refreshes the memory sample.
    pub fn node_finished(&self, duration_ms: u64, failed: bool) {
        let mut inner = self.inner.lock().expect("progress lock");
        if failed {
            inner.failed += 1;
        } else {
            inner.completed += 1;
        }
        inner.duration_sum_ms += duration_ms;
        inner.duration_count += 1;
        if let Some(sample) = sample_peak_rss_kb() {
            inner.peak_memory_kb = Some(inner.peak_memory_kb.map_or(sample, |p| p.max(sample)));
        }
    }

    /// (completed + failed) / total; 0 when totals are unknown.
    pub fn progress_fraction(&self) -> f64 {
        let inner = self.inner.lock().expect("progress lock");
        if inner.total_nodes == 0 {
            return 0.0;
        }
        (inner.completed + inner.failed) as f64 / inner.total_nodes as f64
    }

    /// Mean duration of finished nodes; 0 when none finished.
    pub fn average_node_duration_ms(&self) -> f64 {
        let inner = self.inner.lock().expect("progress lock");
        if inner.duration_count == 0 {
            return 0.0;
        }
        inner.duration_sum_ms as f64 / inner.duration_count as f64
    }

    /// average × (total − completed); 0 when no data.
    pub fn estimated_time_remaining_ms(&self) -> u64 {
        let (avg, remaining) = {
            let inner = self.inner.lock().expect("progress lock");
            if inner.duration_count == 0 || inner.total_nodes == 0 {
                return 0;
            }
            (
                inner.duration_sum_ms as f64 / inner.duration_count as f64,
                inner.total_nodes.saturating_sub(inner.completed),
            )
        };
        (avg * remaining as f64) as u64
    }

    /// Copy of the event log, oldest first.
    pub fn events(&self) -> Vec<Value> {
        self.inner
            .lock()
            .map(|inner| inner.log.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn metrics(&self) -> ProgressMetrics {
        let inner = self.inner.lock().expect("progress lock");
        let average = if inner.duration_count == 0 {
            0.0
        } else {
            inner.duration_sum_ms as f64 / inner.duration_count as f64
        };
        let fraction = if inner.total_nodes == 0 {
            0.0
        } else {
            (inner.completed + inner.failed) as f64 / inner.total_nodes as f64
        };
        ProgressMetrics {
            total_nodes: inner.total_nodes,
            total_steps: inner.total_steps,
            level_count: inner.level_count,
            completed: inner.completed,
            failed: inner.failed,
            average_node_duration_ms: average,
            estimated_time_remaining_ms: (average
                * inner.total_nodes.saturating_sub(inner.completed) as f64)
                as u64,
            progress_fraction: fraction,
            peak_memory_kb: inner.peak_memory_kb,
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for ProgressTracker {
    fn emit(&self, event: Value) {
        let mut inner = self.inner.lock().expect("progress lock");
        if inner.log.len() == self.cap {
            inner.log.pop_front();
        }
        inner.log.push_back(event);
    }
}

/// Best-effort peak resident set size in KiB. Linux only; other platforms
/// report `None`.
#[cfg(target_os = "linux")]
fn sample_peak_rss_kb() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    status
        .lines()
        .find(|l| l.starts_with("VmHWM:"))?
        .split_whitespace()
        .nth(1)?
        .parse()
        .ok()
}

#[cfg(not(target_os = "linux"))]
fn sample_peak_rss_kb() -> Option<u64> {
    None
}
