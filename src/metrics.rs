//! Per-phase metrics and the on-demand aggregate view.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::phase::Phase;
use crate::protocol::WireMetrics;

/// Metrics recorded for one phase completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PhaseMetrics {
    /// Absent when the agent did not report it.
    pub avg_response_time_seconds: Option<f64>,
    pub total_tokens: u64,
    pub iterations: u32,
    pub total_time_seconds: f64,
    pub tokens_per_iteration: Option<f64>,
}

impl From<&WireMetrics> for PhaseMetrics {
    fn from(wire: &WireMetrics) -> Self {
        Self {
            avg_response_time_seconds: wire.avg_response_time,
            total_tokens: wire.total_tokens.unwrap_or(0),
            iterations: wire.iterations.unwrap_or(0),
            total_time_seconds: wire.total_time.unwrap_or(0.0),
            tokens_per_iteration: wire.tokens_per_iteration,
        }
    }
}

/// Summary across every recorded phase. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateMetrics {
    /// Mean of the phases' non-zero average response times; `None` when no
    /// phase reported one.
    pub avg_response_time_seconds: Option<f64>,
    pub total_tokens: u64,
    pub iterations: u64,
    pub total_time_seconds: f64,
    pub phase_count: usize,
}

/// Per-phase metrics keyed by phase, iterated in precedence order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsAggregator {
    phases: BTreeMap<Phase, PhaseMetrics>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `metrics` under `phase`, replacing any earlier run.
    pub fn record(&mut self, phase: Phase, metrics: PhaseMetrics) {
        self.phases.insert(phase, metrics);
    }

    pub fn get(&self, phase: Phase) -> Option<&PhaseMetrics> {
        self.phases.get(&phase)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Phase, &PhaseMetrics)> {
        self.phases.iter().map(|(phase, metrics)| (*phase, metrics))
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn clear(&mut self) {
        self.phases.clear();
    }

    /// Sum tokens, iterations and time; average the response times.
    ///
    /// A phase whose average response time is absent or zero is left out of
    /// the mean's denominator but still counts toward the sums.
    pub fn aggregate(&self) -> Option<AggregateMetrics> {
        if self.phases.is_empty() {
            return None;
        }

        let mut total_tokens = 0u64;
        let mut iterations = 0u64;
        let mut total_time = 0.0f64;
        let mut avg_sum = 0.0f64;
        let mut avg_count = 0usize;

        for metrics in self.phases.values() {
            // Counts come straight off the wire.
            total_tokens = total_tokens.saturating_add(metrics.total_tokens);
            iterations = iterations.saturating_add(u64::from(metrics.iterations));
            total_time += metrics.total_time_seconds;
            if let Some(avg) = metrics.avg_response_time_seconds.filter(|a| *a != 0.0) {
                avg_sum += avg;
                avg_count += 1;
            }
        }

        Some(AggregateMetrics {
            avg_response_time_seconds: (avg_count > 0).then(|| avg_sum / avg_count as f64),
            total_tokens,
            iterations,
            total_time_seconds: total_time,
            phase_count: self.phases.len(),
        })
    }
}
