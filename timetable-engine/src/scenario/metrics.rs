//! Per-scenario metrics and baseline comparison.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::detect::Conflict;
use crate::domain::TrainId;
use crate::timetable::Timetable;

/// How a scenario's detect/repair cycle ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScenarioOutcome {
    /// No conflicts were found; nothing was changed.
    AlreadyFeasible,
    /// Every conflict was repaired.
    Repaired,
    /// Repair gave up; metrics describe the input timetable.
    Infeasible,
    /// The scenario's input was rejected.
    Failed { message: String },
    Cancelled,
}

impl ScenarioOutcome {
    /// True if detection ran and the metrics describe a timetable.
    pub fn is_measured(&self) -> bool {
        matches!(
            self,
            ScenarioOutcome::AlreadyFeasible
                | ScenarioOutcome::Repaired
                | ScenarioOutcome::Infeasible
        )
    }
}

impl fmt::Display for ScenarioOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioOutcome::AlreadyFeasible => f.write_str("already feasible"),
            ScenarioOutcome::Repaired => f.write_str("repaired"),
            ScenarioOutcome::Infeasible => f.write_str("infeasible"),
            ScenarioOutcome::Failed { message } => write!(f, "failed: {message}"),
            ScenarioOutcome::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Metrics for one evaluated scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioMetrics {
    pub name: String,
    pub outcome: ScenarioOutcome,
    /// Share of events whose deviation is within their lateness bound.
    pub on_time_ratio: f64,
    /// Mean lateness over all events, early events counting as zero.
    pub average_delay_sec: f64,
    pub max_delay_sec: i64,
    /// Trains none of whose events is named by a residual conflict.
    pub throughput: usize,
    pub conflicts_detected: usize,
    pub conflicts_resolved: usize,
    pub residual_conflicts: usize,
    /// Events moved to another platform relative to the input.
    pub platform_changes: usize,
    /// Events whose time differs from the input.
    pub retimed_events: usize,
    /// Occupancies excluded for platform length in the measured timetable.
    pub validation_warnings: usize,
}

/// Signed differences between a scenario and the baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsDelta {
    pub name: String,
    pub on_time_ratio: f64,
    pub average_delay_sec: f64,
    pub max_delay_sec: i64,
    pub throughput: i64,
    pub conflicts_detected: i64,
    pub conflicts_resolved: i64,
    pub residual_conflicts: i64,
    pub platform_changes: i64,
    pub retimed_events: i64,
}

/// What the evaluator knows after running one scenario.
pub(super) struct Measurement<'a> {
    pub outcome: ScenarioOutcome,
    pub input: &'a Timetable,
    pub measured: &'a Timetable,
    pub detected: &'a [Conflict],
    pub residual: &'a [Conflict],
    pub validation_warnings: usize,
}

impl ScenarioMetrics {
    pub(super) fn measure(name: &str, m: Measurement<'_>) -> Self {
        let mut events = 0usize;
        let mut on_time = 0usize;
        let mut total_delay = 0i64;
        let mut max_delay = 0i64;
        let mut platform_changes = 0usize;
        let mut retimed_events = 0usize;

        for (train, event) in m.measured.iter_events() {
            events += 1;
            if event.is_on_time() {
                on_time += 1;
            }
            let delay = event.deviation_sec().max(0);
            total_delay += delay;
            max_delay = max_delay.max(delay);

            if let Some(original) = m.input.event(train, &event.id) {
                if original.platform != event.platform {
                    platform_changes += 1;
                }
                if original.time() != event.time() {
                    retimed_events += 1;
                }
            }
        }

        let blocked: HashSet<&TrainId> = m
            .residual
            .iter()
            .flat_map(|c| c.involved.iter().map(|e| &e.train))
            .collect();
        let throughput = m
            .measured
            .scheduled_trains()
            .filter(|train| !blocked.contains(train))
            .count();

        let (on_time_ratio, average_delay_sec) = if events == 0 {
            (1.0, 0.0)
        } else {
            (
                on_time as f64 / events as f64,
                total_delay as f64 / events as f64,
            )
        };

        Self {
            name: name.to_string(),
            outcome: m.outcome,
            on_time_ratio,
            average_delay_sec,
            max_delay_sec: max_delay,
            throughput,
            conflicts_detected: m.detected.len(),
            conflicts_resolved: m.detected.len().saturating_sub(m.residual.len()),
            residual_conflicts: m.residual.len(),
            platform_changes,
            retimed_events,
            validation_warnings: m.validation_warnings,
        }
    }

    /// Metrics for a scenario that never got as far as detection.
    pub fn unmeasured(name: &str, outcome: ScenarioOutcome) -> Self {
        Self {
            name: name.to_string(),
            outcome,
            on_time_ratio: 0.0,
            average_delay_sec: 0.0,
            max_delay_sec: 0,
            throughput: 0,
            conflicts_detected: 0,
            conflicts_resolved: 0,
            residual_conflicts: 0,
            platform_changes: 0,
            retimed_events: 0,
            validation_warnings: 0,
        }
    }

    /// Signed difference `self - baseline`, or `None` if either side
    /// never got measured.
    pub fn delta_from(&self, baseline: &ScenarioMetrics) -> Option<MetricsDelta> {
        if !self.outcome.is_measured() || !baseline.outcome.is_measured() {
            return None;
        }
        let diff = |a: usize, b: usize| a as i64 - b as i64;
        Some(MetricsDelta {
            name: self.name.clone(),
            on_time_ratio: self.on_time_ratio - baseline.on_time_ratio,
            average_delay_sec: self.average_delay_sec - baseline.average_delay_sec,
            max_delay_sec: self.max_delay_sec - baseline.max_delay_sec,
            throughput: diff(self.throughput, baseline.throughput),
            conflicts_detected: diff(self.conflicts_detected, baseline.conflicts_detected),
            conflicts_resolved: diff(self.conflicts_resolved, baseline.conflicts_resolved),
            residual_conflicts: diff(self.residual_conflicts, baseline.residual_conflicts),
            platform_changes: diff(self.platform_changes, baseline.platform_changes),
            retimed_events: diff(self.retimed_events, baseline.retimed_events),
        })
    }
}
