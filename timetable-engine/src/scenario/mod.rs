//! Scenario evaluation.
//!
//! A scenario is raw input: trains, event records and constraints. Each one
//! is validated, detected and repaired on its own, so a malformed variant
//! fails alone and never takes its siblings down with it.

mod metrics;

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::constraints::{Constraint, ConstraintKind, ConstraintRegistry};
use crate::detect::ConflictDetector;
use crate::domain::Train;
use crate::repair::{CancelFlag, RepairConfig, RepairError, Repairer};
use crate::timetable::{DwellPolicy, EventRecord, Timetable};
use crate::topology::TopologyGraph;

use metrics::Measurement;
pub use metrics::{MetricsDelta, ScenarioMetrics, ScenarioOutcome};

/// A named timetable and constraint set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub trains: Vec<Train>,
    pub events: Vec<EventRecord>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl Scenario {
    pub fn new(
        name: impl Into<String>,
        trains: Vec<Train>,
        events: Vec<EventRecord>,
        constraints: Vec<Constraint>,
    ) -> Self {
        Self {
            name: name.into(),
            trains,
            events,
            constraints,
        }
    }

    /// A copy of this scenario under a new name, ready for overrides.
    pub fn variant(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn without_constraints_of(mut self, kind: ConstraintKind) -> Self {
        self.constraints.retain(|c| c.kind() != kind);
        self
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatorConfig {
    /// Scenarios evaluated concurrently.
    pub max_parallel: usize,
}

impl EvaluatorConfig {
    pub fn new(max_parallel: usize) -> Self {
        Self { max_parallel }
    }
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self { max_parallel: 4 }
    }
}

/// Runs detect and repair for scenarios over one shared topology.
///
/// Cheap to clone; clones share the topology and the cancel flag.
#[derive(Debug, Clone)]
pub struct ScenarioEvaluator {
    topology: Arc<TopologyGraph>,
    repair: RepairConfig,
    dwell: DwellPolicy,
    config: EvaluatorConfig,
    cancel: CancelFlag,
}

impl ScenarioEvaluator {
    pub fn new(
        topology: Arc<TopologyGraph>,
        repair: RepairConfig,
        dwell: DwellPolicy,
        config: EvaluatorConfig,
    ) -> Self {
        Self {
            topology,
            repair,
            dwell,
            config,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Evaluate one scenario on the calling thread.
    pub fn evaluate(&self, scenario: &Scenario) -> ScenarioMetrics {
        if self.cancel.is_cancelled() {
            return ScenarioMetrics::unmeasured(&scenario.name, ScenarioOutcome::Cancelled);
        }

        let timetable = match Timetable::build(
            &self.topology,
            scenario.trains.clone(),
            scenario.events.clone(),
            &self.dwell,
        ) {
            Ok(timetable) => timetable,
            Err(e) => return self.failed(scenario, e.to_string()),
        };
        let registry = match ConstraintRegistry::new(&self.topology, scenario.constraints.clone()) {
            Ok(registry) => registry,
            Err(e) => return self.failed(scenario, e.to_string()),
        };

        let detector = ConflictDetector::new(&self.topology, &registry);
        let detected = detector.detect(&timetable);
        let input_warnings = timetable.occupancy_intervals(&self.topology).rejected.len();

        let metrics = if detected.is_empty() {
            ScenarioMetrics::measure(
                &scenario.name,
                Measurement {
                    outcome: ScenarioOutcome::AlreadyFeasible,
                    input: &timetable,
                    measured: &timetable,
                    detected: &detected,
                    residual: &[],
                    validation_warnings: input_warnings,
                },
            )
        } else {
            let repairer = Repairer::new(&self.topology, &registry, self.repair.clone())
                .with_cancel(self.cancel.clone());
            match repairer.repair(&timetable) {
                Ok(outcome) => ScenarioMetrics::measure(
                    &scenario.name,
                    Measurement {
                        outcome: ScenarioOutcome::Repaired,
                        input: &timetable,
                        measured: &outcome.timetable,
                        detected: &detected,
                        residual: &outcome.residual,
                        validation_warnings: outcome
                            .timetable
                            .occupancy_intervals(&self.topology)
                            .rejected
                            .len(),
                    },
                ),
                Err(RepairError::OptimizationInfeasible { residual, .. }) => {
                    ScenarioMetrics::measure(
                        &scenario.name,
                        Measurement {
                            outcome: ScenarioOutcome::Infeasible,
                            input: &timetable,
                            measured: &timetable,
                            detected: &detected,
                            residual: &residual,
                            validation_warnings: input_warnings,
                        },
                    )
                }
                Err(RepairError::Cancelled) => {
                    ScenarioMetrics::unmeasured(&scenario.name, ScenarioOutcome::Cancelled)
                }
            }
        };

        info!(
            scenario = %scenario.name,
            outcome = %metrics.outcome,
            detected = metrics.conflicts_detected,
            resolved = metrics.conflicts_resolved,
            "Scenario evaluated"
        );
        metrics
    }

    /// Evaluate the baseline and every variant, `max_parallel` at a time.
    ///
    /// Results come back in input order, baseline first.
    pub async fn evaluate_all(
        &self,
        baseline: Scenario,
        variants: Vec<Scenario>,
    ) -> Vec<ScenarioMetrics> {
        let scenarios: Vec<Scenario> = std::iter::once(baseline).chain(variants).collect();
        let batch_size = self.config.max_parallel.max(1);
        let mut results = Vec::with_capacity(scenarios.len());

        for batch in scenarios.chunks(batch_size) {
            debug!(batch = batch.len(), "Evaluating scenario batch");

            let tasks: Vec<_> = batch
                .iter()
                .cloned()
                .map(|scenario| {
                    let evaluator = self.clone();
                    tokio::task::spawn_blocking(move || evaluator.evaluate(&scenario))
                })
                .collect();

            for (scenario, joined) in batch.iter().zip(join_all(tasks).await) {
                match joined {
                    Ok(metrics) => results.push(metrics),
                    Err(e) => {
                        warn!(scenario = %scenario.name, error = %e, "Scenario worker failed");
                        results.push(self.failed(scenario, format!("worker failed: {e}")));
                    }
                }
            }
        }

        results
    }

    fn failed(&self, scenario: &Scenario, message: String) -> ScenarioMetrics {
        warn!(scenario = %scenario.name, error = %message, "Scenario rejected");
        ScenarioMetrics::unmeasured(&scenario.name, ScenarioOutcome::Failed { message })
    }
}

/// Signed differences of every variant against the first (baseline) result.
///
/// Variants that failed or were cancelled have no entry, and neither does
/// anything when the baseline itself did not finish.
pub fn compare_to_baseline(results: &[ScenarioMetrics]) -> Vec<MetricsDelta> {
    let Some((baseline, variants)) = results.split_first() else {
        return Vec::new();
    };
    variants.iter().filter_map(|v| v.delta_from(baseline)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SegmentId;
    use crate::fixtures::{self, arrival, departure, time, train};

    fn evaluator(max_parallel: usize) -> ScenarioEvaluator {
        ScenarioEvaluator::new(
            Arc::new(fixtures::topology()),
            RepairConfig::default(),
            DwellPolicy::default(),
            EvaluatorConfig::new(max_parallel),
        )
    }

    fn overlap_scenario() -> Scenario {
        Scenario::new(
            "baseline",
            vec![train("A", 1, 200.0), train("B", 2, 200.0)],
            vec![
                arrival("A", "E1", "S2", "S2P1", "08:20", 300, 60, 300),
                arrival("B", "E1", "S2", "S2P1", "08:22", 300, 60, 300),
            ],
            Vec::new(),
        )
    }

    #[test]
    fn default_config() {
        assert_eq!(EvaluatorConfig::default().max_parallel, 4);
    }

    #[test]
    fn variant_overrides() {
        let base = Scenario::new(
            "seed",
            fixtures::seed_trains(),
            fixtures::seed_records(),
            fixtures::seed_constraints(),
        );
        let variant = base
            .variant("no-headway")
            .without_constraints_of(ConstraintKind::Headway);
        assert_eq!(variant.name, "no-headway");
        assert_eq!(variant.constraints.len(), 2);
        assert_eq!(base.constraints.len(), 3);

        let stricter = base.variant("closure").with_constraint(Constraint::Maintenance {
            segment_id: SegmentId::parse("seg_S2_S3").unwrap(),
            start: time("08:00"),
            end: time("08:30"),
            description: None,
        });
        assert_eq!(stricter.constraints.len(), 4);
    }

    #[test]
    fn repaired_scenario_metrics() {
        let metrics = evaluator(1).evaluate(&overlap_scenario());

        assert_eq!(metrics.outcome, ScenarioOutcome::Repaired);
        assert_eq!(metrics.conflicts_detected, 1);
        assert_eq!(metrics.conflicts_resolved, 1);
        assert_eq!(metrics.residual_conflicts, 0);
        assert_eq!(metrics.platform_changes, 1);
        assert_eq!(metrics.throughput, 2);
        assert_eq!(metrics.on_time_ratio, 1.0);
    }

    #[test]
    fn feasible_scenario_is_untouched() {
        let scenario = Scenario::new(
            "quiet",
            vec![train("A", 1, 200.0)],
            vec![
                departure("A", "E1", "S1", "S1P1", "08:00", 120, 60, 300),
                arrival("A", "E2", "S2", "S2P1", "08:20", 300, 60, 300),
            ],
            fixtures::seed_constraints(),
        );
        let metrics = evaluator(1).evaluate(&scenario);
        assert_eq!(metrics.outcome, ScenarioOutcome::AlreadyFeasible);
        assert_eq!(metrics.conflicts_detected, 0);
        assert_eq!(metrics.throughput, 1);
    }

    #[test]
    fn seed_scenario_is_infeasible() {
        let scenario = Scenario::new(
            "seed",
            fixtures::seed_trains(),
            fixtures::seed_records(),
            fixtures::seed_constraints(),
        );
        let metrics = evaluator(1).evaluate(&scenario);
        assert_eq!(metrics.outcome, ScenarioOutcome::Infeasible);
        assert_eq!(metrics.conflicts_detected, 3);
        assert_eq!(metrics.validation_warnings, 2);
        assert_eq!(metrics.residual_conflicts, 3);
        assert_eq!(metrics.conflicts_resolved, 0);
        // Every seed train is named by a residual conflict.
        assert_eq!(metrics.throughput, 0);
    }

    #[test]
    fn malformed_scenario_fails_alone() {
        let mut scenario = overlap_scenario();
        scenario.events.push(arrival("Z", "E1", "S2", "S2P1", "09:00", 300, 60, 300));
        let metrics = evaluator(1).evaluate(&scenario);
        assert!(matches!(metrics.outcome, ScenarioOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn results_keep_input_order() {
        let baseline = overlap_scenario();
        let mut broken = baseline.variant("broken");
        broken.constraints.push(Constraint::Headway {
            segment_id: SegmentId::parse("seg_S9_S1").unwrap(),
            min_gap_sec: 60,
            description: None,
        });
        let variants = vec![
            baseline.variant("v1"),
            broken,
            baseline.variant("v3"),
            baseline.variant("v4"),
        ];

        let results = evaluator(2).evaluate_all(baseline, variants).await;

        let names: Vec<_> = results.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["baseline", "v1", "broken", "v3", "v4"]);
        assert!(matches!(results[2].outcome, ScenarioOutcome::Failed { .. }));
        assert_eq!(results[3].outcome, ScenarioOutcome::Repaired);

        let deltas = compare_to_baseline(&results);
        let names: Vec<_> = deltas.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["v1", "v3", "v4"]);
        assert_eq!(deltas[0].throughput, 0);
        assert_eq!(deltas[0].on_time_ratio, 0.0);
    }

    #[tokio::test]
    async fn cancelled_scenarios_report_cancelled() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let evaluator = evaluator(4).with_cancel(cancel);

        let results = evaluator
            .evaluate_all(overlap_scenario(), vec![overlap_scenario().variant("v1")])
            .await;
        assert!(
            results
                .iter()
                .all(|m| m.outcome == ScenarioOutcome::Cancelled)
        );
    }
}
